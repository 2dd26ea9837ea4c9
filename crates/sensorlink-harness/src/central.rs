//! Simulated central radio

use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use sensorlink_core::{
    Advertisement, Central, CentralLink, ConnectionHandle, EndpointHandle, PeerAddress,
    PeerDescriptor, ScanParams, ServiceHandle, TransportError,
};

use crate::air::{Accepted, ReadFault, SimulatedAir};

const MIN_SCAN_TICK: Duration = Duration::from_millis(1);

#[derive(Clone)]
pub struct SimCentral {
    air: SimulatedAir,
    address: PeerAddress,
}

impl SimCentral {
    pub(crate) fn new(air: SimulatedAir, address: PeerAddress) -> Self {
        Self { air, address }
    }

    pub fn address(&self) -> PeerAddress {
        self.address
    }
}

#[async_trait]
impl Central for SimCentral {
    type Link = SimLink;

    /// Reports every visible advertiser once per scan interval
    async fn start_scan(
        &self,
        params: &ScanParams,
    ) -> Result<BoxStream<'static, Advertisement>, TransportError> {
        self.air.stats().scans.fetch_add(1, Ordering::Relaxed);
        let tick = params.interval.max(MIN_SCAN_TICK);
        let reports = stream::unfold(self.air.clone(), move |air| async move {
            sleep(tick).await;
            let batch = air.visible();
            Some((stream::iter(batch), air))
        })
        .flatten();
        Ok(reports.boxed())
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn connect(&self, peer: &PeerDescriptor) -> Result<SimLink, TransportError> {
        if self.air.connect_stalled() {
            return std::future::pending().await;
        }
        let latency = self.air.config().connect_latency;
        if !latency.is_zero() {
            sleep(latency).await;
        }

        let listener = self
            .air
            .take_listener(peer.address)
            .ok_or_else(|| TransportError::not_found(format!("peripheral {}", peer.address)))?;
        let (handle, closed) = self.air.open_link();
        let accepted = Accepted {
            handle,
            central: self.address,
            closed: closed.clone(),
        };
        if listener.accept.send(accepted).is_err() {
            self.air.close_link(handle);
            return Err(TransportError::Protocol(
                "peripheral stopped advertising".to_string(),
            ));
        }

        debug!("Air: {} connected to {} ({})", self.address, peer.address, handle);
        Ok(SimLink {
            air: self.air.clone(),
            handle,
            closed,
        })
    }
}

// ----------------------------------------------------------------------------
// Link
// ----------------------------------------------------------------------------

pub struct SimLink {
    air: SimulatedAir,
    handle: ConnectionHandle,
    closed: watch::Receiver<bool>,
}

impl SimLink {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            Err(TransportError::NotConnected)
        } else {
            Ok(())
        }
    }

    async fn lookup_delay(&self) {
        let latency = self.air.config().discovery_latency;
        if !latency.is_zero() {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl CentralLink for SimLink {
    fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    async fn discover_service(&mut self, uuid: Uuid) -> Result<ServiceHandle, TransportError> {
        self.ensure_open()?;
        if self.air.discovery_stalled() {
            return std::future::pending().await;
        }
        self.lookup_delay().await;
        if self.air.has_service(uuid) {
            Ok(ServiceHandle { uuid })
        } else {
            Err(TransportError::not_found(format!("service {}", uuid)))
        }
    }

    async fn discover_characteristic(
        &mut self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<EndpointHandle, TransportError> {
        self.ensure_open()?;
        if self.air.characteristic_discovery_stalled() {
            return std::future::pending().await;
        }
        self.lookup_delay().await;
        if self.air.has_characteristic(service.uuid, uuid) {
            Ok(EndpointHandle {
                service: service.uuid,
                characteristic: uuid,
            })
        } else {
            Err(TransportError::not_found(format!("characteristic {}", uuid)))
        }
    }

    async fn read(&mut self, endpoint: &EndpointHandle) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        let sequence = self.air.stats().reads.fetch_add(1, Ordering::Relaxed) + 1;
        match self.air.read_fault(sequence) {
            Some(ReadFault::Malformed) => {
                let first = self
                    .air
                    .read_value(endpoint.service, endpoint.characteristic)
                    .and_then(|value| value.first().copied());
                return Ok(vec![first.unwrap_or_default()]);
            }
            Some(ReadFault::Timeout) => return std::future::pending().await,
            Some(ReadFault::Protocol) => {
                return Err(TransportError::Protocol(
                    "ATT error 0x0e (unlikely error)".to_string(),
                ))
            }
            None => {}
        }

        let latency = self.air.config().read_latency;
        if !latency.is_zero() {
            sleep(latency).await;
        }
        self.ensure_open()?;
        self.air
            .read_value(endpoint.service, endpoint.characteristic)
            .ok_or_else(|| {
            TransportError::not_found(format!("characteristic {}", endpoint.characteristic))
        })
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.air.close_link(self.handle);
        Ok(())
    }
}
