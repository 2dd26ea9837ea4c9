//! Simulated peripheral radio

use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tracing::debug;
use uuid::Uuid;

use sensorlink_core::{
    AdvertisingParams, Advertisement, ConnectionHandle, InboundConnection, PeerAddress,
    Peripheral, ServiceDefinition, TransportError,
};

use crate::air::{Listener, SimulatedAir};

#[derive(Clone)]
pub struct SimPeripheral {
    air: SimulatedAir,
    address: PeerAddress,
}

impl SimPeripheral {
    pub(crate) fn new(air: SimulatedAir, address: PeerAddress) -> Self {
        Self { air, address }
    }

    pub fn address(&self) -> PeerAddress {
        self.address
    }
}

#[async_trait]
impl Peripheral for SimPeripheral {
    type Connection = SimInboundConnection;

    async fn register_services(
        &self,
        services: &[ServiceDefinition],
    ) -> Result<(), TransportError> {
        self.air.register(services);
        Ok(())
    }

    async fn advertise(
        &self,
        params: &AdvertisingParams,
    ) -> Result<SimInboundConnection, TransportError> {
        if self.air.take_advertise_failure() {
            return Err(TransportError::Unavailable(
                "advertising rejected by controller".to_string(),
            ));
        }

        let (accept, accepted) = oneshot::channel();
        self.air.listen(Listener {
            advertisement: Advertisement {
                address: self.address,
                local_name: Some(params.local_name.clone()),
                services: params.services.clone(),
                appearance: Some(params.appearance),
                rssi: Some(self.air.config().rssi),
            },
            accept,
        });
        debug!("Air: {} advertising as '{}'", self.address, params.local_name);

        let accepted = accepted
            .await
            .map_err(|_| TransportError::Unavailable("advertising cancelled".to_string()))?;
        Ok(SimInboundConnection {
            handle: accepted.handle,
            central: accepted.central,
            closed: accepted.closed,
        })
    }

    async fn write_value(&self, characteristic: Uuid, value: &[u8]) -> Result<(), TransportError> {
        if !self.air.write_value(characteristic, value) {
            return Err(TransportError::not_found(format!(
                "characteristic {}",
                characteristic
            )));
        }
        self.air.stats().writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn notify(
        &self,
        connection: ConnectionHandle,
        characteristic: Uuid,
    ) -> Result<(), TransportError> {
        if !self.air.link_is_open(connection) {
            return Err(TransportError::NotConnected);
        }
        let value = self.air.value(characteristic).ok_or_else(|| {
            TransportError::not_found(format!("characteristic {}", characteristic))
        })?;
        self.air.record_notification(value);
        self.air.stats().notifications.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Inbound Connection
// ----------------------------------------------------------------------------

pub struct SimInboundConnection {
    handle: ConnectionHandle,
    central: PeerAddress,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl InboundConnection for SimInboundConnection {
    fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    fn peer(&self) -> PeerAddress {
        self.central
    }

    async fn disconnected(&mut self) {
        loop {
            if *self.closed.borrow_and_update() {
                return;
            }
            if self.closed.changed().await.is_err() {
                return;
            }
        }
    }
}
