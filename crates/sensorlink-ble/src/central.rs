//! Central role over btleplug

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{
    Central as _, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::{BoxStream, StreamExt};
use sensorlink_core::{
    Advertisement, Central, CentralLink, ConnectionHandle, EndpointHandle, PeerAddress,
    PeerDescriptor, ScanParams, ServiceHandle, TransportError,
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{from_btleplug, BleSetupError};

// ----------------------------------------------------------------------------
// Central Implementation
// ----------------------------------------------------------------------------

/// Scanning and connecting through the first host adapter
pub struct BtleplugCentral {
    adapter: Adapter,
    /// Platform ids of devices seen while scanning, by address
    seen: Arc<RwLock<HashMap<PeerAddress, PeripheralId>>>,
    next_handle: AtomicU64,
}

impl BtleplugCentral {
    pub async fn new() -> Result<Self, BleSetupError> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleSetupError::Manager(e.to_string()))?;
        let adapters = manager
            .adapters()
            .await
            .map_err(|e| BleSetupError::Manager(e.to_string()))?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(BleSetupError::AdapterNotAvailable)?;

        info!("BLE adapter initialized for scanning");
        Ok(Self {
            adapter,
            seen: Arc::new(RwLock::new(HashMap::new())),
            next_handle: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl Central for BtleplugCentral {
    type Link = BtleplugLink;

    async fn start_scan(
        &self,
        params: &ScanParams,
    ) -> Result<BoxStream<'static, Advertisement>, TransportError> {
        // Ids from an earlier scan may no longer be valid
        self.seen.write().await.clear();
        let events = self.adapter.events().await.map_err(from_btleplug)?;

        // Interval, window and active/passive are chosen by the host stack
        debug!(
            "Requested scan interval {:?}, window {:?}, active: {}",
            params.interval, params.window, params.active
        );
        self.adapter
            .start_scan(ScanFilter {
                services: params.services.clone(),
            })
            .await
            .map_err(from_btleplug)?;

        let adapter = self.adapter.clone();
        let seen = self.seen.clone();
        let reports = events.filter_map(move |event| {
            let adapter = adapter.clone();
            let seen = seen.clone();
            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };
                let peripheral = adapter.peripheral(&id).await.ok()?;
                let properties = peripheral.properties().await.ok()??;
                let address = PeerAddress::new(properties.address.into_inner());
                seen.write().await.insert(address, id);

                Some(Advertisement {
                    address,
                    local_name: properties.local_name,
                    services: properties.services,
                    appearance: None,
                    rssi: properties.rssi,
                })
            }
        });
        Ok(reports.boxed())
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.adapter.stop_scan().await.map_err(from_btleplug)
    }

    async fn connect(&self, peer: &PeerDescriptor) -> Result<BtleplugLink, TransportError> {
        let id = self
            .seen
            .read()
            .await
            .get(&peer.address)
            .cloned()
            .ok_or_else(|| TransportError::not_found(format!("device {}", peer.address)))?;
        let peripheral = self.adapter.peripheral(&id).await.map_err(from_btleplug)?;
        peripheral.connect().await.map_err(from_btleplug)?;

        let handle = ConnectionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        Ok(BtleplugLink {
            peripheral,
            handle,
            services_discovered: false,
            characteristics: HashMap::new(),
        })
    }
}

// ----------------------------------------------------------------------------
// Link
// ----------------------------------------------------------------------------

pub struct BtleplugLink {
    peripheral: btleplug::platform::Peripheral,
    handle: ConnectionHandle,
    services_discovered: bool,
    characteristics: HashMap<(Uuid, Uuid), Characteristic>,
}

#[async_trait]
impl CentralLink for BtleplugLink {
    fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    async fn discover_service(&mut self, uuid: Uuid) -> Result<ServiceHandle, TransportError> {
        if !self.services_discovered {
            self.peripheral
                .discover_services()
                .await
                .map_err(from_btleplug)?;
            self.services_discovered = true;
        }
        self.peripheral
            .services()
            .iter()
            .any(|service| service.uuid == uuid)
            .then_some(ServiceHandle { uuid })
            .ok_or_else(|| TransportError::not_found(format!("service {}", uuid)))
    }

    async fn discover_characteristic(
        &mut self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<EndpointHandle, TransportError> {
        let characteristic = self
            .peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service.uuid)
            .and_then(|s| s.characteristics.into_iter().find(|c| c.uuid == uuid))
            .ok_or_else(|| TransportError::not_found(format!("characteristic {}", uuid)))?;

        self.characteristics
            .insert((service.uuid, uuid), characteristic);
        Ok(EndpointHandle {
            service: service.uuid,
            characteristic: uuid,
        })
    }

    async fn read(&mut self, endpoint: &EndpointHandle) -> Result<Vec<u8>, TransportError> {
        let characteristic = self
            .characteristics
            .get(&(endpoint.service, endpoint.characteristic))
            .ok_or_else(|| {
                TransportError::not_found(format!("characteristic {}", endpoint.characteristic))
            })?;
        self.peripheral
            .read(characteristic)
            .await
            .map_err(from_btleplug)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await.map_err(from_btleplug)
    }
}
