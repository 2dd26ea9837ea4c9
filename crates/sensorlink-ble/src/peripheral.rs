//! Peripheral role over BlueZ, using bluer

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bluer::adv::{Advertisement as BluezAdvertisement, Type};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, ReqError, Service,
};
use bluer::{Adapter, Address, Device, Session};
use futures::FutureExt;
use sensorlink_core::{
    AdvertisingParams, CharacteristicDefinition, ConnectionHandle, InboundConnection, PeerAddress,
    Peripheral, ServiceDefinition, TransportError,
};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connections::ConnectionWatch;
use crate::error::{from_bluer, BleSetupError};
use crate::updates::next_update;

/// How often BlueZ is polled for connection changes
const CONNECTION_POLL: Duration = Duration::from_millis(250);

const NOTIFY_CHANNEL_CAPACITY: usize = 16;

type ValueTable = Arc<Mutex<HashMap<Uuid, Vec<u8>>>>;

// ----------------------------------------------------------------------------
// Peripheral Implementation
// ----------------------------------------------------------------------------

/// GATT server and advertiser on the default BlueZ adapter
pub struct BluezPeripheral {
    _session: Session,
    adapter: Adapter,
    values: ValueTable,
    notifications: broadcast::Sender<(Uuid, Vec<u8>)>,
    application: tokio::sync::Mutex<Option<ApplicationHandle>>,
    active: Arc<Mutex<Option<ConnectionHandle>>>,
    next_handle: AtomicU64,
}

impl BluezPeripheral {
    pub async fn new() -> Result<Self, BleSetupError> {
        let session = Session::new()
            .await
            .map_err(|e| BleSetupError::Manager(format!("BlueZ session: {}", e)))?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|_| BleSetupError::AdapterNotAvailable)?;

        if !adapter.is_powered().await.unwrap_or(false) {
            adapter
                .set_powered(true)
                .await
                .map_err(|e| BleSetupError::PowerOn(e.to_string()))?;
        }

        let (notifications, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        info!("BlueZ adapter {} initialized for advertising", adapter.name());
        Ok(Self {
            _session: session,
            adapter,
            values: Arc::new(Mutex::new(HashMap::new())),
            notifications,
            application: tokio::sync::Mutex::new(None),
            active: Arc::new(Mutex::new(None)),
            next_handle: AtomicU64::new(1),
        })
    }

    fn characteristic(&self, definition: &CharacteristicDefinition) -> Characteristic {
        let uuid = definition.uuid;

        let read = definition.readable.then(|| {
            let values = self.values.clone();
            CharacteristicRead {
                read: true,
                fun: Box::new(move |_request| {
                    let value = lock(&values).get(&uuid).cloned().unwrap_or_default();
                    async move { Ok::<_, ReqError>(value) }.boxed()
                }),
                ..Default::default()
            }
        });

        let notify = definition.notify.then(|| {
            let notifications = self.notifications.clone();
            CharacteristicNotify {
                notify: true,
                method: CharacteristicNotifyMethod::Fun(Box::new(move |mut notifier| {
                    let mut updates = notifications.subscribe();
                    async move {
                        debug!("Central subscribed to {}", uuid);
                        while let Some(value) = next_update(&mut updates, uuid).await {
                            if notifier.notify(value).await.is_err() {
                                break;
                            }
                        }
                        debug!("Notification session for {} ended", uuid);
                    }
                    .boxed()
                })),
                ..Default::default()
            }
        });

        Characteristic {
            uuid,
            read,
            notify,
            ..Default::default()
        }
    }

    async fn connected_devices(&self) -> Result<Vec<PeerAddress>, TransportError> {
        let mut connected = Vec::new();
        for address in self.adapter.device_addresses().await.map_err(from_bluer)? {
            let device = self.adapter.device(address).map_err(from_bluer)?;
            if device.is_connected().await.unwrap_or(false) {
                connected.push(peer_address(address));
            }
        }
        Ok(connected)
    }
}

#[async_trait]
impl Peripheral for BluezPeripheral {
    type Connection = BluezConnection;

    async fn register_services(
        &self,
        services: &[ServiceDefinition],
    ) -> Result<(), TransportError> {
        {
            let mut values = lock(&self.values);
            for characteristic in services.iter().flat_map(|s| &s.characteristics) {
                values.insert(characteristic.uuid, characteristic.initial_value.clone());
            }
        }

        let application = Application {
            services: services
                .iter()
                .map(|service| Service {
                    uuid: service.uuid,
                    primary: true,
                    characteristics: service
                        .characteristics
                        .iter()
                        .map(|c| self.characteristic(c))
                        .collect(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let handle = self
            .adapter
            .serve_gatt_application(application)
            .await
            .map_err(from_bluer)?;
        *self.application.lock().await = Some(handle);
        info!("GATT application registered with {} services", services.len());
        Ok(())
    }

    async fn advertise(&self, params: &AdvertisingParams) -> Result<BluezConnection, TransportError> {
        let advertisement = BluezAdvertisement {
            advertisement_type: Type::Peripheral,
            service_uuids: params.services.iter().copied().collect(),
            local_name: Some(params.local_name.clone()),
            appearance: Some(params.appearance),
            discoverable: Some(true),
            min_interval: Some(params.interval),
            max_interval: Some(params.interval),
            ..Default::default()
        };
        let mut watch = ConnectionWatch::new(self.connected_devices().await?);
        let advertising = self
            .adapter
            .advertise(advertisement)
            .await
            .map_err(from_bluer)?;
        info!(
            "Started BLE advertising as '{}' every {:?}",
            params.local_name, params.interval
        );

        let central = loop {
            if let Some(central) = watch.accept(&self.connected_devices().await?) {
                break central;
            }
            sleep(CONNECTION_POLL).await;
        };
        drop(advertising);
        let device = self
            .adapter
            .device(Address(*central.as_bytes()))
            .map_err(from_bluer)?;

        let handle = ConnectionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        *lock(&self.active) = Some(handle);
        Ok(BluezConnection {
            device,
            handle,
            active: self.active.clone(),
        })
    }

    async fn write_value(&self, characteristic: Uuid, value: &[u8]) -> Result<(), TransportError> {
        let mut values = lock(&self.values);
        match values.get_mut(&characteristic) {
            Some(slot) => {
                *slot = value.to_vec();
                Ok(())
            }
            None => Err(TransportError::not_found(format!(
                "characteristic {}",
                characteristic
            ))),
        }
    }

    async fn notify(
        &self,
        connection: ConnectionHandle,
        characteristic: Uuid,
    ) -> Result<(), TransportError> {
        if *lock(&self.active) != Some(connection) {
            return Err(TransportError::NotConnected);
        }
        let value = lock(&self.values)
            .get(&characteristic)
            .cloned()
            .ok_or_else(|| TransportError::not_found(format!("characteristic {}", characteristic)))?;
        if self.notifications.send((characteristic, value)).is_err() {
            debug!("No central subscribed to {}", characteristic);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Inbound Connection
// ----------------------------------------------------------------------------

pub struct BluezConnection {
    device: Device,
    handle: ConnectionHandle,
    active: Arc<Mutex<Option<ConnectionHandle>>>,
}

#[async_trait]
impl InboundConnection for BluezConnection {
    fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    fn peer(&self) -> PeerAddress {
        peer_address(self.device.address())
    }

    async fn disconnected(&mut self) {
        loop {
            match self.device.is_connected().await {
                Ok(true) => sleep(CONNECTION_POLL).await,
                Ok(false) => break,
                Err(e) => {
                    warn!("Lost track of {}: {}", self.device.address(), e);
                    break;
                }
            }
        }
        let mut active = lock(&self.active);
        if *active == Some(self.handle) {
            *active = None;
        }
    }
}

fn peer_address(Address(bytes): Address) -> PeerAddress {
    PeerAddress::new(bytes)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
