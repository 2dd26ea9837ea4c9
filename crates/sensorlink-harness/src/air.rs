//! Simulated radio medium
//!
//! One [`SimulatedAir`] is shared by a simulated central and a simulated
//! peripheral. It holds the advertiser currently waiting for a connection,
//! the one open link, the peripheral's GATT values and a fault plan that tests
//! use to break the link in specific ways.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::debug;
use uuid::Uuid;

use sensorlink_core::{Advertisement, ConnectionHandle, PeerAddress, ServiceDefinition};

use crate::central::SimCentral;
use crate::peripheral::SimPeripheral;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Timing of the simulated radio
#[derive(Debug, Clone, PartialEq)]
pub struct AirConfig {
    /// Delay before a connection request completes
    pub connect_latency: Duration,
    /// Delay of each service or characteristic lookup
    pub discovery_latency: Duration,
    /// Delay of each characteristic read
    pub read_latency: Duration,
    /// Signal strength reported for every advertisement
    pub rssi: i16,
}

impl Default for AirConfig {
    fn default() -> Self {
        Self {
            connect_latency: Duration::from_millis(30),
            discovery_latency: Duration::from_millis(5),
            read_latency: Duration::from_millis(2),
            rssi: -55,
        }
    }
}

impl AirConfig {
    /// No latency anywhere
    pub fn ideal() -> Self {
        Self {
            connect_latency: Duration::ZERO,
            discovery_latency: Duration::ZERO,
            read_latency: Duration::ZERO,
            rssi: -40,
        }
    }
}

// ----------------------------------------------------------------------------
// Faults
// ----------------------------------------------------------------------------

/// How a characteristic read misbehaves once a read fault is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFault {
    /// Return a one-byte payload
    Malformed,
    /// Never answer
    Timeout,
    /// Fail with an ATT-level error
    Protocol,
}

#[derive(Debug, Default)]
struct FaultPlan {
    /// Fault applied to every read after the given number of good reads
    read: Option<(ReadFault, u64)>,
    stall_connect: bool,
    stall_discovery: bool,
    stall_characteristic_discovery: bool,
    advertise_failures: u32,
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct AirStats {
    pub scans: AtomicU64,
    pub connections: AtomicU64,
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    pub notifications: AtomicU64,
    pub disconnects: AtomicU64,
}

/// Snapshot of the air's operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AirCounters {
    pub scans: u64,
    pub connections: u64,
    pub reads: u64,
    pub writes: u64,
    pub notifications: u64,
    pub disconnects: u64,
}

// ----------------------------------------------------------------------------
// Shared Medium
// ----------------------------------------------------------------------------

pub(crate) struct Listener {
    pub advertisement: Advertisement,
    pub accept: oneshot::Sender<Accepted>,
}

pub(crate) struct Accepted {
    pub handle: ConnectionHandle,
    pub central: PeerAddress,
    pub closed: watch::Receiver<bool>,
}

struct ActiveLink {
    handle: ConnectionHandle,
    closed: watch::Sender<bool>,
}

struct AirInner {
    config: AirConfig,
    beacons: Mutex<Vec<Advertisement>>,
    listener: Mutex<Option<Listener>>,
    link: Mutex<Option<ActiveLink>>,
    gatt: Mutex<HashMap<Uuid, HashMap<Uuid, Vec<u8>>>>,
    faults: Mutex<FaultPlan>,
    last_notification: Mutex<Option<Vec<u8>>>,
    next_handle: AtomicU64,
    stats: AirStats,
}

#[derive(Clone)]
pub struct SimulatedAir {
    inner: Arc<AirInner>,
}

impl Default for SimulatedAir {
    fn default() -> Self {
        Self::new(AirConfig::default())
    }
}

impl SimulatedAir {
    pub fn new(config: AirConfig) -> Self {
        Self {
            inner: Arc::new(AirInner {
                config,
                beacons: Mutex::new(Vec::new()),
                listener: Mutex::new(None),
                link: Mutex::new(None),
                gatt: Mutex::new(HashMap::new()),
                faults: Mutex::new(FaultPlan::default()),
                last_notification: Mutex::new(None),
                next_handle: AtomicU64::new(1),
                stats: AirStats::default(),
            }),
        }
    }

    pub fn ideal() -> Self {
        Self::new(AirConfig::ideal())
    }

    pub fn config(&self) -> &AirConfig {
        &self.inner.config
    }

    pub fn central(&self, address: PeerAddress) -> SimCentral {
        SimCentral::new(self.clone(), address)
    }

    pub fn peripheral(&self, address: PeerAddress) -> SimPeripheral {
        SimPeripheral::new(self.clone(), address)
    }

    /// Add a non-connectable advertiser that is always visible
    pub fn add_beacon(&self, advertisement: Advertisement) {
        lock(&self.inner.beacons).push(advertisement);
    }

    /// Everything a scanner would hear right now
    pub fn visible(&self) -> Vec<Advertisement> {
        let mut visible = lock(&self.inner.beacons).clone();
        if let Some(listener) = lock(&self.inner.listener).as_ref() {
            visible.push(listener.advertisement.clone());
        }
        visible
    }

    pub fn is_advertising(&self) -> bool {
        lock(&self.inner.listener).is_some()
    }

    pub fn is_linked(&self) -> bool {
        lock(&self.inner.link).is_some()
    }

    // ------------------------------------------------------------------------
    // Fault Injection
    // ------------------------------------------------------------------------

    /// Break every read after `after_reads` successful ones
    pub fn schedule_read_fault(&self, fault: ReadFault, after_reads: u64) {
        lock(&self.inner.faults).read = Some((fault, after_reads));
    }

    pub fn stall_connect(&self, stall: bool) {
        lock(&self.inner.faults).stall_connect = stall;
    }

    pub fn stall_discovery(&self, stall: bool) {
        lock(&self.inner.faults).stall_discovery = stall;
    }

    /// Stall only characteristic lookups; service lookups still answer
    pub fn stall_characteristic_discovery(&self, stall: bool) {
        lock(&self.inner.faults).stall_characteristic_discovery = stall;
    }

    /// Make the next `times` advertise calls fail
    pub fn fail_advertising(&self, times: u32) {
        lock(&self.inner.faults).advertise_failures = times;
    }

    pub fn clear_faults(&self) {
        *lock(&self.inner.faults) = FaultPlan::default();
    }

    /// Drop the open link as if the radio lost it; true if one was open
    pub fn drop_link(&self) -> bool {
        let link = lock(&self.inner.link).take();
        match link {
            Some(link) => {
                let _ = link.closed.send(true);
                self.inner.stats.disconnects.fetch_add(1, Ordering::Relaxed);
                debug!("Air: link {} closed", link.handle);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Current stored value of a characteristic
    pub fn value(&self, characteristic: Uuid) -> Option<Vec<u8>> {
        lock(&self.inner.gatt)
            .values()
            .find_map(|characteristics| characteristics.get(&characteristic).cloned())
    }

    pub fn last_notification(&self) -> Option<Vec<u8>> {
        lock(&self.inner.last_notification).clone()
    }

    pub fn counters(&self) -> AirCounters {
        let stats = &self.inner.stats;
        AirCounters {
            scans: stats.scans.load(Ordering::Relaxed),
            connections: stats.connections.load(Ordering::Relaxed),
            reads: stats.reads.load(Ordering::Relaxed),
            writes: stats.writes.load(Ordering::Relaxed),
            notifications: stats.notifications.load(Ordering::Relaxed),
            disconnects: stats.disconnects.load(Ordering::Relaxed),
        }
    }

    // ------------------------------------------------------------------------
    // Used by the simulated radios
    // ------------------------------------------------------------------------

    pub(crate) fn stats(&self) -> &AirStats {
        &self.inner.stats
    }

    pub(crate) fn connect_stalled(&self) -> bool {
        lock(&self.inner.faults).stall_connect
    }

    pub(crate) fn discovery_stalled(&self) -> bool {
        lock(&self.inner.faults).stall_discovery
    }

    pub(crate) fn characteristic_discovery_stalled(&self) -> bool {
        let faults = lock(&self.inner.faults);
        faults.stall_discovery || faults.stall_characteristic_discovery
    }

    pub(crate) fn take_advertise_failure(&self) -> bool {
        let mut faults = lock(&self.inner.faults);
        if faults.advertise_failures > 0 {
            faults.advertise_failures -= 1;
            true
        } else {
            false
        }
    }

    /// Fault that applies to the read with the given 1-based sequence number
    pub(crate) fn read_fault(&self, sequence: u64) -> Option<ReadFault> {
        match lock(&self.inner.faults).read {
            Some((fault, after)) if sequence > after => Some(fault),
            _ => None,
        }
    }

    pub(crate) fn listen(&self, listener: Listener) {
        *lock(&self.inner.listener) = Some(listener);
    }

    /// Take the pending advertiser at `address`, if it is the one advertising
    pub(crate) fn take_listener(&self, address: PeerAddress) -> Option<Listener> {
        let mut slot = lock(&self.inner.listener);
        match slot.as_ref() {
            Some(listener) if listener.advertisement.address == address => slot.take(),
            _ => None,
        }
    }

    pub(crate) fn open_link(&self) -> (ConnectionHandle, watch::Receiver<bool>) {
        let handle = ConnectionHandle::new(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
        let (closed, closed_rx) = watch::channel(false);
        if let Some(previous) = lock(&self.inner.link).replace(ActiveLink { handle, closed }) {
            let _ = previous.closed.send(true);
        }
        self.inner.stats.connections.fetch_add(1, Ordering::Relaxed);
        (handle, closed_rx)
    }

    /// Close the link if `handle` is still the open one
    pub(crate) fn close_link(&self, handle: ConnectionHandle) {
        let is_current = lock(&self.inner.link)
            .as_ref()
            .is_some_and(|link| link.handle == handle);
        if is_current {
            self.drop_link();
        }
    }

    pub(crate) fn link_is_open(&self, handle: ConnectionHandle) -> bool {
        lock(&self.inner.link)
            .as_ref()
            .is_some_and(|link| link.handle == handle)
    }

    pub(crate) fn register(&self, services: &[ServiceDefinition]) {
        let mut gatt = lock(&self.inner.gatt);
        for service in services {
            let characteristics = gatt.entry(service.uuid).or_default();
            for characteristic in &service.characteristics {
                characteristics.insert(characteristic.uuid, characteristic.initial_value.clone());
            }
        }
    }

    pub(crate) fn has_service(&self, service: Uuid) -> bool {
        lock(&self.inner.gatt).contains_key(&service)
    }

    pub(crate) fn has_characteristic(&self, service: Uuid, characteristic: Uuid) -> bool {
        lock(&self.inner.gatt)
            .get(&service)
            .is_some_and(|characteristics| characteristics.contains_key(&characteristic))
    }

    pub(crate) fn read_value(&self, service: Uuid, characteristic: Uuid) -> Option<Vec<u8>> {
        lock(&self.inner.gatt)
            .get(&service)
            .and_then(|characteristics| characteristics.get(&characteristic).cloned())
    }

    /// Store a value wherever `characteristic` is registered; false if nowhere
    pub(crate) fn write_value(&self, characteristic: Uuid, value: &[u8]) -> bool {
        let mut gatt = lock(&self.inner.gatt);
        let slot = gatt
            .values_mut()
            .find_map(|characteristics| characteristics.get_mut(&characteristic));
        match slot {
            Some(slot) => {
                *slot = value.to_vec();
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_notification(&self, value: Vec<u8>) {
        *lock(&self.inner.last_notification) = Some(value);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
