//! Picking out the central that connected while we advertised
//!
//! The host may already hold links to unrelated devices (keyboards, audio),
//! so "some device is connected" does not mean a central answered the
//! advertisement. Devices connected before advertising started form a
//! baseline and are ignored until they disconnect.

use std::collections::HashSet;

use sensorlink_core::PeerAddress;

#[derive(Debug, Default)]
pub(crate) struct ConnectionWatch {
    baseline: HashSet<PeerAddress>,
}

impl ConnectionWatch {
    /// Start watching with the devices connected right now as the baseline
    pub(crate) fn new(connected: impl IntoIterator<Item = PeerAddress>) -> Self {
        Self {
            baseline: connected.into_iter().collect(),
        }
    }

    /// Given the currently connected devices, return the first one that is not
    /// part of the baseline
    ///
    /// Baseline devices that have since disconnected are dropped from the
    /// baseline, so a later reconnect counts as new.
    pub(crate) fn accept(&mut self, connected: &[PeerAddress]) -> Option<PeerAddress> {
        self.baseline.retain(|address| connected.contains(address));
        connected
            .iter()
            .copied()
            .find(|address| !self.baseline.contains(address))
    }
}
