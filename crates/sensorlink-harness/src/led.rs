//! LED that records every level change with a timestamp

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use sensorlink_core::StatusLed;

/// Cloneable; all clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingLed {
    events: Arc<Mutex<Vec<(Instant, bool)>>>,
}

impl RecordingLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Instant, bool)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Time between consecutive level changes
    pub fn intervals(&self) -> Vec<Duration> {
        self.events()
            .windows(2)
            .map(|pair| pair[1].0 - pair[0].0)
            .collect()
    }

    pub fn last_level(&self) -> Option<bool> {
        self.events().last().map(|(_, on)| *on)
    }
}

impl StatusLed for RecordingLed {
    fn set(&mut self, on: bool) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), on));
    }
}
