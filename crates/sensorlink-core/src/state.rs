//! Session state shared between the tasks of one role
//!
//! `connected` tracks whether a transport-level connection is open and drives
//! the indicator's blink rate. `alive` gates the central's polling and
//! indicator loops; it starts `true` and latches `false` exactly once.
//!
//! Every flag write is published on a broadcast channel so observers can
//! replay the exact sequence of transitions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::ConnectionHandle;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A single flag write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Connected(bool),
    Alive(bool),
}

/// Point-in-time copy of both flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub connected: bool,
    pub alive: bool,
}

#[derive(Debug)]
pub struct SessionState {
    connected: AtomicBool,
    alive: AtomicBool,
    connection: Mutex<Option<ConnectionHandle>>,
    changes: broadcast::Sender<StateChange>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            connected: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            connection: Mutex::new(None),
            changes,
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            connected: self.is_connected(),
            alive: self.is_alive(),
        }
    }

    /// Handle of the connection currently recorded, if any
    pub fn connection(&self) -> Option<ConnectionHandle> {
        *self.lock_connection()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        debug!("Session connected = {}", connected);
        let _ = self.changes.send(StateChange::Connected(connected));
    }

    /// Record a newly opened connection and raise `connected`
    pub fn attach(&self, handle: ConnectionHandle) {
        *self.lock_connection() = Some(handle);
        self.set_connected(true);
    }

    /// Forget the current connection and clear `connected`
    pub fn detach(&self) -> Option<ConnectionHandle> {
        let previous = self.lock_connection().take();
        self.set_connected(false);
        previous
    }

    /// Latch `alive` to false; returns true only for the call that latched it
    pub fn terminate(&self) -> bool {
        let was_alive = self.alive.swap(false, Ordering::AcqRel);
        if was_alive {
            debug!("Session alive = false");
            let _ = self.changes.send(StateChange::Alive(false));
        }
        was_alive
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<ConnectionHandle>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_flags() {
        let state = SessionState::new();
        assert_eq!(
            state.snapshot(),
            StateSnapshot {
                connected: false,
                alive: true
            }
        );
        assert_eq!(state.connection(), None);
    }

    #[test]
    fn test_alive_latches_once() {
        let state = SessionState::new();
        let mut changes = state.subscribe();

        assert!(state.terminate());
        assert!(!state.terminate());
        assert!(!state.is_alive());

        assert_eq!(changes.try_recv().unwrap(), StateChange::Alive(false));
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_attach_and_detach_track_connection() {
        let state = SessionState::new();
        let mut changes = state.subscribe();
        let handle = ConnectionHandle::new(7);

        state.attach(handle);
        assert!(state.is_connected());
        assert_eq!(state.connection(), Some(handle));

        assert_eq!(state.detach(), Some(handle));
        assert!(!state.is_connected());
        assert_eq!(state.connection(), None);

        assert_eq!(changes.try_recv().unwrap(), StateChange::Connected(true));
        assert_eq!(changes.try_recv().unwrap(), StateChange::Connected(false));
    }

    #[test]
    fn test_every_connected_write_is_published() {
        let state = SessionState::new();
        let mut changes = state.subscribe();

        state.set_connected(false);
        state.set_connected(false);

        assert_eq!(changes.try_recv().unwrap(), StateChange::Connected(false));
        assert_eq!(changes.try_recv().unwrap(), StateChange::Connected(false));
    }
}
