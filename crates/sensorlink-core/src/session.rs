//! Central session lifecycle
//!
//! One call to [`SessionManager::run`] drives a session instance through
//!
//! ```text
//! Idle -> Scanning -> Connecting -> Connected -> ResolvingEndpoints -> Polling -> Terminated
//! ```
//!
//! and returns the [`SessionOutcome`] that ended it. Every step that talks to
//! the radio runs under its own timeout. Once a connection is open, any
//! terminal condition clears both `connected` and `alive` before the link is
//! closed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::codec::SensorValue;
use crate::config::CentralConfig;
use crate::discovery::DiscoveryEngine;
use crate::errors::{Endpoint, ReadFailure, SessionOutcome, TransportError};
use crate::protocol::{
    ADVERTISED_SERVICE_UUID, POLL_INTERVAL, SENSOR_CHARACTERISTIC_UUID, SENSOR_SERVICE_UUID,
};
use crate::state::SessionState;
use crate::transport::{Central, CentralLink};
use crate::types::EndpointHandle;

/// Observable phase of a session instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Scanning,
    Connecting,
    Connected,
    ResolvingEndpoints,
    Polling,
    Terminated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Scanning => "scanning",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Connected => "connected",
            SessionPhase::ResolvingEndpoints => "resolving endpoints",
            SessionPhase::Polling => "polling",
            SessionPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Session Manager
// ----------------------------------------------------------------------------

pub struct SessionManager<C: Central> {
    central: C,
    config: CentralConfig,
    state: Arc<SessionState>,
    phase: watch::Sender<SessionPhase>,
    latest: watch::Sender<Option<SensorValue>>,
}

impl<C: Central> SessionManager<C> {
    pub fn new(central: C, config: CentralConfig, state: Arc<SessionState>) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        let (latest, _) = watch::channel(None);
        Self {
            central,
            config,
            state,
            phase,
            latest,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn config(&self) -> &CentralConfig {
        &self.config
    }

    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Most recent successfully decoded reading
    pub fn readings(&self) -> watch::Receiver<Option<SensorValue>> {
        self.latest.subscribe()
    }

    /// Drive one session instance to termination
    pub async fn run(&self) -> SessionOutcome {
        self.enter(SessionPhase::Idle);
        let outcome = self.drive().await;
        self.enter(SessionPhase::Terminated);
        match &outcome {
            SessionOutcome::PeerNotFound | SessionOutcome::Cancelled => {
                info!("Session ended: {}", outcome)
            }
            _ => warn!("Session ended: {}", outcome),
        }
        outcome
    }

    async fn drive(&self) -> SessionOutcome {
        if !self.state.is_alive() {
            return SessionOutcome::Cancelled;
        }

        self.enter(SessionPhase::Scanning);
        let engine = DiscoveryEngine::new(self.config.scan_params());
        let peer = match engine
            .find_peer(&self.central, &self.config.peer_name, ADVERTISED_SERVICE_UUID)
            .await
        {
            Ok(Some(peer)) => peer,
            Ok(None) => return SessionOutcome::PeerNotFound,
            Err(e) => return SessionOutcome::ScanFailed(e),
        };

        self.enter(SessionPhase::Connecting);
        let connect_timeout = self.config.connect_timeout();
        let mut link = match timeout(connect_timeout, self.central.connect(&peer)).await {
            Ok(Ok(link)) => link,
            Ok(Err(TransportError::Timeout)) | Err(_) => return SessionOutcome::ConnectTimeout,
            Ok(Err(e)) => return SessionOutcome::ConnectFailed(e),
        };
        self.state.attach(link.handle());
        self.enter(SessionPhase::Connected);
        info!("Connected to {} ({})", peer.address, link.handle());

        self.enter(SessionPhase::ResolvingEndpoints);
        let outcome = match self.resolve(&mut link).await {
            Ok(endpoint) => {
                self.enter(SessionPhase::Polling);
                self.poll(&mut link, &endpoint).await
            }
            Err(outcome) => outcome,
        };

        self.teardown(&mut link).await;
        outcome
    }

    async fn resolve(&self, link: &mut C::Link) -> Result<EndpointHandle, SessionOutcome> {
        let budget = self.config.resolve_timeout();

        let service = match timeout(budget, link.discover_service(SENSOR_SERVICE_UUID)).await {
            Ok(Ok(service)) => service,
            Ok(Err(TransportError::Timeout)) | Err(_) => {
                return Err(SessionOutcome::EndpointTimeout {
                    endpoint: Endpoint::Service,
                })
            }
            Ok(Err(error)) => {
                return Err(SessionOutcome::EndpointUnavailable {
                    endpoint: Endpoint::Service,
                    error,
                })
            }
        };

        let endpoint = match timeout(
            budget,
            link.discover_characteristic(&service, SENSOR_CHARACTERISTIC_UUID),
        )
        .await
        {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(TransportError::Timeout)) | Err(_) => {
                return Err(SessionOutcome::EndpointTimeout {
                    endpoint: Endpoint::Characteristic,
                })
            }
            Ok(Err(error)) => {
                return Err(SessionOutcome::EndpointUnavailable {
                    endpoint: Endpoint::Characteristic,
                    error,
                })
            }
        };

        debug!(
            "Resolved endpoint {} / {}",
            endpoint.service, endpoint.characteristic
        );
        Ok(endpoint)
    }

    async fn poll(&self, link: &mut C::Link, endpoint: &EndpointHandle) -> SessionOutcome {
        let read_timeout = self.config.read_timeout();
        while self.state.is_alive() {
            match read_once(link, endpoint, read_timeout).await {
                Ok(value) => {
                    debug!("Sensor reading: {}", value);
                    self.latest.send_replace(Some(value));
                }
                Err(failure) => return SessionOutcome::LinkLost(failure),
            }
            sleep(POLL_INTERVAL).await;
        }
        SessionOutcome::Cancelled
    }

    /// Clear both flags, then close the link
    async fn teardown(&self, link: &mut C::Link) {
        self.state.detach();
        self.state.terminate();
        if let Err(e) = link.disconnect().await {
            debug!("Disconnect after termination failed: {}", e);
        }
    }

    fn enter(&self, phase: SessionPhase) {
        debug!("Session phase: {}", phase);
        self.phase.send_replace(phase);
    }
}

/// Read and decode one value, classifying any failure
async fn read_once<L: CentralLink>(
    link: &mut L,
    endpoint: &EndpointHandle,
    budget: Duration,
) -> Result<SensorValue, ReadFailure> {
    let bytes = match timeout(budget, link.read(endpoint)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(TransportError::Timeout)) | Err(_) => {
            return Err(ReadFailure::Timeout { after: budget })
        }
        Ok(Err(e)) => return Err(ReadFailure::Protocol(e)),
    };
    Ok(SensorValue::decode(&bytes)?)
}
