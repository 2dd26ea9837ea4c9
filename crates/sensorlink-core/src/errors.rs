//! Error types for the sensor link
//!
//! Failures are tagged by class so the session manager can tear a session down
//! the same way for every terminal condition while still reporting which one it
//! was. Radio backends only ever produce [`TransportError`]; everything above
//! them is classified by the component that observed the failure.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Errors reported by a radio backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Operation timed out")]
    Timeout,

    #[error("Not connected")]
    NotConnected,

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Radio unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    pub fn not_found(what: impl Into<String>) -> Self {
        TransportError::NotFound { what: what.into() }
    }
}

// ----------------------------------------------------------------------------
// Codec Errors
// ----------------------------------------------------------------------------

/// Errors raised while converting sensor readings to and from the wire format
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Expected {expected} byte payload, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Value {0} is outside the encodable range")]
    OutOfRange(f32),
}

// ----------------------------------------------------------------------------
// Session Failure Classification
// ----------------------------------------------------------------------------

/// Why a single read of the sensor endpoint failed
///
/// All variants are terminal for the session; the distinction only matters for
/// diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadFailure {
    #[error("Malformed reading: {0}")]
    Malformed(#[from] CodecError),

    #[error("Read timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Read failed: {0}")]
    Protocol(TransportError),
}

/// Which logical endpoint was being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Service,
    Characteristic,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Service => write!(f, "service"),
            Endpoint::Characteristic => write!(f, "characteristic"),
        }
    }
}

/// Terminal outcome of one central session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    #[error("No matching peer advertised before the scan timed out")]
    PeerNotFound,

    #[error("Scan failed: {0}")]
    ScanFailed(TransportError),

    #[error("Connection attempt timed out")]
    ConnectTimeout,

    #[error("Connection failed: {0}")]
    ConnectFailed(TransportError),

    #[error("Timed out resolving {endpoint}")]
    EndpointTimeout { endpoint: Endpoint },

    #[error("Could not resolve {endpoint}: {error}")]
    EndpointUnavailable {
        endpoint: Endpoint,
        error: TransportError,
    },

    #[error("Link lost: {0}")]
    LinkLost(ReadFailure),

    #[error("Session cancelled")]
    Cancelled,
}

impl SessionOutcome {
    /// Outcomes that happen before any connection exists and may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionOutcome::PeerNotFound
                | SessionOutcome::ScanFailed(_)
                | SessionOutcome::ConnectTimeout
                | SessionOutcome::ConnectFailed(_)
        )
    }
}

// ----------------------------------------------------------------------------
// Peripheral Errors
// ----------------------------------------------------------------------------

/// Errors from a sensor source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    #[error("Sensor produced an unencodable value: {0}")]
    Codec(#[from] CodecError),
}

/// Errors from a single data producer cycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProducerError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("Failed to publish reading: {0}")]
    Transport(#[from] TransportError),
}

// ----------------------------------------------------------------------------
// Configuration Errors
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Crate Error
// ----------------------------------------------------------------------------

/// Top-level error for role setup
#[derive(Error, Debug)]
pub enum SensorlinkError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SensorlinkError>;
