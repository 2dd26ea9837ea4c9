//! Error types for the BLE backends

use sensorlink_core::TransportError;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Failures while bringing a radio up, before any role runs
#[derive(Error, Debug)]
pub enum BleSetupError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("Failed to create BLE manager: {0}")]
    Manager(String),

    #[error("Failed to power on adapter: {0}")]
    PowerOn(String),
}

impl From<BleSetupError> for TransportError {
    fn from(err: BleSetupError) -> Self {
        TransportError::Unavailable(err.to_string())
    }
}

// ----------------------------------------------------------------------------
// Backend Error Mapping
// ----------------------------------------------------------------------------

#[cfg(feature = "btleplug")]
pub(crate) fn from_btleplug(err: btleplug::Error) -> TransportError {
    use btleplug::Error;

    match err {
        Error::TimedOut(_) => TransportError::Timeout,
        Error::NotConnected => TransportError::NotConnected,
        Error::DeviceNotFound => TransportError::not_found("device"),
        Error::NoSuchCharacteristic => TransportError::not_found("characteristic"),
        Error::PermissionDenied => TransportError::Unavailable("permission denied".to_string()),
        Error::NotSupported(what) => TransportError::Unavailable(format!("not supported: {}", what)),
        other => TransportError::Protocol(other.to_string()),
    }
}

#[cfg(all(feature = "bluez", target_os = "linux"))]
pub(crate) fn from_bluer(err: bluer::Error) -> TransportError {
    use bluer::ErrorKind;

    match err.kind {
        ErrorKind::NotReady
        | ErrorKind::NotAvailable
        | ErrorKind::NotPermitted
        | ErrorKind::NotAuthorized
        | ErrorKind::NotSupported => TransportError::Unavailable(err.message),
        ErrorKind::DoesNotExist => TransportError::not_found(err.message),
        _ => TransportError::Protocol(err.to_string()),
    }
}
