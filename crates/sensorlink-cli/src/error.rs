//! Error handling for the sensorlink CLI

use sensorlink_ble::BleSetupError;
use sensorlink_core::{ConfigError, SensorlinkError};
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Sensorlink error: {0}")]
    Core(#[from] SensorlinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Radio setup failed: {0}")]
    Radio(#[from] BleSetupError),

    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Runtime(format!("{:#}", err))
    }
}
