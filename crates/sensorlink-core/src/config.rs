//! Role configuration
//!
//! Durations are stored as integer milliseconds (microseconds for the scan
//! timing) so the structs serialize to flat TOML; accessors hand out
//! [`Duration`]s. Fixed cadences live in [`crate::protocol`] and are not
//! configurable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::SensorValue;
use crate::errors::ConfigError;
use crate::sensor::MAX_STEP;
use crate::protocol::{
    ADVERTISED_SERVICE_UUID, APPEARANCE_GENERIC_SENSOR, DEFAULT_DEVICE_NAME,
};
use crate::types::{AdvertisingParams, ScanParams};

// ----------------------------------------------------------------------------
// Central Configuration
// ----------------------------------------------------------------------------

/// Configuration for the scanning, polling side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralConfig {
    /// Advertised name to connect to
    pub peer_name: String,
    pub scan_timeout_ms: u64,
    pub scan_interval_us: u64,
    pub scan_window_us: u64,
    pub active_scan: bool,
    pub connect_timeout_ms: u64,
    /// Budget for each of the service and characteristic lookups
    pub resolve_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub retry: RetryPolicy,
}

/// Re-attempts of sessions that fail before a connection exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts after the first; zero disables retrying
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn attempts(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff_ms: backoff.as_millis() as u64,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for CentralConfig {
    fn default() -> Self {
        Self {
            peer_name: DEFAULT_DEVICE_NAME.to_string(),
            scan_timeout_ms: 5000,
            scan_interval_us: 30_000,
            scan_window_us: 30_000,
            active_scan: true,
            connect_timeout_ms: 10_000,
            resolve_timeout_ms: 2000,
            read_timeout_ms: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

impl CentralConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer_name(mut self, name: impl Into<String>) -> Self {
        self.peer_name = name.into();
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn scan_params(&self) -> ScanParams {
        ScanParams {
            duration: self.scan_timeout(),
            interval: Duration::from_micros(self.scan_interval_us),
            window: Duration::from_micros(self.scan_window_us),
            active: self.active_scan,
            services: vec![ADVERTISED_SERVICE_UUID],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_name.is_empty() {
            return Err(ConfigError::Validation(
                "Central peer name must not be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("scan_timeout_ms", self.scan_timeout_ms),
            ("scan_interval_us", self.scan_interval_us),
            ("scan_window_us", self.scan_window_us),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("resolve_timeout_ms", self.resolve_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "central.{} must be greater than 0",
                    name
                )));
            }
        }
        if self.scan_window_us > self.scan_interval_us {
            return Err(ConfigError::Validation(format!(
                "Scan window ({}us) must not exceed scan interval ({}us)",
                self.scan_window_us, self.scan_interval_us
            )));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Peripheral Configuration
// ----------------------------------------------------------------------------

/// Configuration for the advertising, producing side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralConfig {
    pub device_name: String,
    pub advertising_interval_ms: u64,
    pub appearance: u16,
    /// Starting temperature of the simulated sensor
    pub initial_value: f32,
    /// Largest random step applied between cycles
    pub max_step: f32,
    /// Fixed serial number; random per process when unset
    pub serial: Option<String>,
    /// Seed for the simulated sensor; entropy when unset
    pub seed: Option<u64>,
    /// Delay before advertising again after a radio error
    pub advertise_retry_ms: u64,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            advertising_interval_ms: 250,
            appearance: APPEARANCE_GENERIC_SENSOR,
            initial_value: 24.5,
            max_step: 0.5,
            serial: None,
            seed: None,
            advertise_retry_ms: 1000,
        }
    }
}

impl PeripheralConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn with_initial_value(mut self, value: f32) -> Self {
        self.initial_value = value;
        self
    }

    pub fn with_max_step(mut self, step: f32) -> Self {
        self.max_step = step;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn advertising_interval(&self) -> Duration {
        Duration::from_millis(self.advertising_interval_ms)
    }

    pub fn advertise_retry(&self) -> Duration {
        Duration::from_millis(self.advertise_retry_ms)
    }

    pub fn advertising_params(&self) -> AdvertisingParams {
        AdvertisingParams {
            local_name: self.device_name.clone(),
            services: vec![ADVERTISED_SERVICE_UUID],
            appearance: self.appearance,
            interval: self.advertising_interval(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::Validation(
                "Peripheral device name must not be empty".to_string(),
            ));
        }
        if self.advertising_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Advertising interval must be greater than 0".to_string(),
            ));
        }
        SensorValue::from_celsius(self.initial_value).map_err(|e| {
            ConfigError::Validation(format!("Invalid initial value: {}", e))
        })?;
        if !self.max_step.is_finite() || self.max_step < 0.0 {
            return Err(ConfigError::Validation(format!(
                "Maximum step must be a non-negative number, got {}",
                self.max_step
            )));
        }
        if self.max_step > MAX_STEP {
            return Err(ConfigError::Validation(format!(
                "Maximum step must not exceed {}, got {}",
                MAX_STEP, self.max_step
            )));
        }
        if let Some(serial) = &self.serial {
            if serial.is_empty() {
                return Err(ConfigError::Validation(
                    "Serial number must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}
