//! Sensorlink CLI configuration management
//!
//! Configuration is layered with figment, lowest priority first:
//! - built-in defaults
//! - a TOML file (`-c <file>`, otherwise `sensorlink.toml` if present)
//! - environment variables `SENSORLINK_<SECTION>__<KEY>`

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use sensorlink_core::{CentralConfig, ConfigError, PeripheralConfig, RetryPolicy};

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sensorlink.toml";

const ENV_PREFIX: &str = "SENSORLINK_";

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for both roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub central: CentralConfig,
    pub peripheral: PeripheralConfig,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load defaults, then `path` (or `sensorlink.toml`), then the environment
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            Self::require_file(Path::new(path))?;
        }
        let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
        Self::extract(Self::figment().merge(Toml::file(file)).merge(Self::env()))
    }

    /// Load from a specific file path on top of the defaults, ignoring the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        Self::require_file(path)?;
        Self::extract(Self::figment().merge(Toml::file(path)))
    }

    fn require_file(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            Ok(())
        } else {
            Err(ConfigError::Loading(format!(
                "Configuration file {} does not exist",
                path.display()
            )))
        }
    }

    fn figment() -> Figment {
        Figment::new().merge(Serialized::defaults(Self::default()))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate both role sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.central.validate()?;
        self.peripheral.validate()?;
        if self.central.peer_name != self.peripheral.device_name {
            tracing::warn!(
                "central.peer_name '{}' differs from peripheral.device_name '{}'; \
                 the simulated roles will not find each other",
                self.central.peer_name,
                self.peripheral.device_name
            );
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        let example = AppConfig {
            central: CentralConfig::default()
                .with_retry(RetryPolicy::attempts(3, std::time::Duration::from_secs(2))),
            peripheral: PeripheralConfig::default()
                .with_serial("0123456789abcdef")
                .with_seed(42),
        };

        example
            .to_toml()
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
