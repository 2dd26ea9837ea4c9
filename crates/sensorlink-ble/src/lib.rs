//! Bluetooth Low Energy backends for sensorlink
//!
//! This crate implements the transport traits from `sensorlink-core` on real
//! radios. Each backend sits behind a cargo feature so the default build has
//! no system Bluetooth dependencies:
//!
//! - `btleplug` - [`BtleplugCentral`], the central role (scan, connect, read)
//! - `bluez` - [`BluezPeripheral`], the peripheral role (GATT server and
//!   advertising), Linux only
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sensorlink_ble::BtleplugCentral;
//! use sensorlink_core::{CentralConfig, CentralRole, TracingLed};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let central = BtleplugCentral::new().await?;
//! let mut role = CentralRole::new(central, TracingLed::new(), CentralConfig::default());
//! let outcome = role.run().await;
//! println!("session ended: {}", outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! - **Central**: every platform btleplug supports (Linux, macOS, Windows)
//! - **Peripheral**: Linux via `bluer` and BlueZ. Other platforms can only
//!   run the peripheral role against the simulated air in `sensorlink-harness`.

mod error;

#[cfg_attr(not(all(feature = "bluez", target_os = "linux")), allow(dead_code))]
mod connections;

#[cfg_attr(not(all(feature = "bluez", target_os = "linux")), allow(dead_code))]
mod updates;

#[cfg(feature = "btleplug")]
mod central;

#[cfg(all(feature = "bluez", target_os = "linux"))]
mod peripheral;

pub use error::BleSetupError;

#[cfg(feature = "btleplug")]
pub use central::{BtleplugCentral, BtleplugLink};

#[cfg(all(feature = "bluez", target_os = "linux"))]
pub use peripheral::{BluezConnection, BluezPeripheral};
