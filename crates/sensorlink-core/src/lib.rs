//! Core of the sensorlink BLE sensor link
//!
//! A peripheral owns a simulated temperature and publishes it once a second;
//! a central discovers it, connects, resolves the sensor characteristic and
//! polls it until the link fails. This crate holds everything above the radio:
//! the session state machine, the peripheral loops, the wire codec and the
//! shared session state. Radios plug in through the traits in [`transport`].
//!
//! ## Architecture
//!
//! - [`state`] - `connected` / `alive` flags shared by the tasks of one role
//! - [`discovery`] - scanning for a peer by name and service
//! - [`session`] - the central's connect, resolve and poll state machine
//! - [`advertising`] - the peripheral's advertise / accept / wait loop
//! - [`producer`] - periodic write + notify of the sensor value
//! - [`indicator`] - status LED blink driven by `connected`
//! - [`roles`] - composition of the above into central and peripheral roles
//! - [`codec`] - fixed-point wire format of a reading
//! - [`transport`] - radio traits implemented by backends and the simulator
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sensorlink_core::{CentralConfig, CentralRole, Central, TracingLed};
//!
//! # async fn example<C: Central>(radio: C) {
//! let mut role = CentralRole::new(radio, TracingLed::new(), CentralConfig::default());
//! let outcome = role.run().await;
//! println!("session ended: {}", outcome);
//! # }
//! ```

pub mod advertising;
pub mod codec;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod gatt;
pub mod indicator;
pub mod producer;
pub mod protocol;
pub mod roles;
pub mod sensor;
pub mod session;
pub mod state;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use advertising::AdvertisingManager;
pub use codec::SensorValue;
pub use config::{CentralConfig, PeripheralConfig, RetryPolicy};
pub use discovery::DiscoveryEngine;
pub use errors::{
    CodecError, ConfigError, Endpoint, ProducerError, ReadFailure, Result, SensorError,
    SensorlinkError, SessionOutcome, TransportError,
};
pub use gatt::DeviceIdentity;
pub use indicator::{blink_period, IndicatorMode, StatusIndicator, StatusLed, TracingLed};
pub use producer::DataProducer;
pub use roles::{CentralRole, PeripheralRole};
pub use sensor::{SensorSource, SimulatedSensor};
pub use session::{SessionManager, SessionPhase};
pub use state::{SessionState, StateChange, StateSnapshot};
pub use transport::{Central, CentralLink, InboundConnection, Peripheral};
pub use types::{
    AdvertisingParams, Advertisement, CharacteristicDefinition, ConnectionHandle,
    EndpointHandle, PeerAddress, PeerDescriptor, ScanParams, ServiceDefinition, ServiceHandle,
};
