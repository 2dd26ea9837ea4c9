//! In-memory radio for sensorlink
//!
//! [`SimulatedAir`] implements both sides of the transport boundary without
//! hardware so the roles can be run against each other in one process, with
//! deterministic timing under tokio's paused clock. Faults (malformed reads,
//! read timeouts, ATT errors, stalled connects and lookups, advertising
//! failures, dropped links) are injected through the air.

mod air;
mod central;
mod led;
mod peripheral;
mod sensor;

pub use air::{AirConfig, AirCounters, ReadFault, SimulatedAir};
pub use central::{SimCentral, SimLink};
pub use led::RecordingLed;
pub use peripheral::{SimInboundConnection, SimPeripheral};
pub use sensor::ScriptedSensor;

use sensorlink_core::PeerAddress;

/// Address the simulated peripheral uses unless a test picks another
pub const PERIPHERAL_ADDRESS: PeerAddress = PeerAddress::new([0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x01]);

/// Address the simulated central uses unless a test picks another
pub const CENTRAL_ADDRESS: PeerAddress = PeerAddress::new([0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x02]);
