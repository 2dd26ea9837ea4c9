//! GATT identifiers, advertising constants and fixed cadences

use std::time::Duration;

use rand::RngCore;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

/// Bluetooth base UUID, `0000xxxx-0000-1000-8000-00805f9b34fb`
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;

/// Expand a 16-bit SIG assigned number onto the Bluetooth base UUID
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Recover the 16-bit assigned number from a base-UUID identifier
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let mask = !(0xFFFF_u128 << 96);
    if value & mask == BLUETOOTH_BASE_UUID {
        Some((value >> 96) as u16)
    } else {
        None
    }
}

/// Service advertised by the peripheral and used as the central's scan filter
pub const ADVERTISED_SERVICE_UUID: Uuid = uuid_from_u16(0x1800);

/// Service holding the sensor characteristic
pub const SENSOR_SERVICE_UUID: Uuid = uuid_from_u16(0x1815);

/// Temperature characteristic (read + notify)
pub const SENSOR_CHARACTERISTIC_UUID: Uuid = uuid_from_u16(0x2A6E);

/// Device information service
pub const DEVICE_INFO_SERVICE_UUID: Uuid = uuid_from_u16(0x180A);

/// Serial number string
pub const SERIAL_NUMBER_UUID: Uuid = uuid_from_u16(0x2A25);

/// Firmware revision string
pub const FIRMWARE_REVISION_UUID: Uuid = uuid_from_u16(0x2A26);

// ----------------------------------------------------------------------------
// Advertising
// ----------------------------------------------------------------------------

/// Name the peripheral advertises and the central filters on
pub const DEFAULT_DEVICE_NAME: &str = "sensor";

/// GAP appearance: generic sensor
pub const APPEARANCE_GENERIC_SENSOR: u16 = 0x054F;

pub const DEFAULT_ADVERTISING_INTERVAL: Duration = Duration::from_millis(250);

pub const FIRMWARE_REVISION: &str = concat!("sensorlink ", env!("CARGO_PKG_VERSION"));

// ----------------------------------------------------------------------------
// Cadences
// ----------------------------------------------------------------------------

/// Delay between consecutive reads while polling
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Period of the peripheral's write + notify cycle
pub const NOTIFY_PERIOD: Duration = Duration::from_millis(1000);

pub const BLINK_PERIOD_CONNECTED: Duration = Duration::from_millis(1000);
pub const BLINK_PERIOD_IDLE: Duration = Duration::from_millis(250);

/// Generate a random 8-byte serial number rendered as lowercase hex
pub fn generate_serial_number() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
