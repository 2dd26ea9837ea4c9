//! Services hosted by the peripheral

use crate::codec::SensorValue;
use crate::protocol::{
    generate_serial_number, DEVICE_INFO_SERVICE_UUID, FIRMWARE_REVISION, FIRMWARE_REVISION_UUID,
    SENSOR_CHARACTERISTIC_UUID, SENSOR_SERVICE_UUID, SERIAL_NUMBER_UUID,
};
use crate::types::{CharacteristicDefinition, ServiceDefinition};

/// Strings published through the device information service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub serial: String,
    pub firmware: String,
}

impl DeviceIdentity {
    /// Use `serial` when given, otherwise a random one for this process
    pub fn new(serial: Option<String>) -> Self {
        Self {
            serial: serial.unwrap_or_else(generate_serial_number),
            firmware: FIRMWARE_REVISION.to_string(),
        }
    }
}

/// The sensor service, seeded with `initial` so early reads are well formed,
/// followed by the device information service
pub fn sensor_services(initial: SensorValue, identity: &DeviceIdentity) -> Vec<ServiceDefinition> {
    vec![
        ServiceDefinition {
            uuid: SENSOR_SERVICE_UUID,
            characteristics: vec![CharacteristicDefinition {
                uuid: SENSOR_CHARACTERISTIC_UUID,
                readable: true,
                notify: true,
                initial_value: initial.encode().to_vec(),
            }],
        },
        ServiceDefinition {
            uuid: DEVICE_INFO_SERVICE_UUID,
            characteristics: vec![
                read_only(SERIAL_NUMBER_UUID, identity.serial.as_bytes()),
                read_only(FIRMWARE_REVISION_UUID, identity.firmware.as_bytes()),
            ],
        },
    ]
}

fn read_only(uuid: uuid::Uuid, value: &[u8]) -> CharacteristicDefinition {
    CharacteristicDefinition {
        uuid,
        readable: true,
        notify: false,
        initial_value: value.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_table_layout() {
        let identity = DeviceIdentity::new(Some("0011223344556677".to_string()));
        let services = sensor_services(SensorValue::from_centi(2450), &identity);

        assert_eq!(services.len(), 2);
        let sensor = &services[0];
        assert_eq!(sensor.uuid, SENSOR_SERVICE_UUID);
        assert_eq!(sensor.characteristics[0].initial_value, vec![0x92, 0x09]);
        assert!(sensor.characteristics[0].notify);

        let info = &services[1];
        assert_eq!(info.uuid, DEVICE_INFO_SERVICE_UUID);
        assert_eq!(info.characteristics[0].initial_value, b"0011223344556677".to_vec());
        assert!(String::from_utf8_lossy(&info.characteristics[1].initial_value)
            .starts_with("sensorlink "));
    }

    #[test]
    fn test_random_serial_when_unset() {
        let identity = DeviceIdentity::new(None);
        assert_eq!(identity.serial.len(), 16);
    }
}
