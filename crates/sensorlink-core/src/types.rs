//! Value types exchanged across the transport boundary

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TransportError;

// ----------------------------------------------------------------------------
// Addresses and Handles
// ----------------------------------------------------------------------------

/// 48-bit device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerAddress([u8; 6]);

impl PeerAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for PeerAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::Protocol(format!("invalid device address: {}", s));
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

/// Identifies one open connection; the connection itself stays with its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A resolved service on a connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandle {
    pub uuid: Uuid,
}

/// A resolved (service, characteristic) pair on a connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointHandle {
    pub service: Uuid,
    pub characteristic: Uuid,
}

// ----------------------------------------------------------------------------
// Discovery
// ----------------------------------------------------------------------------

/// One advertising report as observed by a scanning central
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    pub address: PeerAddress,
    pub local_name: Option<String>,
    pub services: Vec<Uuid>,
    pub appearance: Option<u16>,
    pub rssi: Option<i16>,
}

impl Advertisement {
    /// Exact name match AND the service set contains `service`
    pub fn matches(&self, name: &str, service: &Uuid) -> bool {
        self.local_name.as_deref() == Some(name) && self.services.contains(service)
    }
}

/// A discovery result handed to the connection step
#[derive(Debug, Clone, PartialEq)]
pub struct PeerDescriptor {
    pub address: PeerAddress,
    pub name: String,
    pub services: Vec<Uuid>,
    pub rssi: Option<i16>,
}

impl From<Advertisement> for PeerDescriptor {
    fn from(advertisement: Advertisement) -> Self {
        Self {
            address: advertisement.address,
            name: advertisement.local_name.unwrap_or_default(),
            services: advertisement.services,
            rssi: advertisement.rssi,
        }
    }
}

/// Scan parameters passed to the radio
#[derive(Debug, Clone, PartialEq)]
pub struct ScanParams {
    pub duration: Duration,
    pub interval: Duration,
    pub window: Duration,
    pub active: bool,
    /// Services the radio may pre-filter on; matching is still done by the caller
    pub services: Vec<Uuid>,
}

// ----------------------------------------------------------------------------
// Peripheral Side
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisingParams {
    pub local_name: String,
    pub services: Vec<Uuid>,
    pub appearance: u16,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicDefinition {
    pub uuid: Uuid,
    pub readable: bool,
    pub notify: bool,
    pub initial_value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ADVERTISED_SERVICE_UUID, SENSOR_SERVICE_UUID};

    fn advert(name: Option<&str>, services: Vec<Uuid>) -> Advertisement {
        Advertisement {
            address: PeerAddress::new([1, 2, 3, 4, 5, 6]),
            local_name: name.map(str::to_string),
            services,
            appearance: None,
            rssi: Some(-60),
        }
    }

    #[test]
    fn test_advertisement_matching_requires_name_and_service() {
        assert!(advert(Some("sensor"), vec![ADVERTISED_SERVICE_UUID])
            .matches("sensor", &ADVERTISED_SERVICE_UUID));
        assert!(!advert(Some("sensor2"), vec![ADVERTISED_SERVICE_UUID])
            .matches("sensor", &ADVERTISED_SERVICE_UUID));
        assert!(!advert(Some("sensor"), vec![SENSOR_SERVICE_UUID])
            .matches("sensor", &ADVERTISED_SERVICE_UUID));
        assert!(!advert(None, vec![ADVERTISED_SERVICE_UUID])
            .matches("sensor", &ADVERTISED_SERVICE_UUID));
    }

    #[test]
    fn test_peer_address_text_form() {
        let address: PeerAddress = "AA:bb:0C:00:10:FF".parse().unwrap();
        assert_eq!(address.as_bytes(), &[0xAA, 0xBB, 0x0C, 0x00, 0x10, 0xFF]);
        assert_eq!(address.to_string(), "AA:BB:0C:00:10:FF");

        assert!("AA:BB".parse::<PeerAddress>().is_err());
        assert!("AA:BB:CC:DD:EE:FF:00".parse::<PeerAddress>().is_err());
        assert!("ZZ:BB:CC:DD:EE:FF".parse::<PeerAddress>().is_err());
    }
}
