//! Wire format of the sensor characteristic
//!
//! A reading travels as a signed 16-bit little-endian integer holding the
//! temperature in hundredths of a degree. Exactly two bytes, nothing else.

use std::fmt;

use crate::errors::CodecError;

/// Size of an encoded reading in bytes
pub const ENCODED_LEN: usize = 2;

const SCALE: f64 = 100.0;

/// A sensor reading in fixed-point centi-units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorValue(i16);

impl SensorValue {
    pub const MIN: SensorValue = SensorValue(i16::MIN);
    pub const MAX: SensorValue = SensorValue(i16::MAX);

    pub const fn from_centi(centi: i16) -> Self {
        Self(centi)
    }

    /// Scale a reading to centi-units, rounding to the nearest step
    ///
    /// Non-finite values and values whose scaled form does not fit `i16` are
    /// rejected rather than clamped.
    pub fn from_celsius(value: f32) -> Result<Self, CodecError> {
        if !value.is_finite() {
            return Err(CodecError::OutOfRange(value));
        }
        let scaled = (f64::from(value) * SCALE).round();
        if scaled < f64::from(i16::MIN) || scaled > f64::from(i16::MAX) {
            return Err(CodecError::OutOfRange(value));
        }
        Ok(Self(scaled as i16))
    }

    pub fn centi(self) -> i16 {
        self.0
    }

    pub fn celsius(self) -> f32 {
        (f64::from(self.0) / SCALE) as f32
    }

    pub fn encode(self) -> [u8; ENCODED_LEN] {
        self.0.to_le_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw: [u8; ENCODED_LEN] =
            bytes
                .try_into()
                .map_err(|_| CodecError::WrongLength {
                    expected: ENCODED_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(i16::from_le_bytes(raw)))
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.celsius())
    }
}
