//! Property-based tests for the sensor value wire format

use proptest::prelude::*;
use sensorlink_core::{CodecError, SensorValue};

proptest! {
    /// Property: every centi-value survives the two-byte encoding unchanged
    #[test]
    fn every_centi_value_round_trips(centi in any::<i16>()) {
        let value = SensorValue::from_centi(centi);
        let decoded = SensorValue::decode(&value.encode()).expect("two bytes always decode");
        prop_assert_eq!(decoded, value);
    }

    /// Property: scaling a reading is exact to one centi-unit
    #[test]
    fn scaling_is_within_one_step(reading in -327.0f32..327.0f32) {
        let value = SensorValue::from_celsius(reading).expect("reading is in range");
        prop_assert!((value.celsius() - reading).abs() <= 0.005 + f32::EPSILON * 512.0);
    }

    /// Property: readings beyond the i16 range are rejected, not clamped
    #[test]
    fn out_of_range_readings_are_rejected(
        magnitude in 328.0f32..1.0e6f32,
        negative in any::<bool>(),
    ) {
        let reading = if negative { -magnitude } else { magnitude };
        prop_assert!(matches!(
            SensorValue::from_celsius(reading),
            Err(CodecError::OutOfRange(_))
        ));
    }

    /// Property: any payload that is not exactly two bytes is malformed
    #[test]
    fn wrong_length_payloads_are_rejected(payload in prop::collection::vec(any::<u8>(), 0..16)) {
        prop_assume!(payload.len() != 2);
        let result = SensorValue::decode(&payload);
        prop_assert_eq!(
            result,
            Err(CodecError::WrongLength { expected: 2, actual: payload.len() })
        );
    }
}
