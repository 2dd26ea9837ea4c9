//! Sensor sources for the data producer

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::codec::SensorValue;
use crate::errors::SensorError;

/// A source of sensor readings
#[async_trait]
pub trait SensorSource: Send {
    async fn read(&mut self) -> Result<SensorValue, SensorError>;
}

/// Largest step a simulated sensor takes: the whole encodable range
pub const MAX_STEP: f32 = 655.35;

/// Random-walk temperature
///
/// Each read returns the current value, then moves it by a uniform step in
/// `[-max_step, max_step]`, kept inside the encodable range. Steps larger
/// than [`MAX_STEP`] are capped and a non-finite step disables the walk.
#[derive(Debug)]
pub struct SimulatedSensor {
    current: f32,
    max_step: f32,
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new(initial: f32, max_step: f32) -> Self {
        Self::with_rng(initial, max_step, StdRng::from_entropy())
    }

    pub fn with_seed(initial: f32, max_step: f32, seed: u64) -> Self {
        Self::with_rng(initial, max_step, StdRng::seed_from_u64(seed))
    }

    fn with_rng(initial: f32, max_step: f32, rng: StdRng) -> Self {
        let max_step = if max_step.is_finite() {
            max_step.abs().min(MAX_STEP)
        } else {
            0.0
        };
        Self {
            current: initial,
            max_step,
            rng,
        }
    }

    fn step(&mut self) {
        if self.max_step > 0.0 {
            let delta = self.rng.gen_range(-self.max_step..=self.max_step);
            self.current = (self.current + delta)
                .clamp(SensorValue::MIN.celsius(), SensorValue::MAX.celsius());
        }
    }
}

#[async_trait]
impl SensorSource for SimulatedSensor {
    async fn read(&mut self) -> Result<SensorValue, SensorError> {
        let value = SensorValue::from_celsius(self.current)?;
        self.step();
        Ok(value)
    }
}
