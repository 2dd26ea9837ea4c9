//! Periodic publication of the sensor value

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::SensorValue;
use crate::errors::ProducerError;
use crate::protocol::{NOTIFY_PERIOD, SENSOR_CHARACTERISTIC_UUID};
use crate::sensor::SensorSource;
use crate::state::SessionState;
use crate::transport::Peripheral;

/// Writes the latest reading to the sensor characteristic and notifies the
/// connected central, once per period, only while connected
pub struct DataProducer<S> {
    sensor: S,
    state: Arc<SessionState>,
    characteristic: Uuid,
    period: Duration,
}

impl<S: SensorSource> DataProducer<S> {
    pub fn new(sensor: S, state: Arc<SessionState>) -> Self {
        Self {
            sensor,
            state,
            characteristic: SENSOR_CHARACTERISTIC_UUID,
            period: NOTIFY_PERIOD,
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub async fn run<P: Peripheral>(&mut self, peripheral: &P) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick(peripheral).await {
                warn!("Dropped producer cycle: {}", e);
            }
        }
    }

    /// One cycle; returns the published value, or `None` when skipped
    pub async fn tick<P: Peripheral>(
        &mut self,
        peripheral: &P,
    ) -> Result<Option<SensorValue>, ProducerError> {
        if !self.state.is_connected() {
            return Ok(None);
        }
        let Some(connection) = self.state.connection() else {
            return Ok(None);
        };

        let value = self.sensor.read().await?;
        peripheral
            .write_value(self.characteristic, &value.encode())
            .await?;
        peripheral.notify(connection, self.characteristic).await?;
        debug!("Published {} to {}", value, connection);
        Ok(Some(value))
    }
}
