//! Deterministic sensor for scenario tests

use std::collections::VecDeque;

use async_trait::async_trait;

use sensorlink_core::{SensorError, SensorSource, SensorValue};

/// Yields a fixed sequence of readings, then repeats the last one
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    script: VecDeque<SensorValue>,
    last: Option<SensorValue>,
    reads: usize,
}

impl ScriptedSensor {
    pub fn new(readings: impl IntoIterator<Item = SensorValue>) -> Self {
        Self {
            script: readings.into_iter().collect(),
            last: None,
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

#[async_trait]
impl SensorSource for ScriptedSensor {
    async fn read(&mut self) -> Result<SensorValue, SensorError> {
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        self.reads += 1;
        self.last
            .ok_or_else(|| SensorError::Unavailable("empty script".to_string()))
    }
}
