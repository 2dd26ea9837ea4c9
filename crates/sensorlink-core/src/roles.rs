//! Role composition
//!
//! Each role runs its tasks concurrently on the caller's task with
//! `tokio::join!`, so a single-threaded runtime is enough:
//!
//! - central: session (with optional retries) + status indicator
//! - peripheral: advertising + data producer + status indicator

use std::sync::Arc;

use tokio::time::sleep;
use tracing::info;

use crate::advertising::AdvertisingManager;
use crate::codec::SensorValue;
use crate::config::{CentralConfig, PeripheralConfig, RetryPolicy};
use crate::errors::{Result, SessionOutcome};
use crate::gatt::{sensor_services, DeviceIdentity};
use crate::indicator::{IndicatorMode, StatusIndicator, StatusLed};
use crate::producer::DataProducer;
use crate::sensor::SensorSource;
use crate::session::SessionManager;
use crate::state::SessionState;
use crate::transport::{Central, Peripheral};
use crate::types::ServiceDefinition;

// ----------------------------------------------------------------------------
// Central Role
// ----------------------------------------------------------------------------

pub struct CentralRole<C: Central, L> {
    session: SessionManager<C>,
    indicator: StatusIndicator<L>,
    retry: RetryPolicy,
}

impl<C: Central, L: StatusLed> CentralRole<C, L> {
    pub fn new(central: C, led: L, config: CentralConfig) -> Self {
        let state = SessionState::shared();
        let retry = config.retry.clone();
        Self {
            indicator: StatusIndicator::new(led, state.clone(), IndicatorMode::UntilSessionEnds),
            session: SessionManager::new(central, config, state),
            retry,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        self.session.state()
    }

    pub fn session(&self) -> &SessionManager<C> {
        &self.session
    }

    pub fn indicator(&self) -> &StatusIndicator<L> {
        &self.indicator
    }

    /// Run until the session terminates and the indicator has stopped
    pub async fn run(&mut self) -> SessionOutcome {
        let session = &self.session;
        let retry = &self.retry;
        let indicator = &mut self.indicator;
        let (outcome, ()) = tokio::join!(run_with_retry(session, retry), indicator.run());
        outcome
    }
}

/// Re-run sessions that failed before connecting, then latch `alive` false
async fn run_with_retry<C: Central>(
    session: &SessionManager<C>,
    retry: &RetryPolicy,
) -> SessionOutcome {
    let mut retries = 0;
    loop {
        let outcome = session.run().await;
        if outcome.is_retryable() && retries < retry.max_retries && session.state().is_alive() {
            retries += 1;
            info!(
                "Retrying session in {:?} (retry {}/{})",
                retry.backoff(),
                retries,
                retry.max_retries
            );
            sleep(retry.backoff()).await;
            continue;
        }
        session.state().terminate();
        return outcome;
    }
}

// ----------------------------------------------------------------------------
// Peripheral Role
// ----------------------------------------------------------------------------

pub struct PeripheralRole<P, S, L> {
    peripheral: P,
    services: Vec<ServiceDefinition>,
    identity: DeviceIdentity,
    advertiser: AdvertisingManager,
    producer: DataProducer<S>,
    indicator: StatusIndicator<L>,
    state: Arc<SessionState>,
}

impl<P: Peripheral, S: SensorSource, L: StatusLed> PeripheralRole<P, S, L> {
    pub fn new(peripheral: P, sensor: S, led: L, config: &PeripheralConfig) -> Result<Self> {
        config.validate()?;
        let initial = SensorValue::from_celsius(config.initial_value)?;
        let identity = DeviceIdentity::new(config.serial.clone());
        let state = SessionState::shared();

        Ok(Self {
            peripheral,
            services: sensor_services(initial, &identity),
            identity,
            advertiser: AdvertisingManager::new(
                config.advertising_params(),
                config.advertise_retry(),
                state.clone(),
            ),
            producer: DataProducer::new(sensor, state.clone()),
            indicator: StatusIndicator::new(led, state.clone(), IndicatorMode::Forever),
            state,
        })
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Register the service table, then run all peripheral tasks
    ///
    /// Only returns if service registration fails.
    pub async fn run(&mut self) -> Result<()> {
        self.peripheral.register_services(&self.services).await?;
        info!(
            "Registered {} services (serial {}, {})",
            self.services.len(),
            self.identity.serial,
            self.identity.firmware
        );

        let peripheral = &self.peripheral;
        let advertiser = &self.advertiser;
        let producer = &mut self.producer;
        let indicator = &mut self.indicator;
        tokio::join!(
            advertiser.run(peripheral),
            producer.run(peripheral),
            indicator.run()
        );
        Ok(())
    }
}
