//! Command handlers for the sensorlink CLI

use std::time::Duration;

use anyhow::Context;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use sensorlink_core::{
    Central, CentralRole, PeripheralConfig, PeripheralRole, SessionOutcome, SimulatedSensor,
    TracingLed,
};
use sensorlink_harness::{AirConfig, SimulatedAir, CENTRAL_ADDRESS, PERIPHERAL_ADDRESS};

use crate::cli::{Cli, Commands, FaultArg};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Good reads before an injected fault takes effect
const FAULT_AFTER_READS: u64 = 50;

/// How long an interrupted central gets to tear its link down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Central => Self::handle_central_command(config).await,
            Commands::Peripheral => Self::handle_peripheral_command(config).await,
            Commands::Simulate {
                duration_secs,
                fault,
                seed,
            } => {
                Self::handle_simulate_command(config, Duration::from_secs(duration_secs), fault, seed)
                    .await
            }
            Commands::Config { example } => Self::handle_config_command(&config, example),
        }
    }

    /// Handle the central command on the host radio
    #[cfg(feature = "hardware")]
    async fn handle_central_command(config: AppConfig) -> Result<()> {
        let central = sensorlink_ble::BtleplugCentral::new().await?;
        let role = CentralRole::new(central, TracingLed::new(), config.central);
        let outcome = run_central(role).await?;
        info!("Central finished: {}", outcome);
        Ok(())
    }

    #[cfg(not(feature = "hardware"))]
    async fn handle_central_command(_config: AppConfig) -> Result<()> {
        Err(CliError::FeatureNotAvailable(
            "the central role needs a build with the `hardware` feature".to_string(),
        ))
    }

    /// Handle the peripheral command on the host radio
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    async fn handle_peripheral_command(config: AppConfig) -> Result<()> {
        let peripheral = sensorlink_ble::BluezPeripheral::new().await?;
        let sensor = simulated_sensor(&config.peripheral);
        let mut role = PeripheralRole::new(peripheral, sensor, TracingLed::new(), &config.peripheral)?;
        info!("Peripheral serial number {}", role.identity().serial);

        tokio::select! {
            result = role.run() => result?,
            result = shutdown_signal() => {
                result?;
                info!("Interrupted, stopping peripheral");
            }
        }
        Ok(())
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    async fn handle_peripheral_command(_config: AppConfig) -> Result<()> {
        Err(CliError::FeatureNotAvailable(
            "the peripheral role needs a Linux build with the `hardware` feature".to_string(),
        ))
    }

    /// Handle the simulate command: both roles over one in-memory air
    async fn handle_simulate_command(
        mut config: AppConfig,
        duration: Duration,
        fault: FaultArg,
        seed: Option<u64>,
    ) -> Result<()> {
        if seed.is_some() {
            config.peripheral.seed = seed;
        }

        let air = SimulatedAir::new(AirConfig::default());
        if let Some(read_fault) = fault.read_fault() {
            info!("Injecting {:?} read fault after {} reads", read_fault, FAULT_AFTER_READS);
            air.schedule_read_fault(read_fault, FAULT_AFTER_READS);
        }

        let sensor = simulated_sensor(&config.peripheral);
        let mut peripheral = PeripheralRole::new(
            air.peripheral(PERIPHERAL_ADDRESS),
            sensor,
            TracingLed::new(),
            &config.peripheral,
        )?;
        let serial = peripheral.identity().serial.clone();
        let mut central = CentralRole::new(
            air.central(CENTRAL_ADDRESS),
            TracingLed::new(),
            config.central.clone(),
        );
        let readings = central.session().readings();

        info!("Simulating for up to {:?}", duration);
        let outcome = tokio::select! {
            outcome = central.run() => Some(outcome),
            result = peripheral.run() => {
                result?;
                None
            }
            _ = sleep(duration) => None,
            result = shutdown_signal() => {
                result?;
                info!("Interrupted");
                None
            }
        };

        let counters = air.counters();
        let last_reading = *readings.borrow();
        println!("Simulation summary");
        match &outcome {
            Some(outcome) => println!("  outcome:        {}", outcome),
            None => println!("  outcome:        still running when stopped"),
        }
        match last_reading {
            Some(value) => println!("  last reading:   {} °C", value),
            None => println!("  last reading:   none"),
        }
        println!("  serial:         {}", serial);
        println!("  scans:          {}", counters.scans);
        println!("  connections:    {}", counters.connections);
        println!("  reads:          {}", counters.reads);
        println!("  writes:         {}", counters.writes);
        println!("  notifications:  {}", counters.notifications);
        Ok(())
    }

    /// Handle the config command
    fn handle_config_command(config: &AppConfig, example: bool) -> Result<()> {
        if example {
            println!("{}", AppConfig::example_config());
        } else {
            println!("{}", config.to_toml()?);
        }
        Ok(())
    }
}

/// Run a central role until it terminates, shutting it down on Ctrl-C
#[cfg_attr(not(feature = "hardware"), allow(dead_code))]
async fn run_central<C, L>(mut role: CentralRole<C, L>) -> Result<SessionOutcome>
where
    C: Central,
    L: sensorlink_core::StatusLed,
{
    let state = role.state().clone();
    let run = role.run();
    tokio::pin!(run);

    tokio::select! {
        outcome = &mut run => Ok(outcome),
        result = shutdown_signal() => {
            result?;
            info!("Interrupted, stopping central");
            state.terminate();
            match timeout(SHUTDOWN_GRACE, run).await {
                Ok(outcome) => Ok(outcome),
                Err(_) => {
                    warn!("Central did not stop within {:?}", SHUTDOWN_GRACE);
                    Ok(SessionOutcome::Cancelled)
                }
            }
        }
    }
}

fn simulated_sensor(config: &PeripheralConfig) -> SimulatedSensor {
    match config.seed {
        Some(seed) => SimulatedSensor::with_seed(config.initial_value, config.max_step, seed),
        None => SimulatedSensor::new(config.initial_value, config.max_step),
    }
}

async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    Ok(())
}
