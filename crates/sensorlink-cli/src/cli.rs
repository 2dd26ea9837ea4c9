//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand, ValueEnum};
use sensorlink_harness::ReadFault;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the sensor, connect and poll it until the link fails
    Central,
    /// Advertise the sensor service and publish readings to whoever connects
    Peripheral,
    /// Run both roles against each other over an in-memory radio
    Simulate {
        /// Stop after this many seconds if the session is still running
        #[arg(long, default_value_t = 10)]
        duration_secs: u64,
        /// Fault injected into characteristic reads once polling is underway
        #[arg(long, value_enum, default_value_t = FaultArg::None)]
        fault: FaultArg,
        /// Seed for the simulated sensor
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Print an example configuration instead
        #[arg(long)]
        example: bool,
    },
}

/// Read fault selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FaultArg {
    None,
    Malformed,
    Timeout,
    Protocol,
}

impl FaultArg {
    pub fn read_fault(self) -> Option<ReadFault> {
        match self {
            FaultArg::None => None,
            FaultArg::Malformed => Some(ReadFault::Malformed),
            FaultArg::Timeout => Some(ReadFault::Timeout),
            FaultArg::Protocol => Some(ReadFault::Protocol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_defaults() {
        let cli = Cli::parse_from(["sensorlink", "simulate"]);
        match cli.command {
            Commands::Simulate {
                duration_secs,
                fault,
                seed,
            } => {
                assert_eq!(duration_secs, 10);
                assert_eq!(fault, FaultArg::None);
                assert_eq!(seed, None);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_global_flags_and_fault() {
        let cli = Cli::parse_from([
            "sensorlink",
            "-v",
            "-c",
            "link.toml",
            "simulate",
            "--fault",
            "malformed",
            "--seed",
            "7",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("link.toml"));
        match cli.command {
            Commands::Simulate { fault, seed, .. } => {
                assert_eq!(fault.read_fault(), Some(ReadFault::Malformed));
                assert_eq!(seed, Some(7));
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_unknown_fault_is_rejected() {
        assert!(Cli::try_parse_from(["sensorlink", "simulate", "--fault", "jam"]).is_err());
    }
}
