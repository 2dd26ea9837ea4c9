//! Sensorlink CLI library
//!
//! Command-line parsing, layered configuration and the command handlers that
//! run the central and peripheral roles, on the host radio or against each
//! other over the simulated air.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, FaultArg};
pub use commands::CommandDispatcher;
pub use config::AppConfig;
pub use error::{CliError, Result};
