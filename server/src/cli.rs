//! # CLI Interface
//!
//! Defines the command-line argument structure for `meridian-server`
//! using `clap` derive. Supports four subcommands: `run`, `init`,
//! `status`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use meridian_ledger::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// Meridian ledger service.
///
/// A small ledger API: register accounts, log in, inspect balances,
/// and transfer funds between accounts.
#[derive(Parser, Debug)]
#[command(
    name = "meridian-server",
    about = "Meridian ledger service",
    version,
    propagate_version = true
)]
pub struct MeridianCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the server binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger service.
    Run(RunArgs),
    /// Initialize a new data directory and generate a token secret.
    Init(InitArgs),
    /// Query the health of a running server.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the data directory where the store and the token secret
    /// live. Created by `init`.
    #[arg(long, short = 'd', env = "MERIDIAN_DATA_DIR", default_value = "~/.meridian")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "MERIDIAN_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "MERIDIAN_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Token signing secret. Overrides the secret file in the data
    /// directory. **Never pass this flag on a shared shell** — prefer
    /// the environment variable or the secret file.
    #[arg(long, env = "MERIDIAN_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "MERIDIAN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "MERIDIAN_DATA_DIR", default_value = "~/.meridian")]
    pub data_dir: PathBuf,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Address of the running server's API listener.
    #[arg(long, default_value = "127.0.0.1:8600")]
    pub addr: String,
}
