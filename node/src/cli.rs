//! # CLI Interface
//!
//! Defines the command-line argument structure for `qupi-node` using
//! `clap` derive. Supports three subcommands: `run`, `simulate`, and
//! `version`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;

use qupi_protocol::config::{
    ServiceConfig, DEFAULT_API_PORT, DEFAULT_MAX_SESSIONS, DEFAULT_METRICS_PORT,
    DEFAULT_QKD_KEY_LENGTH, DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL,
};

/// QUPI simulation node.
///
/// Serves the BB84-keyed payment handshake over HTTP and exposes
/// Prometheus metrics. The quantum channel is simulated.
#[derive(Parser, Debug)]
#[command(
    name = "qupi-node",
    about = "QUPI quantum-keyed payment simulation node",
    version,
    propagate_version = true
)]
pub struct QupiNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the QUPI node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Run(RunArgs),
    /// Run one handshake in-process and print the result as JSON.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Where BB84 randomness comes from.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropySource {
    /// Operating-system CSPRNG.
    Os,
    /// Deterministic stream from `--seed`. For demos and tests only.
    Seeded,
}

/// Options shared by `run` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Raw BB84 positions exchanged per key generation.
    #[arg(long, env = "QUPI_KEY_LENGTH", default_value_t = DEFAULT_QKD_KEY_LENGTH)]
    pub key_length: usize,

    /// Maximum live sessions before the oldest are evicted.
    #[arg(long, env = "QUPI_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Session lifetime in seconds.
    #[arg(long, env = "QUPI_SESSION_TTL_SECS", default_value_t = DEFAULT_SESSION_TTL.as_secs())]
    pub session_ttl_secs: u64,

    /// Randomness source for the BB84 exchange.
    #[arg(long, env = "QUPI_ENTROPY", value_enum, default_value_t = EntropySource::Os)]
    pub entropy: EntropySource,

    /// Seed for `--entropy seeded`.
    #[arg(long, env = "QUPI_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "QUPI_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl ServiceArgs {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            qkd_key_length: self.key_length,
            max_sessions: self.max_sessions,
            session_ttl: Duration::from_secs(self.session_ttl_secs),
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Interface to bind both listeners on.
    #[arg(long, env = "QUPI_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP API.
    #[arg(long, env = "QUPI_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "QUPI_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seconds between expired-session sweeps.
    #[arg(long, env = "QUPI_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
    pub sweep_interval_secs: u64,

    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Payer identifier.
    #[arg(long, default_value = "alice@qupi")]
    pub sender: String,

    /// Payee identifier.
    #[arg(long, default_value = "bob@qupi")]
    pub receiver: String,

    /// Amount in rupees.
    #[arg(long, default_value_t = 150.0)]
    pub amount: f64,

    #[command(flatten)]
    pub service: ServiceArgs,
}
