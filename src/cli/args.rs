use crate::config::ServiceConfig;
use crate::strategy::BatchConfig;
use crate::types::BankError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay banking requests against an in-memory account service
#[derive(Parser, Debug)]
#[command(name = "bank-account-service")]
#[command(about = "Replay account and balance requests from a CSV file", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing requests
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for one request at a time or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of requests per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// TOML configuration file
    #[arg(
        long = "config",
        value_name = "FILE",
        help = "TOML file with [policy] and [lock] settings"
    )]
    pub config: Option<PathBuf>,

    /// Override for the account lock wait
    #[arg(
        long = "lock-wait-ms",
        value_name = "MILLIS",
        help = "Longest wait for a busy account in milliseconds, 0 to wait indefinitely"
    )]
    pub lock_wait_ms: Option<u64>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.worker_threads.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.worker_threads
                    .unwrap_or(default.worker_threads),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Build the service configuration
    ///
    /// Starts from the `--config` file when given, otherwise from the
    /// defaults, then applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration file cannot be read or parsed.
    pub fn to_service_config(&self) -> Result<ServiceConfig, BankError> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(wait_ms) = self.lock_wait_ms {
            config.lock.wait_ms = wait_ms;
        }
        Ok(config)
    }
}
