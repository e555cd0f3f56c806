//! Processing strategy module for request replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! from CSV parsing through the banking engine to result output. This allows
//! different processing implementations (sequential, concurrent batch) to be
//! selected at runtime.

use crate::cli::StrategyType;
use crate::config::ServiceConfig;
use crate::types::BankError;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads requests from a CSV file, runs them against a fresh
/// banking engine, and writes one result row per request to `output`.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the requests in `input_path` and write the results to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - The runtime cannot be started
    /// - Output cannot be written
    ///
    /// Malformed rows and failed requests are not errors here: malformed rows
    /// are logged and skipped, failed requests are reported in the output.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), BankError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `service` - Policy and lock settings for the engine
/// * `batch` - Optional batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    service: ServiceConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(service)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            service,
            batch.unwrap_or_default(),
        )),
    }
}
