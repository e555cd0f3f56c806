//! Concurrent batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Requests are read in batches and each batch is
//! handed to the [`RequestProcessor`], which runs independent accounts in
//! parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, worker_threads)
//!     ├── AsyncReader (batch CSV reading)
//!     └── RequestProcessor (barriers + account partitioning)
//!         └── BankingEngine
//!             └── LockManager (per-account mutual exclusion)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after the other
//! - Within a batch, requests on the same account run in input order
//! - Requests that are not tied to one account run alone
//!
//! The output therefore matches the sequential strategy for the same input.

use crate::config::ServiceConfig;
use crate::core::{BankingEngine, RequestProcessor};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_results_csv;
use crate::strategy::ProcessingStrategy;
use crate::types::BankError;
use log::{debug, warn};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub worker_threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, worker_threads: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            warn!(
                "Invalid worker_threads ({}), using default ({})",
                worker_threads, default.worker_threads
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            batch_size,
            worker_threads,
        }
    }
}

/// Concurrent batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    service: ServiceConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(service: ServiceConfig, config: BatchConfig) -> Self {
        Self { service, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), BankError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .enable_time()
            .build()
            .map_err(|e| BankError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let results = runtime.block_on(async {
            let processor = RequestProcessor::new(Arc::new(BankingEngine::new(&self.service)));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| BankError::Io {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut results = Vec::new();
            while !reader.is_finished() {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    continue;
                }
                debug!("Processing batch of {} requests", batch.len());
                // Finish this batch before reading the next to keep per-account order
                results.extend(processor.process_batch(batch).await);
            }

            Ok::<_, BankError>(results)
        })?;

        write_results_csv(&results, output)
    }
}
