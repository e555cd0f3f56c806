//! Sequential processing strategy
//!
//! Replays requests one at a time in input order on a single-threaded tokio
//! runtime. The engine's operations are async because of the lock manager,
//! but with one request in flight no lock is ever contended.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Request handling to `RequestProcessor` (engine calls, `#N` references)
//! - CSV output to `csv_format::write_results_csv`

use crate::config::ServiceConfig;
use crate::core::{BankingEngine, RequestProcessor};
use crate::io::csv_format::write_results_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::BankError;
use log::warn;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Sequential processing strategy
///
/// # Examples
///
/// ```no_run
/// use bank_account_service::config::ServiceConfig;
/// use bank_account_service::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(ServiceConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("requests.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    service: ServiceConfig,
}

impl SyncProcessingStrategy {
    pub fn new(service: ServiceConfig) -> Self {
        Self { service }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), BankError> {
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| BankError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let processor = RequestProcessor::new(Arc::new(BankingEngine::new(&self.service)));

        let results = runtime.block_on(async {
            let mut results = Vec::new();
            for row in reader {
                match row {
                    Ok(request) => results.push(processor.process(request).await),
                    Err(e) => warn!("Skipping {}", e),
                }
            }
            results
        });

        write_results_csv(&results, output)
    }
}
