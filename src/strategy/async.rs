//! Asynchronous batch processing strategy
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (user partitioning + tokio tasks)
//!             └── TicketingService (DashMap-backed stores)
//! ```
//!
//! Batches run one after another so a user's orders keep file order across
//! the whole file. Inside a batch, users are processed in parallel on a
//! multi-threaded runtime with `max_concurrent_batches` workers.

use crate::core::{BatchProcessor, TicketingService};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_cards_csv;
use crate::strategy::ProcessingStrategy;
use crate::types::{RoleDirectory, TicketingError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Orders per batch
    pub batch_size: usize,
    /// Worker threads of the runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Zero values fall back to the defaults with a warning
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches (0), using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        service: &Arc<TicketingService>,
        roles: &Arc<RoleDirectory>,
        orders_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), TicketingError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| TicketingError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(Arc::clone(service), Arc::clone(roles));

            let file = tokio::fs::File::open(orders_path)
                .await
                .map_err(|e| TicketingError::IoError {
                    message: format!("Failed to open file '{}': {}", orders_path.display(), e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let (mut accepted, mut rejected) = (0usize, 0usize);
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for result in processor.process_batch(batch).await {
                    if result.result.is_ok() {
                        accepted += 1;
                    } else {
                        rejected += 1;
                    }
                }
            }

            tracing::info!(accepted, rejected, "Orders processed");
            write_cards_csv(&service.ledger().statements(), output)
        })
    }
}
