use crate::core::config::{DEFAULT_MAX_TICKETS_PER_USER, DEFAULT_TICKET_PREFIX};
use crate::core::TicketingConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Sell World Cup tickets from an orders file against a catalog
#[derive(Parser, Debug)]
#[command(name = "ticketing-engine")]
#[command(about = "Sell match tickets and settle virtual-card payments", long_about = None)]
pub struct CliArgs {
    /// Orders CSV file
    #[arg(value_name = "ORDERS", help = "Path to the orders CSV file")]
    pub orders_file: PathBuf,

    /// Directory with matches.csv, categories.csv, cards.csv and optional seats.csv, roles.csv
    #[arg(long = "catalog", value_name = "DIR")]
    pub catalog_dir: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for batched parallel"
    )]
    pub strategy: StrategyType,

    /// Number of orders per batch (async mode only)
    #[arg(long = "batch-size", value_name = "SIZE")]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for batch processing (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Maximum tickets a user may hold across all matches
    #[arg(
        long = "max-tickets",
        value_name = "COUNT",
        env = "TICKETING_MAX_TICKETS",
        default_value_t = DEFAULT_MAX_TICKETS_PER_USER
    )]
    pub max_tickets: u32,

    /// First segment of ticket ids and payment references
    #[arg(
        long = "ticket-prefix",
        value_name = "PREFIX",
        env = "TICKETING_TICKET_PREFIX",
        default_value = DEFAULT_TICKET_PREFIX
    )]
    pub ticket_prefix: String,

    /// Seed for generated seat maps; omit for a random layout each run
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Also write every issued ticket to this CSV file
    #[arg(long = "purchases-out", value_name = "FILE")]
    pub purchases_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Batch settings from the flags, defaults for anything omitted
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_ticketing_config(&self) -> TicketingConfig {
        TicketingConfig::new(self.max_tickets, &self.ticket_prefix, self.seed)
    }
}
