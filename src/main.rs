//! Ticketing Engine CLI
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --catalog catalog/ orders.csv > cards.csv
//! cargo run -- --strategy sync --catalog catalog/ orders.csv > cards.csv
//! cargo run -- --seed 7 --purchases-out tickets.csv --catalog catalog/ orders.csv
//! RUST_LOG=info cargo run -- --max-tickets 2 --catalog catalog/ orders.csv
//! ```
//!
//! Seeds the engine from the catalog directory, processes every order and
//! prints the final card balances to stdout. Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unreadable catalog or orders file, output failure, etc.)

use std::fs::File;
use std::io::BufWriter;
use std::process;
use std::sync::Arc;
use ticketing_engine::core::TicketingService;
use ticketing_engine::{cli, io, strategy, TicketingError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    if let Err(error) = run(&args) {
        tracing::error!(%error, "Run failed");
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), TicketingError> {
    let service = Arc::new(TicketingService::new(args.to_ticketing_config()));
    let roles = Arc::new(io::load_catalog(&args.catalog_dir, &service)?);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    strategy.process(&service, &roles, &args.orders_file, &mut output)?;

    if let Some(path) = &args.purchases_out {
        let mut writer = BufWriter::new(File::create(path)?);
        io::write_purchases_csv(&service.purchases().all(), &mut writer)?;
    }

    let pending = service.pending_recordings();
    if !pending.is_empty() {
        tracing::error!(count = pending.len(), "Charged orders left without tickets");
    }

    Ok(())
}
