//! Processing strategies for order files
//!
//! A strategy is a complete pipeline: read an orders file, run every
//! order through a [`TicketingService`], then write the card balances.
//! The service is seeded beforehand and shared, so the caller can inspect
//! purchases afterwards.

use crate::cli::StrategyType;
use crate::core::TicketingService;
use crate::types::{RoleDirectory, TicketingError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

pub trait ProcessingStrategy: Send + Sync {
    /// Process every order in `orders_path` and write card balances to `output`
    ///
    /// Rejected orders and malformed rows are logged and skipped; only
    /// failures to read the file or write the report are returned.
    fn process(
        &self,
        service: &Arc<TicketingService>,
        roles: &Arc<RoleDirectory>,
        orders_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), TicketingError>;
}

/// Build the strategy selected on the command line
///
/// `config` only applies to the async strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config.unwrap_or_default())),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::TicketingConfig;
    use crate::types::fixture::sample_match;
    use crate::types::seat::{sample_category, sample_seat};
    use crate::types::{CallerRole, CardDetails};
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    pub const ORDERS_HEADER: &str =
        "user,match,category,quantity,payment_method,card_number,expiry,cvv,holder_name,holder_email\n";

    pub fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    /// Ten 100.00 seats in "cat1" of m1; u1 and u2 hold 1000.00, "root" is an admin
    pub fn seeded_service() -> (Arc<TicketingService>, Arc<RoleDirectory>) {
        let service = TicketingService::new(TicketingConfig::default());
        service
            .catalog()
            .insert(sample_category("cat1", 5_000, 20_000))
            .unwrap();
        service.inventory().add_match(sample_match("m1", 10)).unwrap();
        let seats = (1..=10)
            .map(|n| sample_seat(&format!("s{}", n), "m1", "cat1", 10_000))
            .collect();
        service.inventory().insert_seats("m1", seats).unwrap();

        let card = CardDetails::new("4242 4242 4242 4242", "12/30", "123");
        for user in ["u1", "u2", "root"] {
            service.provision_card(user, &card, 100_000).unwrap();
        }

        let mut roles = RoleDirectory::new();
        roles.assign("root", CallerRole::Admin);
        (Arc::new(service), Arc::new(roles))
    }

    pub fn card_order(user: &str, quantity: u32) -> String {
        format!(
            "{},m1,cat1,{},card,4242 4242 4242 4242,12/30,123,Holder {},{}@example.com\n",
            user, quantity, user, user
        )
    }

    pub fn run(
        strategy: &dyn ProcessingStrategy,
        orders: &str,
    ) -> (Arc<TicketingService>, Result<String, TicketingError>) {
        let (service, roles) = seeded_service();
        let file = create_temp_csv(&format!("{}{}", ORDERS_HEADER, orders));
        let mut output = Vec::new();

        let result = strategy
            .process(&service, &roles, file.path(), &mut output)
            .map(|()| String::from_utf8(output).unwrap());
        (service, result)
    }
}
