//! Synchronous processing strategy
//!
//! Streams orders one at a time from a [`SyncReader`] and runs each
//! through the service on the calling thread, in file order. Output is
//! identical to the async strategy for inputs without seat contention.

use crate::core::TicketingService;
use crate::io::csv_format::write_cards_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::{RoleDirectory, TicketingError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        service: &Arc<TicketingService>,
        roles: &Arc<RoleDirectory>,
        orders_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), TicketingError> {
        let reader = SyncReader::new(orders_path).map_err(|message| TicketingError::IoError { message })?;

        let (mut accepted, mut rejected) = (0usize, 0usize);
        for result in reader {
            let order = match result {
                Ok(order) => order,
                Err(error) => {
                    tracing::warn!(%error, "Skipping order row");
                    rejected += 1;
                    continue;
                }
            };

            let caller = roles.caller_for(&order.user_id);
            match service.process_order(&caller, &order) {
                Ok(receipt) => {
                    tracing::debug!(reference = %receipt.reference, "Order processed");
                    accepted += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        user = %order.user_id,
                        match_id = %order.match_id,
                        %error,
                        "Order rejected"
                    );
                    rejected += 1;
                }
            }
        }

        tracing::info!(accepted, rejected, "Orders processed");
        write_cards_csv(&service.ledger().statements(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{card_order, run};

    #[test]
    fn test_sync_strategy_charges_orders() {
        let (service, output) = run(
            &SyncProcessingStrategy,
            &format!("{}{}", card_order("u1", 3), card_order("u2", 1)),
        );

        let output = output.unwrap();
        assert!(output.starts_with("user,card,balance,currency,transactions\n"));
        assert!(output.contains("u1,**** **** **** 4242,700.00,MAD,1\n"));
        assert!(output.contains("u2,**** **** **** 4242,900.00,MAD,1\n"));
        assert_eq!(service.purchases().len(), 4);
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let (service, roles) = crate::strategy::test_support::seeded_service();
        let mut output = Vec::new();

        let result = SyncProcessingStrategy.process(
            &service,
            &roles,
            Path::new("nonexistent.csv"),
            &mut output,
        );

        match result {
            Err(TicketingError::IoError { message }) => assert!(message.contains("Failed to open file")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_sync_strategy_continues_after_rejections() {
        let (service, output) = run(
            &SyncProcessingStrategy,
            &format!(
                "{}u1,m1,cat1,1,cheque,,,,A,a@example.com\n{}{}",
                card_order("root", 1),
                card_order("u1", 5),
                card_order("u1", 2)
            ),
        );

        let output = output.unwrap();
        assert!(output.contains("root,**** **** **** 4242,1000.00,MAD,0\n"));
        assert!(output.contains("u1,**** **** **** 4242,800.00,MAD,1\n"));
        assert_eq!(service.purchases().len(), 2);
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
