//! Batch processing with user-based partitioning
//!
//! A batch of orders is split by user. Each user's orders run sequentially
//! in file order inside one tokio task, and different users run
//! concurrently. The service serializes what must not race (seat
//! selection per match, allowance per user).
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<TicketingService>  (shared stores)
//!     └── Arc<RoleDirectory>     (caller role per user)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::TicketingService;
use crate::types::{CheckoutReceipt, OrderRecord, RoleDirectory, TicketingError, UserId};

/// Outcome of one order
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub record: OrderRecord,
    pub result: Result<CheckoutReceipt, TicketingError>,
}

#[derive(Clone)]
pub struct BatchProcessor {
    service: Arc<TicketingService>,
    roles: Arc<RoleDirectory>,
}

impl BatchProcessor {
    pub fn new(service: Arc<TicketingService>, roles: Arc<RoleDirectory>) -> Self {
        Self { service, roles }
    }

    /// Split a batch by user, keeping each user's orders in input order
    pub fn partition_by_user(&self, batch: Vec<OrderRecord>) -> HashMap<UserId, Vec<OrderRecord>> {
        let mut user_batches: HashMap<UserId, Vec<OrderRecord>> = HashMap::new();

        for record in batch {
            user_batches
                .entry(record.user_id.clone())
                .or_default()
                .push(record);
        }

        user_batches
    }

    /// Process one user's orders in order; failures do not stop the rest
    pub fn process_user_orders(&self, orders: Vec<OrderRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(orders.len());

        for record in orders {
            let caller = self.roles.caller_for(&record.user_id);
            let result = self.service.process_order(&caller, &record);
            if let Err(error) = &result {
                tracing::warn!(
                    user = %record.user_id,
                    match_id = %record.match_id,
                    category = %record.category_id,
                    quantity = record.quantity,
                    %error,
                    "Order rejected"
                );
            }
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Process a batch with one task per user
    ///
    /// Results of different users may come back in any order.
    pub async fn process_batch(&self, batch: Vec<OrderRecord>) -> Vec<ProcessingResult> {
        let user_batches = self.partition_by_user(batch);

        let mut tasks = Vec::with_capacity(user_batches.len());
        for (_user_id, orders) in user_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_user_orders(orders)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(user_results) => results.extend(user_results),
                Err(error) => tracing::error!(%error, "Order task panicked"),
            }
        }

        results
    }
}
