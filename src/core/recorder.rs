//! Purchase storage and recording
//!
//! [`PurchaseStore`] keeps issued tickets. [`PurchaseRecorder`] turns a paid
//! cart into tickets in two steps:
//!
//! 1. insert one purchase row per cart item (all rows or none)
//! 2. mark the seats sold and lower the match counter (all seats or none)
//!
//! Step 2 only runs after step 1 fully succeeded, and a failure in step 2
//! removes the rows from step 1. Either way no seat ends up sold without a
//! purchase row, and no purchase row survives for a seat that was not sold.
//! Recording never touches the ledger.

use super::inventory::SeatInventory;
use super::traits::TicketIdSource;
use crate::types::{
    BuyerProfile, CartItem, MatchId, PaymentMethod, PaymentStatus, Purchase, PurchaseId, SeatId,
    TicketingError,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use uuid::Uuid;

/// Redraws allowed when a ticket id repeats inside one batch
const MAX_TICKET_ID_REDRAWS: usize = 16;

/// Thread-safe store of issued tickets
///
/// Each seat of a match can be referenced by at most one purchase; the
/// claim is taken through the entry API so two batches racing for a seat
/// cannot both be inserted.
#[derive(Debug, Default)]
pub struct PurchaseStore {
    purchases: DashMap<PurchaseId, Purchase>,
    seat_claims: DashMap<(MatchId, SeatId), PurchaseId>,
}

impl PurchaseStore {
    pub fn new() -> Self {
        Self {
            purchases: DashMap::new(),
            seat_claims: DashMap::new(),
        }
    }

    /// Insert a batch of purchases, all or nothing
    ///
    /// # Errors
    ///
    /// `PurchaseRecordingFailed` (without reference) if a seat already has
    /// a purchase or a purchase id is reused. Claims taken by this call
    /// are released before returning.
    pub fn insert_batch(&self, batch: Vec<Purchase>) -> Result<(), TicketingError> {
        let mut claimed: Vec<(MatchId, SeatId)> = Vec::with_capacity(batch.len());

        for purchase in &batch {
            if self.purchases.contains_key(&purchase.id) {
                self.release(&claimed);
                return Err(TicketingError::purchase_recording_failed(
                    None,
                    format!("purchase id {} already exists", purchase.id),
                ));
            }

            let key = (purchase.match_id.clone(), purchase.seat_id.clone());
            let claimed_now = match self.seat_claims.entry(key.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(purchase.id.clone());
                    true
                }
            };

            if !claimed_now {
                self.release(&claimed);
                return Err(TicketingError::purchase_recording_failed(
                    None,
                    format!(
                        "seat {} of match {} already has a purchase",
                        purchase.seat_id, purchase.match_id
                    ),
                ));
            }
            claimed.push(key);
        }

        for purchase in batch {
            self.purchases.insert(purchase.id.clone(), purchase);
        }

        Ok(())
    }

    /// Remove purchases and release their seats
    pub fn remove_batch(&self, purchase_ids: &[PurchaseId]) {
        for purchase_id in purchase_ids {
            if let Some((_, purchase)) = self.purchases.remove(purchase_id) {
                self.seat_claims
                    .remove(&(purchase.match_id, purchase.seat_id));
            }
        }
    }

    pub fn get(&self, purchase_id: &str) -> Option<Purchase> {
        self.purchases
            .get(purchase_id)
            .map(|entry| entry.value().clone())
    }

    pub fn count_for_user(&self, user_id: &str) -> usize {
        self.purchases
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .count()
    }

    /// A user's tickets, oldest first
    pub fn for_user(&self, user_id: &str) -> Vec<Purchase> {
        self.collect_sorted(|purchase| purchase.user_id == user_id)
    }

    pub fn for_match(&self, match_id: &str) -> Vec<Purchase> {
        self.collect_sorted(|purchase| purchase.match_id == match_id)
    }

    /// Every ticket, oldest first
    pub fn all(&self) -> Vec<Purchase> {
        self.collect_sorted(|_| true)
    }

    pub fn len(&self) -> usize {
        self.purchases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }

    fn release(&self, claims: &[(MatchId, SeatId)]) {
        for key in claims {
            self.seat_claims.remove(key);
        }
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<Purchase>
    where
        F: Fn(&Purchase) -> bool,
    {
        let mut purchases: Vec<Purchase> = self
            .purchases
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        purchases.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
                .then_with(|| a.ticket_id.cmp(&b.ticket_id))
        });
        purchases
    }
}

/// Issues tickets for a paid cart
pub struct PurchaseRecorder<'a> {
    store: &'a PurchaseStore,
    inventory: &'a SeatInventory,
    ticket_ids: &'a dyn TicketIdSource,
}

impl<'a> PurchaseRecorder<'a> {
    pub fn new(
        store: &'a PurchaseStore,
        inventory: &'a SeatInventory,
        ticket_ids: &'a dyn TicketIdSource,
    ) -> Self {
        Self {
            store,
            inventory,
            ticket_ids,
        }
    }

    /// Record one purchase per cart item and sell the seats
    ///
    /// Input is validated for shape only; seat availability is checked by
    /// the inventory when the seats are marked sold.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an empty cart, an item of another match, a
    ///   seat whose category differs from the item's, a repeated seat or an
    ///   incomplete buyer profile
    /// - `PurchaseRecordingFailed` if the rows could not be inserted
    /// - `SeatUnavailable` if a seat was sold in the meantime (rows removed)
    pub fn record(
        &self,
        user_id: &str,
        match_id: &str,
        buyer: &BuyerProfile,
        payment_method: PaymentMethod,
        items: &[CartItem],
    ) -> Result<Vec<Purchase>, TicketingError> {
        validate_cart(user_id, match_id, buyer, items)?;

        let ticket_ids = self.draw_ticket_ids(items.len())?;
        let created_at = Utc::now();

        let purchases: Vec<Purchase> = items
            .iter()
            .zip(ticket_ids)
            .map(|(item, ticket_id)| Purchase {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                match_id: match_id.to_string(),
                seat_id: item.seat.id.clone(),
                ticket_id,
                category_name: item.category.name.clone(),
                block: item.seat.block.clone(),
                row_number: item.seat.row_number.clone(),
                seat_number: item.seat.seat_number.clone(),
                price: item.seat.price,
                holder_name: buyer.full_name.clone(),
                holder_email: buyer.email.clone(),
                payment_method,
                payment_status: PaymentStatus::Completed,
                created_at,
            })
            .collect();

        let purchase_ids: Vec<PurchaseId> = purchases.iter().map(|p| p.id.clone()).collect();
        let seat_ids: Vec<SeatId> = items.iter().map(|item| item.seat.id.clone()).collect();

        self.store.insert_batch(purchases.clone())?;

        if let Err(error) = self.inventory.mark_sold_and_decrement(match_id, &seat_ids) {
            self.store.remove_batch(&purchase_ids);
            return Err(error);
        }

        Ok(purchases)
    }

    fn draw_ticket_ids(&self, count: usize) -> Result<Vec<String>, TicketingError> {
        let mut seen = HashSet::with_capacity(count);
        let mut ids = Vec::with_capacity(count);
        let mut redraws = 0;

        while ids.len() < count {
            let id = self.ticket_ids.next_ticket_id();
            if seen.insert(id.clone()) {
                ids.push(id);
            } else {
                redraws += 1;
                if redraws > MAX_TICKET_ID_REDRAWS {
                    return Err(TicketingError::purchase_recording_failed(
                        None,
                        "ticket id source keeps repeating itself",
                    ));
                }
            }
        }

        Ok(ids)
    }
}

fn validate_cart(
    user_id: &str,
    match_id: &str,
    buyer: &BuyerProfile,
    items: &[CartItem],
) -> Result<(), TicketingError> {
    if user_id.trim().is_empty() {
        return Err(TicketingError::validation("user id must not be empty"));
    }
    if items.is_empty() {
        return Err(TicketingError::validation("cart is empty"));
    }
    buyer.validate().map_err(TicketingError::validation)?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.seat.match_id != match_id {
            return Err(TicketingError::validation(format!(
                "seat {} belongs to match {}, not {}",
                item.seat.id, item.seat.match_id, match_id
            )));
        }
        if item.seat.category_id != item.category.id {
            return Err(TicketingError::validation(format!(
                "seat {} is in category {}, not {}",
                item.seat.id, item.seat.category_id, item.category.id
            )));
        }
        if !seen.insert(item.seat.id.as_str()) {
            return Err(TicketingError::validation(format!(
                "seat {} appears twice in the cart",
                item.seat.id
            )));
        }
    }

    Ok(())
}
