//! Ticketing service
//!
//! Facade over the stores that exposes the operations a UI or CLI driver
//! calls. Every operation takes an explicit [`Caller`]; administrators are
//! refused purchase operations at this boundary.
//!
//! # Checkout
//!
//! ```text
//! validate cart -> allowance -> availability re-check -> settle (card only) -> record
//! ```
//!
//! Checkouts of one match are serialized from the availability re-check
//! through recording, so of two buyers racing for a seat only the winner
//! is charged. Checkouts of one user are serialized as well so two
//! sessions cannot both pass the allowance check. The match lock is always
//! taken before the user lock. If
//! recording still fails after the charge, the order is parked under its
//! payment reference and surfaced as a retryable `PurchaseRecordingFailed`;
//! [`TicketingService::retry_recording`] records it without charging again.

use super::allowance::TicketAllowance;
use super::bootstrap::{generate_seat_map, SeatMapLayout};
use super::catalog::CategoryCatalog;
use super::config::TicketingConfig;
use super::inventory::SeatInventory;
use super::ledger::VirtualLedger;
use super::recorder::{PurchaseRecorder, PurchaseStore};
use super::ticket_id::{payment_reference, TicketIdGenerator};
use super::traits::{TicketIdSource, VerificationOracle};
use super::verification::{FaceRegistry, RandomizedOracle};
use crate::types::{
    BuyerProfile, Caller, CardDetails, CardStatus, CartItem, CheckoutReceipt, CheckoutRequest,
    FaceEnrollment, MatchId, MinorUnits, OrderRecord, PaymentMethod, Purchase, Seat, SeatId,
    SeatStatus, SettlementReceipt, TicketingError, UserId, VerificationOutcome, VirtualCard,
};
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, PoisonError};

/// A settled order whose tickets could not be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecording {
    pub reference: String,
    pub user_id: UserId,
    pub match_id: MatchId,
    pub seat_ids: Vec<SeatId>,
    pub buyer: BuyerProfile,
    pub payment_method: PaymentMethod,
    pub failure: String,
}

/// Sales figures of one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSalesSummary {
    pub match_id: MatchId,
    pub title: String,
    pub total_seats: u32,
    /// Cached counter as currently stored
    pub available_seats: u32,
    /// Seats in `sold` status, including seats sold at bootstrap
    pub seats_sold: usize,
    pub purchase_count: usize,
    /// Sum of purchase prices in minor units
    pub revenue: MinorUnits,
}

/// Seat selling and payment settlement over in-memory stores
pub struct TicketingService {
    config: TicketingConfig,
    catalog: CategoryCatalog,
    inventory: SeatInventory,
    ledger: VirtualLedger,
    purchases: PurchaseStore,
    faces: FaceRegistry,
    allowance: TicketAllowance,
    layout: SeatMapLayout,
    ticket_ids: Box<dyn TicketIdSource>,
    oracle: Box<dyn VerificationOracle>,
    checkout_locks: DashMap<UserId, Arc<Mutex<()>>>,
    match_locks: DashMap<MatchId, Arc<Mutex<()>>>,
    pending: DashMap<String, PendingRecording>,
}

impl TicketingService {
    pub fn new(config: TicketingConfig) -> Self {
        Self {
            allowance: TicketAllowance::new(config.max_tickets_per_user),
            ticket_ids: Box::new(TicketIdGenerator::new(config.ticket_prefix.clone())),
            oracle: Box::new(RandomizedOracle::default()),
            config,
            catalog: CategoryCatalog::new(),
            inventory: SeatInventory::new(),
            ledger: VirtualLedger::new(),
            purchases: PurchaseStore::new(),
            faces: FaceRegistry::new(),
            layout: SeatMapLayout::default(),
            checkout_locks: DashMap::new(),
            match_locks: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    pub fn with_ticket_ids(mut self, ticket_ids: Box<dyn TicketIdSource>) -> Self {
        self.ticket_ids = ticket_ids;
        self
    }

    pub fn with_oracle(mut self, oracle: Box<dyn VerificationOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_layout(mut self, layout: SeatMapLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn config(&self) -> &TicketingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn inventory(&self) -> &SeatInventory {
        &self.inventory
    }

    pub fn ledger(&self) -> &VirtualLedger {
        &self.ledger
    }

    pub fn purchases(&self) -> &PurchaseStore {
        &self.purchases
    }

    /// Seat map of a match, bootstrapped on first visit
    ///
    /// Open to every role. Safe to retry.
    pub fn get_or_bootstrap_seats(
        &self,
        caller: &Caller,
        match_id: &str,
    ) -> Result<Vec<Seat>, TicketingError> {
        tracing::debug!(user = %caller.user_id, match_id, "Listing seats");

        self.inventory.bootstrap_with(match_id, |fixture| {
            let categories = self.catalog.list();
            let mut rng = self.bootstrap_rng(&fixture.id);
            let seats = generate_seat_map(fixture, &categories, &self.layout, &mut rng)?;
            tracing::info!(match_id = %fixture.id, seats = seats.len(), "Bootstrapped seat map");
            Ok(seats)
        })
    }

    /// Charge the caller's card
    pub fn settle_payment(
        &self,
        caller: &Caller,
        card: &CardDetails,
        amount: MinorUnits,
        reference: &str,
        description: Option<&str>,
    ) -> Result<SettlementReceipt, TicketingError> {
        caller.ensure_purchaser("settle_payment")?;
        self.ledger
            .settle(&caller.user_id, card, amount, reference, description)
    }

    /// Issue tickets for a cart that has already been paid for
    pub fn record_purchases(
        &self,
        caller: &Caller,
        match_id: &str,
        buyer: &BuyerProfile,
        payment_method: PaymentMethod,
        items: &[CartItem],
    ) -> Result<Vec<Purchase>, TicketingError> {
        caller.ensure_purchaser("record_purchases")?;
        self.recorder()
            .record(&caller.user_id, match_id, buyer, payment_method, items)
    }

    /// Number of tickets the caller may still buy
    pub fn remaining_ticket_allowance(&self, caller: &Caller) -> Result<u32, TicketingError> {
        caller.ensure_purchaser("remaining_ticket_allowance")?;
        Ok(self
            .allowance
            .remaining(self.purchases.count_for_user(&caller.user_id)))
    }

    /// The caller's tickets, oldest first
    pub fn my_purchases(&self, caller: &Caller) -> Vec<Purchase> {
        self.purchases.for_user(&caller.user_id)
    }

    /// Pick the first `quantity` available seats of a category, in stadium order
    ///
    /// # Errors
    ///
    /// - `Forbidden` for administrators
    /// - `TicketLimitExceeded` if `quantity` exceeds the remaining allowance
    /// - `ValidationError` for a zero quantity, an unknown category or too
    ///   few available seats
    pub fn select_seats(
        &self,
        caller: &Caller,
        match_id: &str,
        category_id: &str,
        quantity: u32,
    ) -> Result<Vec<SeatId>, TicketingError> {
        caller.ensure_purchaser("select_seats")?;
        if quantity == 0 {
            return Err(TicketingError::validation("quantity must be at least 1"));
        }
        if self.catalog.get(category_id).is_none() {
            return Err(TicketingError::validation(format!(
                "unknown ticket category {}",
                category_id
            )));
        }
        self.allowance
            .check(self.purchases.count_for_user(&caller.user_id), quantity)?;

        let selected: Vec<SeatId> = self
            .get_or_bootstrap_seats(caller, match_id)?
            .into_iter()
            .filter(|seat| seat.category_id == category_id && seat.is_available())
            .take(quantity as usize)
            .map(|seat| seat.id)
            .collect();

        if selected.len() < quantity as usize {
            return Err(TicketingError::validation(format!(
                "only {} seats left in category {} for match {}",
                selected.len(),
                category_id,
                match_id
            )));
        }

        Ok(selected)
    }

    /// Validate, charge and record one cart
    ///
    /// Nothing is charged unless the cart passed every check. Card payments
    /// settle the cart total under the returned reference; other methods
    /// are recorded without ledger movement.
    ///
    /// # Errors
    ///
    /// Any settlement failure (card untouched), `TicketLimitExceeded`,
    /// `SeatUnavailable` (before the charge), `ValidationError`, or a
    /// retryable `PurchaseRecordingFailed` after the charge.
    pub fn checkout(
        &self,
        caller: &Caller,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt, TicketingError> {
        caller.ensure_purchaser("checkout")?;

        let match_lock = lock_for(&self.match_locks, &request.match_id);
        let _selling = match_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.checkout_locked(caller, request)
    }

    /// Checkout body; the caller holds the match lock of `request`
    fn checkout_locked(
        &self,
        caller: &Caller,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt, TicketingError> {
        if request.seat_ids.is_empty() {
            return Err(TicketingError::validation("cart is empty"));
        }
        request
            .buyer
            .validate()
            .map_err(TicketingError::validation)?;

        let user_lock = self.user_lock(&caller.user_id);
        let _serialized = user_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let requested = u32::try_from(request.seat_ids.len()).unwrap_or(u32::MAX);
        self.allowance
            .check(self.purchases.count_for_user(&caller.user_id), requested)?;

        let fixture = self
            .inventory
            .get_match(&request.match_id)
            .ok_or_else(|| TicketingError::match_not_found(&request.match_id))?;
        let items = self.cart_items(&request.match_id, &request.seat_ids)?;
        self.inventory
            .ensure_available(&request.match_id, &request.seat_ids)?;

        let total = items
            .iter()
            .try_fold(0 as MinorUnits, |sum, item| sum.checked_add(item.seat.price))
            .ok_or_else(|| TicketingError::arithmetic_overflow("cart total"))?;

        let reference = payment_reference(&self.config.ticket_prefix);

        let settlement = if request.payment_method.settles_on_ledger() {
            let card = request.card.as_ref().ok_or_else(|| {
                TicketingError::validation("card details are required for card payments")
            })?;
            let description = format!("{} ticket(s) for {}", items.len(), fixture.title());

            match self
                .ledger
                .settle(&caller.user_id, card, total, &reference, Some(&description))
            {
                Ok(receipt) => Some(receipt),
                Err(error) => {
                    tracing::warn!(
                        user = %caller.user_id,
                        match_id = %request.match_id,
                        amount = total,
                        %error,
                        "Settlement refused"
                    );
                    return Err(error);
                }
            }
        } else {
            None
        };

        let recorded = self.recorder().record(
            &caller.user_id,
            &request.match_id,
            &request.buyer,
            request.payment_method,
            &items,
        );

        match recorded {
            Ok(purchases) => {
                tracing::info!(
                    user = %caller.user_id,
                    match_id = %request.match_id,
                    tickets = purchases.len(),
                    amount = total,
                    method = %request.payment_method,
                    %reference,
                    "Checkout completed"
                );
                Ok(CheckoutReceipt {
                    reference,
                    settlement,
                    purchases,
                })
            }
            Err(error) if settlement.is_some() => {
                tracing::error!(
                    user = %caller.user_id,
                    match_id = %request.match_id,
                    %reference,
                    %error,
                    "Card charged but tickets not recorded"
                );
                self.pending.insert(
                    reference.clone(),
                    PendingRecording {
                        reference: reference.clone(),
                        user_id: caller.user_id.clone(),
                        match_id: request.match_id.clone(),
                        seat_ids: request.seat_ids.clone(),
                        buyer: request.buyer.clone(),
                        payment_method: request.payment_method,
                        failure: error.to_string(),
                    },
                );
                Err(TicketingError::purchase_recording_failed(
                    Some(&reference),
                    error,
                ))
            }
            Err(error) => Err(error),
        }
    }

    /// Record a settled order again, without charging
    ///
    /// # Errors
    ///
    /// `PurchaseNotFound` if the caller has no pending order under
    /// `reference`, otherwise `PurchaseRecordingFailed` carrying the
    /// reference while recording keeps failing.
    pub fn retry_recording(
        &self,
        caller: &Caller,
        reference: &str,
    ) -> Result<Vec<Purchase>, TicketingError> {
        caller.ensure_purchaser("retry_recording")?;

        let match_id = self
            .pending_for(caller, reference)
            .map(|pending| pending.match_id)
            .ok_or_else(|| TicketingError::purchase_not_found(reference))?;
        let match_lock = lock_for(&self.match_locks, &match_id);
        let _selling = match_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let user_lock = self.user_lock(&caller.user_id);
        let _serialized = user_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let pending = self
            .pending_for(caller, reference)
            .ok_or_else(|| TicketingError::purchase_not_found(reference))?;

        let recorded = self
            .cart_items(&pending.match_id, &pending.seat_ids)
            .and_then(|items| {
                self.recorder().record(
                    &pending.user_id,
                    &pending.match_id,
                    &pending.buyer,
                    pending.payment_method,
                    &items,
                )
            });

        match recorded {
            Ok(purchases) => {
                self.pending.remove(reference);
                tracing::info!(user = %caller.user_id, %reference, "Pending purchases recorded");
                Ok(purchases)
            }
            Err(error) => {
                tracing::error!(user = %caller.user_id, %reference, %error, "Recording retry failed");
                if let Some(mut entry) = self.pending.get_mut(reference) {
                    entry.failure = error.to_string();
                }
                Err(TicketingError::purchase_recording_failed(
                    Some(reference),
                    error,
                ))
            }
        }
    }

    /// Settled orders still waiting for their tickets
    pub fn pending_recordings(&self) -> Vec<PendingRecording> {
        let mut pending: Vec<PendingRecording> = self
            .pending
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by(|a, b| a.reference.cmp(&b.reference));
        pending
    }

    /// Select seats for an order record and check it out
    ///
    /// Selection and checkout run under one hold of the match lock, so two
    /// orders never select the same seat.
    pub fn process_order(
        &self,
        caller: &Caller,
        order: &OrderRecord,
    ) -> Result<CheckoutReceipt, TicketingError> {
        let match_lock = lock_for(&self.match_locks, &order.match_id);
        let _selling = match_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let seat_ids = self.select_seats(caller, &order.match_id, &order.category_id, order.quantity)?;

        self.checkout_locked(
            caller,
            &CheckoutRequest {
                match_id: order.match_id.clone(),
                seat_ids,
                buyer: order.buyer.clone(),
                payment_method: order.payment_method,
                card: order.card.clone(),
            },
        )
    }

    /// Enroll the caller's face for one of their purchases
    pub fn enroll_face(
        &self,
        caller: &Caller,
        purchase_id: &str,
        image: &[u8],
    ) -> Result<FaceEnrollment, TicketingError> {
        caller.ensure_purchaser("enroll_face")?;

        let purchase = self
            .purchases
            .get(purchase_id)
            .filter(|purchase| purchase.user_id == caller.user_id)
            .ok_or_else(|| TicketingError::purchase_not_found(purchase_id))?;

        let enrollment = self.faces.enroll(&caller.user_id, &purchase.id, image)?;
        tracing::info!(user = %caller.user_id, purchase = %purchase.id, "Face enrolled");
        Ok(enrollment)
    }

    /// Compare a capture against the caller's enrollment
    pub fn verify_face(
        &self,
        caller: &Caller,
        image: &[u8],
    ) -> Result<VerificationOutcome, TicketingError> {
        caller.ensure_purchaser("verify_face")?;

        let outcome = self
            .faces
            .verify(&caller.user_id, image, self.oracle.as_ref());
        tracing::info!(user = %caller.user_id, verified = outcome.verified, "Face verification");
        Ok(outcome)
    }

    pub fn face_enrollment(&self, caller: &Caller) -> Option<FaceEnrollment> {
        self.faces.get(&caller.user_id)
    }

    /// Per-match sales figures, by kick-off time
    pub fn admin_report(&self, caller: &Caller) -> Result<Vec<MatchSalesSummary>, TicketingError> {
        caller.ensure_admin("admin_report")?;

        self.inventory
            .list_matches()
            .into_iter()
            .map(|fixture| -> Result<MatchSalesSummary, TicketingError> {
                let seats_sold = self
                    .inventory
                    .list_seats(&fixture.id)?
                    .iter()
                    .filter(|seat| seat.status == SeatStatus::Sold)
                    .count();
                let purchases = self.purchases.for_match(&fixture.id);
                let revenue = purchases
                    .iter()
                    .try_fold(0 as MinorUnits, |sum, purchase| sum.checked_add(purchase.price))
                    .ok_or_else(|| TicketingError::arithmetic_overflow("revenue"))?;

                Ok(MatchSalesSummary {
                    title: fixture.title(),
                    match_id: fixture.id,
                    total_seats: fixture.total_seats,
                    available_seats: fixture.available_seats,
                    seats_sold,
                    purchase_count: purchases.len(),
                    revenue,
                })
            })
            .collect()
    }

    /// Recompute a match's counter from its seats
    ///
    /// Open to every role.
    pub fn reconcile_available(&self, caller: &Caller, match_id: &str) -> Result<u32, TicketingError> {
        let before = self
            .inventory
            .get_match(match_id)
            .map(|fixture| fixture.available_seats);
        let after = self.inventory.reconcile_available(match_id)?;

        if before != Some(after) {
            tracing::info!(user = %caller.user_id, match_id, ?before, after, "Reconciled available seat counter");
        }
        Ok(after)
    }

    /// Issue an active card in the default currency
    ///
    /// Seeding entry point for drivers and tests; it sits outside the role
    /// checks and takes no [`Caller`].
    pub fn provision_card(
        &self,
        user_id: &str,
        card: &CardDetails,
        balance: MinorUnits,
    ) -> Result<VirtualCard, TicketingError> {
        self.ledger.provision_card(
            user_id,
            card,
            balance,
            &self.config.default_currency,
            CardStatus::Active,
        )
    }

    fn recorder(&self) -> PurchaseRecorder<'_> {
        PurchaseRecorder::new(&self.purchases, &self.inventory, self.ticket_ids.as_ref())
    }

    fn pending_for(&self, caller: &Caller, reference: &str) -> Option<PendingRecording> {
        self.pending
            .get(reference)
            .map(|entry| entry.value().clone())
            .filter(|pending| pending.user_id == caller.user_id)
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        lock_for(&self.checkout_locks, user_id)
    }

    /// Seats of the cart paired with their catalog categories
    fn cart_items(&self, match_id: &str, seat_ids: &[SeatId]) -> Result<Vec<CartItem>, TicketingError> {
        self.inventory
            .find_seats(match_id, seat_ids)?
            .into_iter()
            .map(|seat| -> Result<CartItem, TicketingError> {
                let category = self.catalog.get(&seat.category_id).ok_or_else(|| {
                    TicketingError::validation(format!(
                        "seat {} references unknown category {}",
                        seat.id, seat.category_id
                    ))
                })?;
                Ok(CartItem { seat, category })
            })
            .collect()
    }

    /// Per-match RNG: seeded runs reproduce every seat map
    fn bootstrap_rng(&self, match_id: &str) -> StdRng {
        match self.config.bootstrap_seed {
            Some(seed) => {
                let salt = Sha256::digest(match_id.as_bytes())
                    .iter()
                    .take(8)
                    .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
                StdRng::seed_from_u64(seed ^ salt)
            }
            None => StdRng::from_entropy(),
        }
    }
}

/// Shared mutex of a key; the map guard is released before locking
fn lock_for(locks: &DashMap<String, Arc<Mutex<()>>>, key: &str) -> Arc<Mutex<()>> {
    Arc::clone(locks.entry(key.to_string()).or_default().value())
}
