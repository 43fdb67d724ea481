//! Virtual card ledger
//!
//! Holds one [`VirtualCard`] per user together with its append-only
//! transaction log. The settlement procedure itself lives in
//! [`settlement`](super::settlement); this module covers provisioning and
//! read access.
//!
//! # Thread Safety
//!
//! Cards are stored in a `DashMap` keyed by user, so the card and its log
//! are guarded by a single entry lock. Settlements against one card are
//! serialized by that lock while different cards proceed in parallel.
//! Whenever both maps are needed the card entry is locked first, then the
//! reference entry.

use crate::types::{
    mask_card_number, CardDetails, CardStatement, CardStatus, MinorUnits, TicketingError,
    TransactionId, UserId, VirtualCard, VirtualTransaction,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A card with its transaction log
#[derive(Debug, Clone)]
pub(crate) struct CardAccount {
    pub(crate) card: VirtualCard,
    pub(crate) transactions: Vec<VirtualTransaction>,
}

/// Thread-safe store of virtual cards
#[derive(Debug, Default)]
pub struct VirtualLedger {
    pub(crate) accounts: DashMap<UserId, CardAccount>,
    /// Settlement references already charged, with their transaction id
    pub(crate) references: DashMap<String, TransactionId>,
}

impl VirtualLedger {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            references: DashMap::new(),
        }
    }

    /// Issue a card to a user
    ///
    /// The number is cleaned of whitespace, then only its digest and mask
    /// are stored. A user holds at most one card.
    ///
    /// # Errors
    ///
    /// `ValidationError` if the number is not 12 to 19 digits, the CVV is
    /// not 3 or 4 digits, the expiry is not `MM/YY`, the balance is
    /// negative, or the user already has a card.
    pub fn provision_card(
        &self,
        user_id: &str,
        details: &CardDetails,
        balance: MinorUnits,
        currency: &str,
        status: CardStatus,
    ) -> Result<VirtualCard, TicketingError> {
        let number = details.cleaned_number();
        validate_card_number(&number)?;
        validate_cvv(&details.cvv)?;
        validate_expiry(&details.expiry)?;

        if balance < 0 {
            return Err(TicketingError::validation(format!(
                "opening balance {} must not be negative",
                balance
            )));
        }

        match self.accounts.entry(user_id.to_string()) {
            Entry::Occupied(_) => Err(TicketingError::validation(format!(
                "user {} already has a virtual card",
                user_id
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let card = VirtualCard {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    masked_card_number: mask_card_number(&number),
                    card_number_hash: card_number_digest(&number),
                    cvv_hash: cvv_digest(&number, details.cvv.trim()),
                    expiry_date: details.expiry.trim().to_string(),
                    balance,
                    currency: currency.to_string(),
                    status,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(CardAccount {
                    card: card.clone(),
                    transactions: Vec::new(),
                });
                Ok(card)
            }
        }
    }

    pub fn get_card(&self, user_id: &str) -> Option<VirtualCard> {
        self.accounts.get(user_id).map(|entry| entry.card.clone())
    }

    /// Suspend, expire or reactivate a card
    pub fn set_card_status(&self, user_id: &str, status: CardStatus) -> Result<(), TicketingError> {
        let mut entry = self
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| TicketingError::validation(format!("user {} has no card", user_id)))?;

        entry.card.status = status;
        entry.card.updated_at = Utc::now();
        Ok(())
    }

    /// Transaction log of a user's card, oldest first
    pub fn transactions(&self, user_id: &str) -> Vec<VirtualTransaction> {
        self.accounts
            .get(user_id)
            .map(|entry| entry.transactions.clone())
            .unwrap_or_default()
    }

    /// Transaction recorded for a settlement reference
    pub fn transaction_for_reference(&self, reference: &str) -> Option<TransactionId> {
        self.references.get(reference).map(|entry| entry.value().clone())
    }

    /// Every card with its log size, sorted by user
    pub fn statements(&self) -> Vec<CardStatement> {
        let mut statements: Vec<CardStatement> = self
            .accounts
            .iter()
            .map(|entry| CardStatement {
                card: entry.card.clone(),
                transaction_count: entry.transactions.len(),
            })
            .collect();
        statements.sort_by(|a, b| a.card.user_id.cmp(&b.card.user_id));
        statements
    }
}

/// Hex SHA-256 of a cleaned card number
pub(crate) fn card_number_digest(cleaned_number: &str) -> String {
    format!("{:x}", Sha256::digest(cleaned_number.as_bytes()))
}

/// Hex SHA-256 of the CVV salted with its card number
pub(crate) fn cvv_digest(cleaned_number: &str, cvv: &str) -> String {
    format!(
        "{:x}",
        Sha256::digest(format!("{}:{}", cleaned_number, cvv).as_bytes())
    )
}

fn validate_card_number(number: &str) -> Result<(), TicketingError> {
    if (12..=19).contains(&number.len()) && number.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(TicketingError::validation(
            "card number must be 12 to 19 digits",
        ))
    }
}

fn validate_cvv(cvv: &str) -> Result<(), TicketingError> {
    let cvv = cvv.trim();
    if (3..=4).contains(&cvv.len()) && cvv.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(TicketingError::validation("CVV must be 3 or 4 digits"))
    }
}

fn validate_expiry(expiry: &str) -> Result<(), TicketingError> {
    let invalid = || TicketingError::validation(format!("expiry '{}' is not MM/YY", expiry));

    let (month, year) = expiry.trim().split_once('/').ok_or_else(invalid)?;
    if month.len() != 2 || year.len() != 2 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    match month.parse::<u8>() {
        Ok(1..=12) => Ok(()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
pub(crate) fn funded_ledger(user_id: &str, balance: MinorUnits) -> VirtualLedger {
    let ledger = VirtualLedger::new();
    ledger
        .provision_card(user_id, &test_card(), balance, "MAD", CardStatus::Active)
        .unwrap();
    ledger
}

#[cfg(test)]
pub(crate) fn test_card() -> CardDetails {
    CardDetails::new("4242 4242 4242 4242", "12/30", "123")
}
