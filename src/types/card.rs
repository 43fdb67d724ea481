//! Virtual card ledger types
//!
//! A virtual card is a closed-loop balance account, one per user. Every
//! debit is recorded as an append-only [`VirtualTransaction`]. All amounts
//! are integer minor currency units (cents); no floating point is involved.

use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monetary amount in minor currency units
pub type MinorUnits = i64;

/// Card identifier (opaque)
pub type CardId = String;

/// Ledger transaction identifier (opaque)
pub type TransactionId = String;

/// Lifecycle status of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Suspended,
    Expired,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardStatus::Active => write!(f, "active"),
            CardStatus::Suspended => write!(f, "suspended"),
            CardStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CardStatus::Active),
            "suspended" => Ok(CardStatus::Suspended),
            "expired" => Ok(CardStatus::Expired),
            other => Err(format!("Invalid card status: '{}'", other)),
        }
    }
}

/// A user's ledger account
///
/// The card number and CVV are never stored in clear; only their SHA-256
/// digests are kept for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCard {
    pub id: CardId,
    pub user_id: UserId,
    /// e.g. "**** **** **** 4242"
    pub masked_card_number: String,
    pub card_number_hash: String,
    pub cvv_hash: String,
    /// "MM/YY"
    pub expiry_date: String,
    /// Never negative
    pub balance: MinorUnits,
    pub currency: String,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a ledger entry
///
/// Only completed settlements are ever appended to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

/// Append-only ledger entry for one debit
///
/// Invariant: `balance_after == balance_before - amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTransaction {
    pub id: TransactionId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub amount: MinorUnits,
    pub balance_before: MinorUnits,
    pub balance_after: MinorUnits,
    /// Caller-supplied correlation key, unique per charge
    pub reference: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Card credentials as presented at checkout
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl CardDetails {
    pub fn new(card_number: impl Into<String>, expiry: impl Into<String>, cvv: impl Into<String>) -> Self {
        Self {
            card_number: card_number.into(),
            expiry: expiry.into(),
            cvv: cvv.into(),
        }
    }

    /// Card number with all whitespace removed ("4242 4242" -> "42424242")
    pub fn cleaned_number(&self) -> String {
        self.card_number.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

// Credentials must not leak through logs.
impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &mask_card_number(&self.cleaned_number()))
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .finish()
    }
}

/// Mask all but the last four digits, grouped by four
pub fn mask_card_number(cleaned: &str) -> String {
    let last_four: String = cleaned
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("**** **** **** {}", last_four)
}

/// Result of a successful settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub transaction_id: TransactionId,
    pub amount_charged: MinorUnits,
    pub balance_before: MinorUnits,
    pub balance_after: MinorUnits,
    pub currency: String,
}

/// Card with its ledger size, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStatement {
    pub card: VirtualCard,
    pub transaction_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4242 4242 4242 4242", "4242424242424242")]
    #[case("4242424242424242", "4242424242424242")]
    #[case(" 4000\t0000 0000 0002 ", "4000000000000002")]
    fn test_cleaned_number(#[case] raw: &str, #[case] expected: &str) {
        let details = CardDetails::new(raw, "12/30", "123");
        assert_eq!(details.cleaned_number(), expected);
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("4242424242421234"), "**** **** **** 1234");
    }

    #[test]
    fn test_debug_does_not_expose_credentials() {
        let details = CardDetails::new("4242 4242 4242 9876", "12/30", "987");
        let rendered = format!("{:?}", details);
        assert!(!rendered.contains("4242424242429876"));
        assert!(!rendered.contains("987\""));
        assert!(rendered.contains("9876"));
    }

    #[rstest]
    #[case("active", CardStatus::Active)]
    #[case("Suspended", CardStatus::Suspended)]
    #[case("EXPIRED", CardStatus::Expired)]
    fn test_card_status_parsing(#[case] input: &str, #[case] expected: CardStatus) {
        assert_eq!(input.parse::<CardStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), input.to_lowercase());
    }
}
