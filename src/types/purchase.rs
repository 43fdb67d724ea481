//! Purchase records and checkout inputs
//!
//! A [`Purchase`] is an issued ticket. Everything printed on the ticket
//! (category name, seat labels, price, holder) is a snapshot taken at
//! issuance, so later catalog changes never alter an issued ticket.

use super::{
    CardDetails, MatchId, MinorUnits, Seat, SeatId, SettlementReceipt, TicketCategory, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Purchase identifier (opaque)
pub type PurchaseId = String;

/// How the buyer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Virtual card, settled against the ledger
    Card,
    /// Mobile wallet (not settled by the engine)
    Wallet,
    /// Bank transfer (not settled by the engine)
    Bank,
    /// Payment at an agent counter (not settled by the engine)
    Agent,
}

impl PaymentMethod {
    /// Whether checkout must run the settlement procedure for this method
    pub fn settles_on_ledger(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Agent => "agent",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "wallet" => Ok(PaymentMethod::Wallet),
            "bank" => Ok(PaymentMethod::Bank),
            "agent" => Ok(PaymentMethod::Agent),
            other => Err(format!("Invalid payment method: '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "completed")
    }
}

/// Buyer details copied onto every ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub full_name: String,
    pub email: String,
}

impl BuyerProfile {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("holder name must not be empty".to_string());
        }
        if !self.email.contains('@') {
            return Err(format!("holder email '{}' is not valid", self.email));
        }
        Ok(())
    }
}

/// A seat paired with its category, as selected for checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub seat: Seat,
    pub category: TicketCategory,
}

/// One issued ticket; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub match_id: MatchId,
    pub seat_id: SeatId,
    pub ticket_id: String,
    pub category_name: String,
    pub block: String,
    pub row_number: String,
    pub seat_number: String,
    pub price: MinorUnits,
    pub holder_name: String,
    pub holder_email: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Everything checkout needs besides the caller
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub match_id: MatchId,
    pub seat_ids: Vec<SeatId>,
    pub buyer: BuyerProfile,
    pub payment_method: PaymentMethod,
    /// Required when `payment_method` settles on the ledger
    pub card: Option<CardDetails>,
}

/// Outcome of a successful checkout
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// Correlation key of the checkout (also the ledger reference for card payments)
    pub reference: String,
    /// Present for card payments
    pub settlement: Option<SettlementReceipt>,
    pub purchases: Vec<Purchase>,
}
