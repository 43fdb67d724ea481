//! Order records read from order files
//!
//! An order is one checkout request expressed by category and quantity
//! rather than by seat: the engine picks the seats.

use super::{BuyerProfile, CardDetails, CategoryId, MatchId, PaymentMethod, UserId};

/// One checkout request from an order file
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub user_id: UserId,
    pub match_id: MatchId,
    pub category_id: CategoryId,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
    /// Present for card payments
    pub card: Option<CardDetails>,
    pub buyer: BuyerProfile,
}
