//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `fixture`: matches and their seat counter
//! - `seat`: seats and ticket categories
//! - `card`: virtual cards, ledger transactions and settlement receipts
//! - `purchase`: issued tickets and checkout inputs
//! - `order`: order-file records
//! - `caller`: caller identity and roles
//! - `enrollment`: face enrollment records
//! - `error`: error types for the ticketing engine

pub mod caller;
pub mod card;
pub mod enrollment;
pub mod error;
pub mod fixture;
pub mod order;
pub mod purchase;
pub mod seat;

pub use caller::{Caller, CallerRole, RoleDirectory, UserId};
pub use card::{
    mask_card_number, CardDetails, CardId, CardStatement, CardStatus, MinorUnits,
    SettlementReceipt, TransactionId, TransactionStatus, VirtualCard, VirtualTransaction,
};
pub use enrollment::{FaceEnrollment, VerificationOutcome, VerificationResult};
pub use error::TicketingError;
pub use fixture::{Match, MatchId};
pub use order::OrderRecord;
pub use purchase::{
    BuyerProfile, CartItem, CheckoutReceipt, CheckoutRequest, PaymentMethod, PaymentStatus,
    Purchase, PurchaseId,
};
pub use seat::{CategoryId, Seat, SeatId, SeatStatus, TicketCategory};
