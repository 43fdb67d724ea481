//! Error types for the ticketing engine
//!
//! This module defines every failure a ticketing operation can report.
//! All failures are returned to the immediate caller as values; none of
//! them is fatal to the process.
//!
//! # Error Categories
//!
//! - **Settlement Errors**: card authentication, inactive cards, insufficient balance
//! - **Inventory Errors**: seats claimed by another purchase, unknown matches
//! - **Recording Errors**: purchase rows that could not be written after a charge
//! - **Policy Errors**: ticket limit, caller role, malformed input
//! - **File I/O Errors**: catalog/order files that cannot be read

use crate::types::{MinorUnits, SeatId};
use thiserror::Error;

/// Main error type for the ticketing engine
///
/// Each variant carries the context a caller needs to render a precise
/// message (for example both amounts of an insufficient balance).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TicketingError {
    /// Presented card details do not match the stored card
    ///
    /// Also returned when the user has no card at all, so that the
    /// response does not reveal whether a card exists.
    #[error("Card authentication failed")]
    AuthenticationFailed,

    /// Card is suspended or expired
    #[error("Card is not active (status: {status})")]
    CardInactive {
        /// Current card status
        status: String,
    },

    /// Card balance is lower than the charge
    ///
    /// The balance is left untouched and no transaction is recorded.
    #[error("Insufficient balance: available {available_balance}, required {required_amount}")]
    InsufficientBalance {
        /// Balance at the time of the attempt, in minor units
        available_balance: MinorUnits,
        /// Amount that was requested, in minor units
        required_amount: MinorUnits,
    },

    /// One or more seats were claimed by another purchase
    ///
    /// The caller should re-fetch the seat map and allow re-selection.
    #[error("Seats no longer available: {}", seat_ids.join(", "))]
    SeatUnavailable {
        /// Seats that are not available any more
        seat_ids: Vec<SeatId>,
    },

    /// Purchase rows could not be written
    ///
    /// When a reference is present a settlement already succeeded for it:
    /// money has moved, and only recording may be retried.
    #[error("Purchase recording failed{}: {reason}", reference.as_ref().map(|r| format!(" after payment {}", r)).unwrap_or_default())]
    PurchaseRecordingFailed {
        /// Settlement reference of the charge that was already applied
        reference: Option<String>,
        /// Description of the underlying failure
        reason: String,
    },

    /// Malformed input rejected before any side effect
    #[error("Validation error: {message}")]
    ValidationError {
        /// Description of what is wrong with the input
        message: String,
    },

    /// Checkout would exceed the per-user ticket limit
    #[error("Ticket limit exceeded: requested {requested}, remaining allowance {remaining}")]
    TicketLimitExceeded {
        /// Number of seats in the checkout
        requested: u32,
        /// Number of tickets the user may still buy
        remaining: u32,
    },

    /// Caller's role is not allowed to perform the operation
    #[error("Operation '{operation}' is not permitted for this caller")]
    Forbidden {
        /// Operation that was refused
        operation: String,
    },

    /// Match does not exist
    #[error("Match {match_id} not found")]
    MatchNotFound {
        /// Requested match identifier
        match_id: String,
    },

    /// Purchase does not exist or belongs to another user
    #[error("Purchase {purchase_id} not found")]
    PurchaseNotFound {
        /// Requested purchase identifier
        purchase_id: String,
    },

    /// Settlement reference was already used by a completed charge
    #[error("Payment reference {reference} was already used")]
    DuplicateReference {
        /// The reused reference
        reference: String,
    },

    /// Arithmetic overflow in a monetary computation
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for TicketingError {
    fn from(error: std::io::Error) -> Self {
        TicketingError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for TicketingError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        TicketingError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl TicketingError {
    /// Create a CardInactive error
    pub fn card_inactive(status: impl ToString) -> Self {
        TicketingError::CardInactive {
            status: status.to_string(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(available_balance: MinorUnits, required_amount: MinorUnits) -> Self {
        TicketingError::InsufficientBalance {
            available_balance,
            required_amount,
        }
    }

    /// Create a SeatUnavailable error
    pub fn seat_unavailable(seat_ids: Vec<SeatId>) -> Self {
        TicketingError::SeatUnavailable { seat_ids }
    }

    /// Create a PurchaseRecordingFailed error
    pub fn purchase_recording_failed(reference: Option<&str>, reason: impl ToString) -> Self {
        TicketingError::PurchaseRecordingFailed {
            reference: reference.map(str::to_string),
            reason: reason.to_string(),
        }
    }

    /// Create a ValidationError
    pub fn validation(message: impl ToString) -> Self {
        TicketingError::ValidationError {
            message: message.to_string(),
        }
    }

    /// Create a TicketLimitExceeded error
    pub fn ticket_limit_exceeded(requested: u32, remaining: u32) -> Self {
        TicketingError::TicketLimitExceeded {
            requested,
            remaining,
        }
    }

    /// Create a Forbidden error
    pub fn forbidden(operation: &str) -> Self {
        TicketingError::Forbidden {
            operation: operation.to_string(),
        }
    }

    /// Create a MatchNotFound error
    pub fn match_not_found(match_id: &str) -> Self {
        TicketingError::MatchNotFound {
            match_id: match_id.to_string(),
        }
    }

    /// Create a PurchaseNotFound error
    pub fn purchase_not_found(purchase_id: &str) -> Self {
        TicketingError::PurchaseNotFound {
            purchase_id: purchase_id.to_string(),
        }
    }

    /// Create a DuplicateReference error
    pub fn duplicate_reference(reference: &str) -> Self {
        TicketingError::DuplicateReference {
            reference: reference.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        TicketingError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Whether the failed step may be retried without charging again
    ///
    /// Only recording after a successful settlement qualifies. Settlement
    /// itself is never retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TicketingError::PurchaseRecordingFailed {
                reference: Some(_),
                ..
            }
        )
    }
}
