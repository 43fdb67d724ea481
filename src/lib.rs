//! Ticketing Engine Library
//!
//! # Overview
//!
//! Seat allocation and virtual-card settlement for World Cup match
//! ticketing. A purchaser picks seats for a match, pays with a closed-loop
//! virtual card (or an off-ledger method), and receives one immutable
//! purchase per seat with a ticket id. Administrators may browse but never
//! buy.
//!
//! # Architecture
//!
//! - [`types`] - domain types (matches, seats, cards, purchases, errors)
//! - [`core`] - stores and business rules:
//!   - [`core::inventory`] - seat maps and the available-seat counter
//!   - [`core::ledger`] / [`core::settlement`] - cards and the atomic debit
//!   - [`core::recorder`] - all-or-nothing purchase recording
//!   - [`core::service`] - the caller-facing facade
//! - [`io`] - catalog loading, order readers and CSV reports
//! - [`strategy`] - sync and async order-file pipelines
//! - [`cli`] - command-line arguments
//!
//! # Checkout guarantees
//!
//! - a card is never charged for a cart that fails validation, the ticket
//!   limit or the availability re-check
//! - concurrent debits can never drive a balance below zero
//! - a seat is sold to at most one purchase
//! - all seats of a checkout are recorded, or none are

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{TicketingConfig, TicketingService};
pub use io::{load_catalog, write_cards_csv, write_purchases_csv};
pub use types::{
    Caller, CallerRole, CardDetails, CheckoutReceipt, CheckoutRequest, OrderRecord, Purchase,
    TicketingError,
};
