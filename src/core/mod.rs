//! Core business logic module
//!
//! - `traits` - seams for ticket ids and face verification
//! - `config` - policy constants
//! - `catalog` / `inventory` / `bootstrap` - categories, matches and seat maps
//! - `ledger` / `settlement` - virtual cards and the atomic debit
//! - `recorder` / `ticket_id` / `allowance` - ticket issuance and limits
//! - `verification` - face enrollment and gate checks
//! - `service` - the facade callers use
//! - `batch_processor` - concurrent order processing by user

pub mod allowance;
pub mod batch_processor;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod inventory;
pub mod ledger;
pub mod recorder;
pub mod service;
pub mod settlement;
pub mod ticket_id;
pub mod traits;
pub mod verification;

pub use allowance::TicketAllowance;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use bootstrap::{generate_seat_map, SeatMapLayout};
pub use catalog::CategoryCatalog;
pub use config::TicketingConfig;
pub use inventory::SeatInventory;
pub use ledger::VirtualLedger;
pub use recorder::{PurchaseRecorder, PurchaseStore};
pub use service::{MatchSalesSummary, PendingRecording, TicketingService};
pub use ticket_id::TicketIdGenerator;
pub use traits::{TicketIdSource, VerificationOracle};
pub use verification::{FaceRegistry, FixedOracle, RandomizedOracle};
