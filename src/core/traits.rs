//! Capabilities injected into the ticketing service
//!
//! These traits are the seams where the engine depends on something it
//! does not own: a source of ticket ids and a face verification backend.
//! Production uses the randomized implementations; tests plug in
//! deterministic doubles.

use crate::types::{FaceEnrollment, VerificationOutcome};

/// Source of customer-facing ticket ids
pub trait TicketIdSource: Send + Sync {
    /// Produce the next ticket id
    fn next_ticket_id(&self) -> String;
}

/// Face comparison backend
///
/// The engine only decides *when* to ask and records the answer; how a
/// face is compared is entirely up to the implementation.
pub trait VerificationOracle: Send + Sync {
    /// Compare a captured image against an existing enrollment
    fn verify(&self, enrollment: &FaceEnrollment, image: &[u8]) -> VerificationOutcome;
}
