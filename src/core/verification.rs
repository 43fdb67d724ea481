//! Face enrollment and verification
//!
//! A user enrolls a face image against one of their purchases; at the
//! gate a fresh capture is compared by the injected
//! [`VerificationOracle`]. The registry records every answer on the
//! enrollment. Only a digest of enrolled images is kept.

use super::traits::VerificationOracle;
use crate::types::{
    FaceEnrollment, PurchaseId, TicketingError, UserId, VerificationOutcome, VerificationResult,
};
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Confidence reported by [`RandomizedOracle`] on a match
pub const MATCH_CONFIDENCE: f32 = 0.95;

/// Confidence reported by [`RandomizedOracle`] on a mismatch
pub const MISMATCH_CONFIDENCE: f32 = 0.3;

/// Enrollments keyed by user; the latest enrollment wins
#[derive(Debug, Default)]
pub struct FaceRegistry {
    enrollments: DashMap<UserId, FaceEnrollment>,
}

impl FaceRegistry {
    pub fn new() -> Self {
        Self {
            enrollments: DashMap::new(),
        }
    }

    /// Enroll a face image for a user
    ///
    /// Purchase ownership is the caller's concern; the registry only checks
    /// that an image was captured.
    pub fn enroll(
        &self,
        user_id: &str,
        purchase_id: &PurchaseId,
        image: &[u8],
    ) -> Result<FaceEnrollment, TicketingError> {
        if image.is_empty() {
            return Err(TicketingError::validation("face image is empty"));
        }

        let enrollment = FaceEnrollment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            purchase_id: purchase_id.clone(),
            image_ref: image_digest(image),
            is_verified: false,
            last_verification_at: None,
            last_verification_result: None,
            created_at: Utc::now(),
        };

        self.enrollments
            .insert(user_id.to_string(), enrollment.clone());
        Ok(enrollment)
    }

    pub fn get(&self, user_id: &str) -> Option<FaceEnrollment> {
        self.enrollments
            .get(user_id)
            .map(|entry| entry.value().clone())
    }

    /// Compare a capture against the user's enrollment and record the answer
    ///
    /// Users without an enrollment get a negative outcome with a reason;
    /// the oracle is not consulted.
    pub fn verify(
        &self,
        user_id: &str,
        image: &[u8],
        oracle: &dyn VerificationOracle,
    ) -> VerificationOutcome {
        let Some(mut enrollment) = self.enrollments.get_mut(user_id) else {
            return VerificationOutcome::not_enrolled();
        };

        let outcome = oracle.verify(&enrollment, image);

        enrollment.last_verification_at = Some(Utc::now());
        enrollment.last_verification_result = Some(if outcome.verified {
            VerificationResult::Verified
        } else {
            VerificationResult::Failed
        });
        if outcome.verified {
            enrollment.is_verified = true;
        }

        outcome
    }
}

/// "sha256:<hex>" reference of an image
pub fn image_digest(image: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(image))
}

/// Placeholder oracle that accepts a fixed share of attempts at random
#[derive(Debug, Clone, Copy)]
pub struct RandomizedOracle {
    success_rate: f64,
}

impl RandomizedOracle {
    /// Clamps `success_rate` to `[0, 1]`
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for RandomizedOracle {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl VerificationOracle for RandomizedOracle {
    fn verify(&self, _enrollment: &FaceEnrollment, image: &[u8]) -> VerificationOutcome {
        if image.is_empty() {
            return VerificationOutcome::rejected(0.0);
        }
        if rand::thread_rng().gen_bool(self.success_rate) {
            VerificationOutcome::matched(MATCH_CONFIDENCE)
        } else {
            VerificationOutcome::rejected(MISMATCH_CONFIDENCE)
        }
    }
}

/// Deterministic oracle that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedOracle {
    accept: bool,
}

impl FixedOracle {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl VerificationOracle for FixedOracle {
    fn verify(&self, _enrollment: &FaceEnrollment, _image: &[u8]) -> VerificationOutcome {
        if self.accept {
            VerificationOutcome::matched(1.0)
        } else {
            VerificationOutcome::rejected(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enroll_keeps_only_digest() {
        let registry = FaceRegistry::new();

        let enrollment = registry
            .enroll("u1", &"p1".to_string(), b"jpeg bytes")
            .unwrap();

        assert!(enrollment.image_ref.starts_with("sha256:"));
        assert_eq!(enrollment.image_ref.len(), "sha256:".len() + 64);
        assert!(!enrollment.is_verified);
        assert_eq!(registry.get("u1").unwrap().purchase_id, "p1");
    }

    #[test]
    fn test_enroll_rejects_empty_image() {
        let registry = FaceRegistry::new();
        assert!(registry.enroll("u1", &"p1".to_string(), &[]).is_err());
        assert!(registry.get("u1").is_none());
    }

    #[test]
    fn test_unenrolled_user_is_not_verified() {
        let registry = FaceRegistry::new();

        let outcome = registry.verify("u1", b"capture", &FixedOracle::accepting());

        assert!(!outcome.verified);
        assert_eq!(
            outcome.reason.as_deref(),
            Some("No face enrollment found for this user")
        );
    }

    #[test]
    fn test_successful_verification_is_recorded() {
        let registry = FaceRegistry::new();
        registry.enroll("u1", &"p1".to_string(), b"face").unwrap();

        let outcome = registry.verify("u1", b"capture", &FixedOracle::accepting());

        assert!(outcome.verified);
        let enrollment = registry.get("u1").unwrap();
        assert!(enrollment.is_verified);
        assert!(enrollment.last_verification_at.is_some());
        assert_eq!(
            enrollment.last_verification_result,
            Some(VerificationResult::Verified)
        );
    }

    #[test]
    fn test_failed_verification_keeps_earlier_success() {
        let registry = FaceRegistry::new();
        registry.enroll("u1", &"p1".to_string(), b"face").unwrap();
        registry.verify("u1", b"capture", &FixedOracle::accepting());

        let outcome = registry.verify("u1", b"capture", &FixedOracle::rejecting());

        assert!(!outcome.verified);
        let enrollment = registry.get("u1").unwrap();
        assert!(enrollment.is_verified);
        assert_eq!(
            enrollment.last_verification_result,
            Some(VerificationResult::Failed)
        );
    }

    #[test]
    fn test_randomized_oracle_extremes() {
        let registry = FaceRegistry::new();
        let enrollment = registry.enroll("u1", &"p1".to_string(), b"face").unwrap();

        let always = RandomizedOracle::new(1.0).verify(&enrollment, b"capture");
        assert_eq!(always, VerificationOutcome::matched(MATCH_CONFIDENCE));

        let never = RandomizedOracle::new(0.0).verify(&enrollment, b"capture");
        assert_eq!(never, VerificationOutcome::rejected(MISMATCH_CONFIDENCE));
    }
}
