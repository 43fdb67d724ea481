//! Face enrollment records for stadium access

use super::{PurchaseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationResult {
    Verified,
    Failed,
}

/// A user's enrolled face reference
///
/// Only a digest of the captured image is kept, never the image itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEnrollment {
    pub id: String,
    pub user_id: UserId,
    pub purchase_id: PurchaseId,
    /// "sha256:<hex>" of the captured image
    pub image_ref: String,
    pub is_verified: bool,
    pub last_verification_at: Option<DateTime<Utc>>,
    pub last_verification_result: Option<VerificationResult>,
    pub created_at: DateTime<Utc>,
}

/// Answer of a verification attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub confidence: Option<f32>,
    /// Set when no comparison could be made
    pub reason: Option<String>,
}

impl VerificationOutcome {
    pub fn matched(confidence: f32) -> Self {
        Self {
            verified: true,
            confidence: Some(confidence),
            reason: None,
        }
    }

    pub fn rejected(confidence: f32) -> Self {
        Self {
            verified: false,
            confidence: Some(confidence),
            reason: None,
        }
    }

    pub fn not_enrolled() -> Self {
        Self {
            verified: false,
            confidence: None,
            reason: Some("No face enrollment found for this user".to_string()),
        }
    }
}
