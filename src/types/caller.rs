//! Caller identity and role
//!
//! Every entry point receives an explicit [`Caller`] instead of reading
//! ambient session state.

use super::TicketingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// User identifier (opaque)
pub type UserId = String;

/// Capability of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallerRole {
    /// Back-office user; refused every purchase operation
    #[serde(rename = "admin")]
    Admin,
    /// Regular ticket buyer
    #[serde(rename = "user")]
    Purchaser,
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerRole::Admin => write!(f, "admin"),
            CallerRole::Purchaser => write!(f, "user"),
        }
    }
}

impl FromStr for CallerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(CallerRole::Admin),
            "user" | "purchaser" | "" => Ok(CallerRole::Purchaser),
            other => Err(format!("Invalid role: '{}'", other)),
        }
    }
}

/// Identity of the party invoking an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    pub user_id: UserId,
    pub role: CallerRole,
}

impl Caller {
    pub fn purchaser(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: CallerRole::Purchaser,
        }
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: CallerRole::Admin,
        }
    }

    /// Refuse administrators at the purchase boundary
    pub fn ensure_purchaser(&self, operation: &str) -> Result<(), TicketingError> {
        match self.role {
            CallerRole::Purchaser => Ok(()),
            CallerRole::Admin => Err(TicketingError::forbidden(operation)),
        }
    }

    pub fn ensure_admin(&self, operation: &str) -> Result<(), TicketingError> {
        match self.role {
            CallerRole::Admin => Ok(()),
            CallerRole::Purchaser => Err(TicketingError::forbidden(operation)),
        }
    }
}

/// Role lookup for known users
///
/// Users without an entry are purchasers.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    roles: HashMap<UserId, CallerRole>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, user_id: impl Into<UserId>, role: CallerRole) {
        self.roles.insert(user_id.into(), role);
    }

    pub fn role_of(&self, user_id: &str) -> CallerRole {
        self.roles
            .get(user_id)
            .copied()
            .unwrap_or(CallerRole::Purchaser)
    }

    pub fn caller_for(&self, user_id: &str) -> Caller {
        Caller {
            user_id: user_id.to_string(),
            role: self.role_of(user_id),
        }
    }
}
