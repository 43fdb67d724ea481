//! Seat and ticket category types

use super::{MatchId, MinorUnits, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Seat identifier (opaque)
pub type SeatId = String;

/// Ticket category identifier (opaque)
pub type CategoryId = String;

/// Sale status of a seat
///
/// The only transition is `Available -> Sold`, applied at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Sold,
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatStatus::Available => write!(f, "available"),
            SeatStatus::Sold => write!(f, "sold"),
        }
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(SeatStatus::Available),
            "sold" => Ok(SeatStatus::Sold),
            other => Err(format!("Invalid seat status: '{}'", other)),
        }
    }
}

/// Pricing and display tier
///
/// Read-only reference data. Prices are integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub min_price: MinorUnits,
    pub max_price: MinorUnits,
    /// Display color, e.g. "#C1272D"
    pub color: String,
}

impl TicketCategory {
    /// Whether `price` lies in the category band `[min_price, max_price)`
    ///
    /// A degenerate band (`min_price == max_price`) admits exactly that price.
    pub fn admits_price(&self, price: MinorUnits) -> bool {
        if self.min_price == self.max_price {
            price == self.min_price
        } else {
            price >= self.min_price && price < self.max_price
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() || self.name.trim().is_empty() {
            return Err("category id and name must not be empty".to_string());
        }
        if self.min_price < 0 || self.max_price < self.min_price {
            return Err(format!(
                "category {} has an invalid price band [{}, {})",
                self.id, self.min_price, self.max_price
            ));
        }
        Ok(())
    }
}

/// One physical seat for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub match_id: MatchId,
    pub category_id: CategoryId,
    pub block: String,
    pub row_number: String,
    pub seat_number: String,
    /// Fixed at creation, within the category band
    pub price: MinorUnits,
    pub status: SeatStatus,
    /// Reservation holder. Carried for schema parity, never enforced.
    pub reserved_by: Option<UserId>,
    /// Reservation expiry. Carried for schema parity, never enforced.
    pub reserved_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Seat {
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Short label such as "A-2-5" (block, row, seat)
    pub fn label(&self) -> String {
        format!("{}-{}-{}", self.block, self.row_number, self.seat_number)
    }

    /// Stadium order: block, then row, then seat, with numeric labels
    /// compared as numbers ("2" before "10")
    pub fn stadium_order(&self, other: &Seat) -> Ordering {
        self.block
            .cmp(&other.block)
            .then_with(|| natural_cmp(&self.row_number, &other.row_number))
            .then_with(|| natural_cmp(&self.seat_number, &other.seat_number))
    }
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
pub(crate) fn sample_category(id: &str, min_price: MinorUnits, max_price: MinorUnits) -> TicketCategory {
    TicketCategory {
        id: id.to_string(),
        name: id.to_uppercase(),
        description: None,
        min_price,
        max_price,
        color: "#C1272D".to_string(),
    }
}

#[cfg(test)]
pub(crate) fn sample_seat(id: &str, match_id: &str, category_id: &str, price: MinorUnits) -> Seat {
    Seat {
        id: id.to_string(),
        match_id: match_id.to_string(),
        category_id: category_id.to_string(),
        block: "A".to_string(),
        row_number: "1".to_string(),
        seat_number: id.trim_start_matches(|c: char| !c.is_ascii_digit()).to_string(),
        price,
        status: SeatStatus::Available,
        reserved_by: None,
        reserved_until: None,
        created_at: Utc::now(),
    }
}
