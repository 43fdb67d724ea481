//! Match fixtures
//!
//! A match is created by an external seeding process. The only field the
//! engine ever mutates is the `available_seats` counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Match identifier (opaque)
pub type MatchId = String;

/// One fixture of the tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub home_team: String,
    pub away_team: String,
    pub match_date: DateTime<Utc>,
    pub stadium: String,
    pub city: String,
    /// Competition stage ("Group Stage", "Final", ...)
    pub stage: String,
    pub total_seats: u32,

    /// Cached display counter
    ///
    /// Always within `0..=total_seats`. Lowered by purchase recording and
    /// recomputed by reconciliation; never incremented in the purchase flow.
    pub available_seats: u32,
}

impl Match {
    /// Human-readable fixture title, e.g. "Morocco vs Spain"
    pub fn title(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    /// Lower the available counter by `count`, floored at zero
    pub fn decrement_available(&mut self, count: u32) {
        self.available_seats = self.available_seats.saturating_sub(count);
    }

    /// Overwrite the available counter, clamped to `total_seats`
    pub fn set_available(&mut self, available: u32) {
        self.available_seats = available.min(self.total_seats);
    }

    /// Check the counter invariant
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("match id must not be empty".to_string());
        }
        if self.available_seats > self.total_seats {
            return Err(format!(
                "match {} has {} available seats but only {} in total",
                self.id, self.available_seats, self.total_seats
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_match(id: &str, total_seats: u32) -> Match {
    use chrono::TimeZone;

    Match {
        id: id.to_string(),
        home_team: "Morocco".to_string(),
        away_team: "Spain".to_string(),
        match_date: Utc.with_ymd_and_hms(2030, 6, 14, 20, 0, 0).unwrap(),
        stadium: "Grand Stade Hassan II".to_string(),
        city: "Casablanca".to_string(),
        stage: "Group Stage".to_string(),
        total_seats,
        available_seats: total_seats,
    }
}
