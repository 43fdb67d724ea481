//! Seat inventory store
//!
//! Authoritative record of every match and its seats. This module is the
//! single serialization point for seat sales: all seats of a match live in
//! one `DashMap` entry, so marking a group of seats sold, lowering the
//! match counter and bootstrapping a seat map each happen under that
//! entry's lock.
//!
//! # Invariants
//!
//! - A seat moves `Available -> Sold` at most once.
//! - `mark_sold` is all-or-nothing: if any requested seat is not available,
//!   no seat changes and the caller gets `SeatUnavailable`.
//! - `0 <= available_seats <= total_seats` for every match.
//! - A seat map is bootstrapped at most once per match.

use crate::types::{Match, MatchId, Seat, SeatId, SeatStatus, TicketingError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

/// A match together with its seats
#[derive(Debug, Clone)]
struct MatchSeating {
    fixture: Match,
    seats: Vec<Seat>,
}

impl MatchSeating {
    /// Indices of `seat_ids` if every one of them can be sold right now
    fn claimable(&self, seat_ids: &[SeatId]) -> Result<Vec<usize>, TicketingError> {
        let mut seen = HashSet::with_capacity(seat_ids.len());
        let mut indices = Vec::with_capacity(seat_ids.len());
        let mut unavailable = Vec::new();

        for seat_id in seat_ids {
            if !seen.insert(seat_id.as_str()) {
                return Err(TicketingError::validation(format!(
                    "seat {} requested twice",
                    seat_id
                )));
            }

            let index = self
                .seats
                .iter()
                .position(|seat| &seat.id == seat_id)
                .ok_or_else(|| {
                    TicketingError::validation(format!(
                        "seat {} does not belong to match {}",
                        seat_id, self.fixture.id
                    ))
                })?;

            if self.seats[index].is_available() {
                indices.push(index);
            } else {
                unavailable.push(seat_id.clone());
            }
        }

        if unavailable.is_empty() {
            Ok(indices)
        } else {
            Err(TicketingError::seat_unavailable(unavailable))
        }
    }

    fn sorted_seats(&self) -> Vec<Seat> {
        let mut seats = self.seats.clone();
        seats.sort_by(|a, b| a.stadium_order(b));
        seats
    }
}

/// Thread-safe seat inventory
#[derive(Debug, Default)]
pub struct SeatInventory {
    seating: DashMap<MatchId, MatchSeating>,
}

impl SeatInventory {
    pub fn new() -> Self {
        Self {
            seating: DashMap::new(),
        }
    }

    /// Register a match with no seats
    ///
    /// # Errors
    ///
    /// `ValidationError` if the counter invariant does not hold or the id
    /// is already registered.
    pub fn add_match(&self, fixture: Match) -> Result<(), TicketingError> {
        fixture.validate().map_err(TicketingError::validation)?;

        match self.seating.entry(fixture.id.clone()) {
            Entry::Occupied(_) => Err(TicketingError::validation(format!(
                "match {} already exists",
                fixture.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(MatchSeating {
                    fixture,
                    seats: Vec::new(),
                });
                Ok(())
            }
        }
    }

    pub fn get_match(&self, match_id: &str) -> Option<Match> {
        self.seating
            .get(match_id)
            .map(|entry| entry.fixture.clone())
    }

    /// All matches by kick-off time
    pub fn list_matches(&self) -> Vec<Match> {
        let mut matches: Vec<Match> = self
            .seating
            .iter()
            .map(|entry| entry.fixture.clone())
            .collect();
        matches.sort_by(|a, b| a.match_date.cmp(&b.match_date).then_with(|| a.id.cmp(&b.id)));
        matches
    }

    /// Every seat of a match, sold ones included, in stadium order
    pub fn list_seats(&self, match_id: &str) -> Result<Vec<Seat>, TicketingError> {
        self.seating
            .get(match_id)
            .map(|entry| entry.sorted_seats())
            .ok_or_else(|| TicketingError::match_not_found(match_id))
    }

    /// Current state of the given seats, in request order
    ///
    /// # Errors
    ///
    /// `MatchNotFound`, or `ValidationError` for a seat that is not part of
    /// the match.
    pub fn find_seats(&self, match_id: &str, seat_ids: &[SeatId]) -> Result<Vec<Seat>, TicketingError> {
        let entry = self
            .seating
            .get(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        seat_ids
            .iter()
            .map(|seat_id| {
                entry
                    .seats
                    .iter()
                    .find(|seat| &seat.id == seat_id)
                    .cloned()
                    .ok_or_else(|| {
                        TicketingError::validation(format!(
                            "seat {} does not belong to match {}",
                            seat_id, match_id
                        ))
                    })
            })
            .collect()
    }

    pub fn seat_count(&self, match_id: &str) -> Result<usize, TicketingError> {
        self.seating
            .get(match_id)
            .map(|entry| entry.seats.len())
            .ok_or_else(|| TicketingError::match_not_found(match_id))
    }

    /// Add pre-built seats to a match (seeding)
    ///
    /// # Errors
    ///
    /// - `MatchNotFound` if the match is unknown
    /// - `ValidationError` if a seat references another match or reuses an
    ///   existing seat id; nothing is inserted in that case
    pub fn insert_seats(&self, match_id: &str, seats: Vec<Seat>) -> Result<(), TicketingError> {
        let mut entry = self
            .seating
            .get_mut(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        let mut ids: HashSet<String> = entry.seats.iter().map(|seat| seat.id.clone()).collect();
        for seat in &seats {
            if seat.match_id != match_id {
                return Err(TicketingError::validation(format!(
                    "seat {} belongs to match {}, not {}",
                    seat.id, seat.match_id, match_id
                )));
            }
            if !ids.insert(seat.id.clone()) {
                return Err(TicketingError::validation(format!(
                    "seat {} already exists",
                    seat.id
                )));
            }
        }

        entry.seats.extend(seats);
        Ok(())
    }

    /// Return the seat map of a match, generating it first if it is empty
    ///
    /// `generate` runs under the match lock and only when the match has zero
    /// seats, so concurrent first visitors produce exactly one seat map and
    /// later calls are plain reads.
    ///
    /// # Errors
    ///
    /// `MatchNotFound`, any error returned by `generate`, or
    /// `ValidationError` if a generated seat references another match.
    pub fn bootstrap_with<F>(&self, match_id: &str, generate: F) -> Result<Vec<Seat>, TicketingError>
    where
        F: FnOnce(&Match) -> Result<Vec<Seat>, TicketingError>,
    {
        let mut entry = self
            .seating
            .get_mut(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        if entry.seats.is_empty() {
            let generated = generate(&entry.fixture)?;
            if let Some(stray) = generated.iter().find(|seat| seat.match_id != match_id) {
                return Err(TicketingError::validation(format!(
                    "generated seat {} belongs to match {}",
                    stray.id, stray.match_id
                )));
            }
            entry.seats = generated;
        }

        Ok(entry.sorted_seats())
    }

    /// Check that every seat exists and is available, without changing anything
    pub fn ensure_available(&self, match_id: &str, seat_ids: &[SeatId]) -> Result<(), TicketingError> {
        let entry = self
            .seating
            .get(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        entry.claimable(seat_ids).map(|_| ())
    }

    /// Transition seats from available to sold, all or nothing
    pub fn mark_sold(&self, match_id: &str, seat_ids: &[SeatId]) -> Result<(), TicketingError> {
        let mut entry = self
            .seating
            .get_mut(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        let indices = entry.claimable(seat_ids)?;
        for index in indices {
            entry.seats[index].status = SeatStatus::Sold;
        }

        Ok(())
    }

    /// Lower the match counter by `count`, floored at zero
    pub fn decrement_available(&self, match_id: &str, count: u32) -> Result<(), TicketingError> {
        let mut entry = self
            .seating
            .get_mut(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        entry.fixture.decrement_available(count);
        Ok(())
    }

    /// Mark seats sold and lower the counter by the same number, atomically
    ///
    /// The counter moves only if every seat was claimed, so two buyers
    /// racing for one seat lower it exactly once.
    pub fn mark_sold_and_decrement(
        &self,
        match_id: &str,
        seat_ids: &[SeatId],
    ) -> Result<(), TicketingError> {
        let mut entry = self
            .seating
            .get_mut(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        let indices = entry.claimable(seat_ids)?;
        let sold = indices.len() as u32;
        for index in indices {
            entry.seats[index].status = SeatStatus::Sold;
        }
        entry.fixture.decrement_available(sold);

        Ok(())
    }

    /// Recompute the counter from the seats still available
    ///
    /// Replaces the incrementally maintained value with
    /// `min(total_seats, available seat count)`.
    pub fn reconcile_available(&self, match_id: &str) -> Result<u32, TicketingError> {
        let mut entry = self
            .seating
            .get_mut(match_id)
            .ok_or_else(|| TicketingError::match_not_found(match_id))?;

        let available = entry.seats.iter().filter(|seat| seat.is_available()).count();
        let available = u32::try_from(available).unwrap_or(u32::MAX);
        entry.fixture.set_available(available);

        Ok(entry.fixture.available_seats)
    }
}
