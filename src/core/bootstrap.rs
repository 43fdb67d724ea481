//! Seat map bootstrap
//!
//! Synthesizes sample seats for a match that has none: a fixed set of
//! blocks, each assigned round-robin to the catalog categories, each with a
//! grid of rows by seats. Prices are drawn uniformly from the category band
//! and a minority of seats start out sold so that maps look lived-in.
//!
//! Generation is a pure function of its inputs and the RNG. Running it at
//! most once per match is the inventory's job (see
//! [`SeatInventory::bootstrap_with`](super::inventory::SeatInventory::bootstrap_with)).

use crate::types::{Match, Seat, SeatStatus, TicketCategory, TicketingError};
use chrono::Utc;
use rand::Rng;

/// Shape of a generated seat map
#[derive(Debug, Clone, PartialEq)]
pub struct SeatMapLayout {
    pub blocks: Vec<String>,
    pub rows: Vec<String>,
    pub seats_per_row: u32,
    /// Probability that a generated seat starts out sold
    pub sold_ratio: f64,
}

impl Default for SeatMapLayout {
    /// Blocks A to F, rows 1 to 4, five seats per row (120 seats)
    fn default() -> Self {
        Self {
            blocks: ["A", "B", "C", "D", "E", "F"].iter().map(|b| b.to_string()).collect(),
            rows: (1..=4).map(|r| r.to_string()).collect(),
            seats_per_row: 5,
            sold_ratio: 0.2,
        }
    }
}

impl SeatMapLayout {
    pub fn seat_count(&self) -> usize {
        self.blocks.len() * self.rows.len() * self.seats_per_row as usize
    }
}

/// Generate the seat map of one match
///
/// Block `i` gets `categories[i % categories.len()]`. Seat ids are derived
/// from the match id and the seat label (`<match>-A-1-1`), so they are
/// stable across runs.
///
/// # Errors
///
/// `ValidationError` if `categories` is empty or `sold_ratio` is outside
/// `[0, 1]`.
pub fn generate_seat_map<R: Rng>(
    fixture: &Match,
    categories: &[TicketCategory],
    layout: &SeatMapLayout,
    rng: &mut R,
) -> Result<Vec<Seat>, TicketingError> {
    if categories.is_empty() {
        return Err(TicketingError::validation(format!(
            "cannot bootstrap match {}: no ticket categories",
            fixture.id
        )));
    }
    if !(0.0..=1.0).contains(&layout.sold_ratio) {
        return Err(TicketingError::validation(format!(
            "sold ratio {} is not a probability",
            layout.sold_ratio
        )));
    }

    let created_at = Utc::now();
    let mut seats = Vec::with_capacity(layout.seat_count());

    for (block_index, block) in layout.blocks.iter().enumerate() {
        let category = &categories[block_index % categories.len()];

        for row in &layout.rows {
            for seat_number in 1..=layout.seats_per_row {
                let price = if category.max_price > category.min_price {
                    rng.gen_range(category.min_price..category.max_price)
                } else {
                    category.min_price
                };
                let status = if rng.gen_bool(layout.sold_ratio) {
                    SeatStatus::Sold
                } else {
                    SeatStatus::Available
                };

                seats.push(Seat {
                    id: format!("{}-{}-{}-{}", fixture.id, block, row, seat_number),
                    match_id: fixture.id.clone(),
                    category_id: category.id.clone(),
                    block: block.clone(),
                    row_number: row.clone(),
                    seat_number: seat_number.to_string(),
                    price,
                    status,
                    reserved_by: None,
                    reserved_until: None,
                    created_at,
                });
            }
        }
    }

    Ok(seats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixture::sample_match;
    use crate::types::seat::sample_category;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn categories() -> Vec<TicketCategory> {
        vec![
            sample_category("vip", 150_000, 300_000),
            sample_category("cat1", 80_000, 120_000),
            sample_category("cat2", 40_000, 80_000),
        ]
    }

    #[test]
    fn test_default_layout_generates_120_seats() {
        let fixture = sample_match("m1", 100);
        let mut rng = StdRng::seed_from_u64(1);

        let seats = generate_seat_map(&fixture, &categories(), &SeatMapLayout::default(), &mut rng)
            .unwrap();

        assert_eq!(seats.len(), 120);
        let ids: HashSet<&String> = seats.iter().map(|seat| &seat.id).collect();
        assert_eq!(ids.len(), 120);
        assert!(seats.iter().all(|seat| seat.match_id == "m1"));
    }

    #[test]
    fn test_blocks_assigned_round_robin() {
        let fixture = sample_match("m1", 100);
        let mut rng = StdRng::seed_from_u64(1);

        let seats = generate_seat_map(&fixture, &categories(), &SeatMapLayout::default(), &mut rng)
            .unwrap();

        let category_of = |block: &str| {
            seats
                .iter()
                .find(|seat| seat.block == block)
                .map(|seat| seat.category_id.clone())
                .unwrap()
        };
        assert_eq!(category_of("A"), "vip");
        assert_eq!(category_of("B"), "cat1");
        assert_eq!(category_of("C"), "cat2");
        assert_eq!(category_of("D"), "vip");
        assert_eq!(category_of("F"), "cat2");
    }

    #[test]
    fn test_prices_within_category_band() {
        let fixture = sample_match("m1", 100);
        let categories = categories();
        let mut rng = StdRng::seed_from_u64(99);

        let seats =
            generate_seat_map(&fixture, &categories, &SeatMapLayout::default(), &mut rng).unwrap();

        for seat in &seats {
            let category = categories.iter().find(|c| c.id == seat.category_id).unwrap();
            assert!(category.admits_price(seat.price), "{} out of band", seat.price);
        }
    }

    #[test]
    fn test_degenerate_band_uses_min_price() {
        let fixture = sample_match("m1", 100);
        let mut rng = StdRng::seed_from_u64(3);

        let seats = generate_seat_map(
            &fixture,
            &[sample_category("flat", 25_000, 25_000)],
            &SeatMapLayout::default(),
            &mut rng,
        )
        .unwrap();

        assert!(seats.iter().all(|seat| seat.price == 25_000));
    }

    #[test]
    fn test_sold_ratio_extremes() {
        let fixture = sample_match("m1", 100);
        let mut rng = StdRng::seed_from_u64(5);
        let mut layout = SeatMapLayout::default();

        layout.sold_ratio = 0.0;
        let seats = generate_seat_map(&fixture, &categories(), &layout, &mut rng).unwrap();
        assert!(seats.iter().all(Seat::is_available));

        layout.sold_ratio = 1.0;
        let seats = generate_seat_map(&fixture, &categories(), &layout, &mut rng).unwrap();
        assert!(seats.iter().all(|seat| !seat.is_available()));
    }

    #[test]
    fn test_majority_available_with_default_ratio() {
        let fixture = sample_match("m1", 100);
        let mut rng = StdRng::seed_from_u64(2030);

        let seats = generate_seat_map(&fixture, &categories(), &SeatMapLayout::default(), &mut rng)
            .unwrap();

        let available = seats.iter().filter(|seat| seat.is_available()).count();
        assert!(available > seats.len() / 2);
    }

    #[test]
    fn test_same_seed_same_map() {
        let fixture = sample_match("m1", 100);
        let layout = SeatMapLayout::default();

        let a = generate_seat_map(&fixture, &categories(), &layout, &mut StdRng::seed_from_u64(8))
            .unwrap();
        let b = generate_seat_map(&fixture, &categories(), &layout, &mut StdRng::seed_from_u64(8))
            .unwrap();

        let summary = |seats: &[Seat]| {
            seats
                .iter()
                .map(|seat| (seat.id.clone(), seat.price, seat.status))
                .collect::<Vec<_>>()
        };
        assert_eq!(summary(&a), summary(&b));
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        let fixture = sample_match("m1", 100);
        let mut rng = StdRng::seed_from_u64(1);

        let result = generate_seat_map(&fixture, &[], &SeatMapLayout::default(), &mut rng);

        assert!(matches!(result, Err(TicketingError::ValidationError { .. })));
    }
}
