//! Catalog directory loading
//!
//! Seeds a [`TicketingService`] from a directory of CSV files:
//!
//! | File | Required | Content |
//! |---|---|---|
//! | `matches.csv` | yes | fixtures |
//! | `categories.csv` | yes | ticket categories |
//! | `cards.csv` | yes | virtual cards to provision |
//! | `seats.csv` | no | explicit seat maps (others are bootstrapped) |
//! | `roles.csv` | no | user roles (everyone else is a purchaser) |
//!
//! Unlike order files, catalog data is reference data: the first bad row
//! aborts loading.

use crate::core::TicketingService;
use crate::io::csv_format::{
    convert_card_record, convert_category_record, convert_match_record, convert_seat_record,
    RoleCsvRecord,
};
use crate::types::{CallerRole, RoleDirectory, Seat, TicketingError};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

pub const MATCHES_FILE: &str = "matches.csv";
pub const CATEGORIES_FILE: &str = "categories.csv";
pub const CARDS_FILE: &str = "cards.csv";
pub const SEATS_FILE: &str = "seats.csv";
pub const ROLES_FILE: &str = "roles.csv";

/// Load every catalog file into `service` and return the role directory
///
/// # Errors
///
/// - `FileNotFound` if a required file is missing
/// - `ParseError` (with line) for a malformed row
/// - `ValidationError` for a seat priced outside its category band
/// - any validation error raised while seeding the stores
pub fn load_catalog(dir: &Path, service: &TicketingService) -> Result<RoleDirectory, TicketingError> {
    let matches = read_rows(&dir.join(MATCHES_FILE), convert_match_record)?;
    let match_count = matches.len();
    for fixture in matches {
        service.inventory().add_match(fixture)?;
    }

    let categories = read_rows(&dir.join(CATEGORIES_FILE), convert_category_record)?;
    let category_count = categories.len();
    for category in categories {
        service.catalog().insert(category)?;
    }

    let cards = read_rows(&dir.join(CARDS_FILE), convert_card_record)?;
    let card_count = cards.len();
    for seed in cards {
        let currency = seed
            .currency
            .unwrap_or_else(|| service.config().default_currency.clone());
        service.ledger().provision_card(
            &seed.user_id,
            &seed.details,
            seed.balance,
            &currency,
            seed.status,
        )?;
    }

    let seats_path = dir.join(SEATS_FILE);
    let mut seat_count = 0;
    if seats_path.exists() {
        let mut by_match: BTreeMap<String, Vec<Seat>> = BTreeMap::new();
        for seat in read_rows(&seats_path, convert_seat_record)? {
            let category = service.catalog().get(&seat.category_id).ok_or_else(|| {
                TicketingError::validation(format!(
                    "seat {} references unknown category {}",
                    seat.id, seat.category_id
                ))
            })?;
            if !category.admits_price(seat.price) {
                return Err(TicketingError::validation(format!(
                    "seat {} price {} is outside the {} band [{}, {})",
                    seat.id, seat.price, category.id, category.min_price, category.max_price
                )));
            }
            by_match.entry(seat.match_id.clone()).or_default().push(seat);
        }
        for (match_id, seats) in by_match {
            seat_count += seats.len();
            service.inventory().insert_seats(&match_id, seats)?;
        }
    }

    let roles_path = dir.join(ROLES_FILE);
    let mut roles = RoleDirectory::new();
    if roles_path.exists() {
        let assignments = read_rows(&roles_path, |row: RoleCsvRecord| {
            let role = row.role.parse::<CallerRole>()?;
            Ok((row.user, role))
        })?;
        for (user_id, role) in assignments {
            roles.assign(user_id, role);
        }
    }

    tracing::info!(
        dir = %dir.display(),
        matches = match_count,
        categories = category_count,
        cards = card_count,
        seats = seat_count,
        "Catalog loaded"
    );

    Ok(roles)
}

/// Read and convert every row of a CSV file
fn read_rows<R, T, F>(path: &Path, convert: F) -> Result<Vec<T>, TicketingError>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T, String>,
{
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TicketingError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => TicketingError::from(e),
    })?;

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize::<R>() {
        let record = result?;
        let row = convert(record).map_err(|message| TicketingError::ParseError {
            line: Some(rows.len() as u64 + 2),
            message: format!("{}: {}", path.display(), message),
        })?;
        rows.push(row);
    }

    Ok(rows)
}
