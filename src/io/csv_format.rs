//! CSV format handling for catalog files, order files and reports
//!
//! This module centralizes all CSV format concerns:
//! - record structures for deserialization (`*CsvRecord`)
//! - conversion from CSV records to domain types
//! - card and purchase report serialization
//!
//! Monetary columns are decimal major units ("300.00") and become integer
//! minor units here; nothing past this module sees a decimal. All
//! functions are pure (no file I/O) for easy testing.

use crate::types::{
    BuyerProfile, CardDetails, CardStatement, CardStatus, CategoryId, Match, MatchId, MinorUnits,
    OrderRecord, PaymentMethod, Purchase, Seat, SeatStatus, TicketCategory, TicketingError,
    UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Digits after the decimal point in monetary columns
const MONEY_SCALE: u32 = 2;

/// Row of `matches.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MatchCsvRecord {
    pub id: MatchId,
    pub home_team: String,
    pub away_team: String,
    /// RFC 3339, e.g. "2030-06-14T20:00:00Z"
    pub match_date: String,
    pub stadium: String,
    pub city: String,
    pub stage: String,
    pub total_seats: u32,
    /// Defaults to `total_seats` when empty
    pub available_seats: Option<u32>,
}

/// Row of `categories.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CategoryCsvRecord {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub min_price: String,
    pub max_price: String,
    pub color: Option<String>,
}

/// Row of `cards.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CardCsvRecord {
    pub user: UserId,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub balance: String,
    pub currency: Option<String>,
    pub status: Option<String>,
}

/// Card to provision, as read from `cards.csv`
#[derive(Debug, Clone, PartialEq)]
pub struct CardSeed {
    pub user_id: UserId,
    pub details: CardDetails,
    pub balance: MinorUnits,
    pub currency: Option<String>,
    pub status: CardStatus,
}

/// Row of `seats.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SeatCsvRecord {
    pub id: String,
    #[serde(rename = "match")]
    pub match_id: MatchId,
    pub category: CategoryId,
    pub block: String,
    pub row: String,
    pub seat: String,
    pub price: String,
    pub status: Option<String>,
}

/// Row of `roles.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RoleCsvRecord {
    pub user: UserId,
    pub role: String,
}

/// Row of an orders file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OrderCsvRecord {
    pub user: UserId,
    #[serde(rename = "match")]
    pub match_id: MatchId,
    pub category: CategoryId,
    pub quantity: u32,
    pub payment_method: String,
    pub card_number: Option<String>,
    pub expiry: Option<String>,
    pub cvv: Option<String>,
    pub holder_name: String,
    pub holder_email: String,
}

/// Parse a decimal major-unit amount into minor units
///
/// "300" and "300.00" both give 30000. More than two fractional digits
/// is rejected rather than rounded.
pub fn parse_money(value: &str) -> Result<MinorUnits, String> {
    let decimal = Decimal::from_str(value.trim())
        .map_err(|_| format!("Invalid amount '{}'", value.trim()))?;

    if decimal.scale() > MONEY_SCALE {
        return Err(format!(
            "Invalid amount '{}': more than {} decimal places",
            value.trim(),
            MONEY_SCALE
        ));
    }

    decimal
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| format!("Invalid amount '{}': out of range", value.trim()))
}

/// Render minor units as a major-unit amount with two decimals
pub fn format_money(amount: MinorUnits) -> String {
    format!("{:.2}", Decimal::new(amount, MONEY_SCALE))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn convert_match_record(record: MatchCsvRecord) -> Result<Match, String> {
    let match_date = DateTime::parse_from_rfc3339(record.match_date.trim())
        .map_err(|e| {
            format!(
                "Invalid match_date '{}' for match {}: {}",
                record.match_date, record.id, e
            )
        })?
        .with_timezone(&Utc);

    Ok(Match {
        available_seats: record.available_seats.unwrap_or(record.total_seats),
        id: record.id,
        home_team: record.home_team,
        away_team: record.away_team,
        match_date,
        stadium: record.stadium,
        city: record.city,
        stage: record.stage,
        total_seats: record.total_seats,
    })
}

pub fn convert_category_record(record: CategoryCsvRecord) -> Result<TicketCategory, String> {
    let min_price = parse_money(&record.min_price)
        .map_err(|e| format!("{} (min_price of category {})", e, record.id))?;
    let max_price = parse_money(&record.max_price)
        .map_err(|e| format!("{} (max_price of category {})", e, record.id))?;

    Ok(TicketCategory {
        id: record.id,
        name: record.name,
        description: non_empty(record.description),
        min_price,
        max_price,
        color: non_empty(record.color).unwrap_or_default(),
    })
}

pub fn convert_card_record(record: CardCsvRecord) -> Result<CardSeed, String> {
    let balance = parse_money(&record.balance)
        .map_err(|e| format!("{} (balance of user {})", e, record.user))?;

    let status = match non_empty(record.status) {
        Some(status) => CardStatus::from_str(&status)?,
        None => CardStatus::Active,
    };

    Ok(CardSeed {
        details: CardDetails::new(record.card_number, record.expiry, record.cvv),
        user_id: record.user,
        balance,
        currency: non_empty(record.currency),
        status,
    })
}

pub fn convert_seat_record(record: SeatCsvRecord) -> Result<Seat, String> {
    let price =
        parse_money(&record.price).map_err(|e| format!("{} (price of seat {})", e, record.id))?;

    let status = match non_empty(record.status) {
        Some(status) => SeatStatus::from_str(&status)?,
        None => SeatStatus::Available,
    };

    Ok(Seat {
        id: record.id,
        match_id: record.match_id,
        category_id: record.category,
        block: record.block,
        row_number: record.row,
        seat_number: record.seat,
        price,
        status,
        reserved_by: None,
        reserved_until: None,
        created_at: Utc::now(),
    })
}

/// Convert an order row
///
/// Card payments must carry card number, expiry and CVV. Card columns of
/// other payment methods are ignored.
pub fn convert_order_record(record: OrderCsvRecord) -> Result<OrderRecord, String> {
    let payment_method = PaymentMethod::from_str(&record.payment_method)?;

    let card = if payment_method.settles_on_ledger() {
        match (
            non_empty(record.card_number),
            non_empty(record.expiry),
            non_empty(record.cvv),
        ) {
            (Some(number), Some(expiry), Some(cvv)) => Some(CardDetails::new(number, expiry, cvv)),
            _ => {
                return Err(format!(
                    "Card order of user {} requires card_number, expiry and cvv",
                    record.user
                ))
            }
        }
    } else {
        None
    };

    Ok(OrderRecord {
        user_id: record.user,
        match_id: record.match_id,
        category_id: record.category,
        quantity: record.quantity,
        payment_method,
        card,
        buyer: BuyerProfile::new(record.holder_name, record.holder_email),
    })
}

/// Write card balances, sorted by user
pub fn write_cards_csv(
    statements: &[CardStatement],
    output: &mut dyn Write,
) -> Result<(), TicketingError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["user", "card", "balance", "currency", "transactions"])?;

    let mut sorted = statements.to_vec();
    sorted.sort_by(|a, b| a.card.user_id.cmp(&b.card.user_id));

    for statement in sorted {
        writer.write_record(&[
            statement.card.user_id.clone(),
            statement.card.masked_card_number.clone(),
            format_money(statement.card.balance),
            statement.card.currency.clone(),
            statement.transaction_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write issued tickets in the given order
pub fn write_purchases_csv(
    purchases: &[Purchase],
    output: &mut dyn Write,
) -> Result<(), TicketingError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "ticket_id",
        "user",
        "match",
        "category",
        "block",
        "row",
        "seat",
        "price",
        "holder_name",
        "holder_email",
        "payment_method",
        "payment_status",
        "created_at",
    ])?;

    for purchase in purchases {
        writer.write_record(&[
            purchase.ticket_id.clone(),
            purchase.user_id.clone(),
            purchase.match_id.clone(),
            purchase.category_name.clone(),
            purchase.block.clone(),
            purchase.row_number.clone(),
            purchase.seat_number.clone(),
            format_money(purchase.price),
            purchase.holder_name.clone(),
            purchase.holder_email.clone(),
            purchase.payment_method.to_string(),
            purchase.payment_status.to_string(),
            purchase.created_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn order_record(method: &str, card_number: Option<&str>) -> OrderCsvRecord {
        OrderCsvRecord {
            user: "u1".to_string(),
            match_id: "m1".to_string(),
            category: "cat1".to_string(),
            quantity: 2,
            payment_method: method.to_string(),
            card_number: card_number.map(str::to_string),
            expiry: Some("12/30".to_string()),
            cvv: Some("123".to_string()),
            holder_name: "Amina Benali".to_string(),
            holder_email: "amina@example.ma".to_string(),
        }
    }

    #[rstest]
    #[case::whole("300", 30_000)]
    #[case::two_decimals("300.00", 30_000)]
    #[case::one_decimal("12.5", 1_250)]
    #[case::cents("0.01", 1)]
    #[case::padded("  1000.00 ", 100_000)]
    #[case::zero("0", 0)]
    fn test_parse_money(#[case] input: &str, #[case] expected: MinorUnits) {
        assert_eq!(parse_money(input), Ok(expected));
    }

    #[rstest]
    #[case::three_decimals("1.005", "decimal places")]
    #[case::not_a_number("abc", "Invalid amount")]
    #[case::empty("", "Invalid amount")]
    fn test_parse_money_errors(#[case] input: &str, #[case] expected_error: &str) {
        let error = parse_money(input).unwrap_err();
        assert!(error.contains(expected_error), "{}", error);
    }

    #[rstest]
    #[case(70_000, "700.00")]
    #[case(1, "0.01")]
    #[case(0, "0.00")]
    #[case(123_456, "1234.56")]
    fn test_format_money(#[case] amount: MinorUnits, #[case] expected: &str) {
        assert_eq!(format_money(amount), expected);
    }

    #[test]
    fn test_convert_match_record() {
        let record = MatchCsvRecord {
            id: "m1".to_string(),
            home_team: "Morocco".to_string(),
            away_team: "Spain".to_string(),
            match_date: "2030-06-14T20:00:00Z".to_string(),
            stadium: "Grand Stade Hassan II".to_string(),
            city: "Casablanca".to_string(),
            stage: "Group Stage".to_string(),
            total_seats: 100,
            available_seats: None,
        };

        let fixture = convert_match_record(record).unwrap();

        assert_eq!(fixture.available_seats, 100);
        assert_eq!(
            fixture.match_date,
            Utc.with_ymd_and_hms(2030, 6, 14, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_convert_match_record_rejects_bad_date() {
        let record = MatchCsvRecord {
            id: "m1".to_string(),
            home_team: "Morocco".to_string(),
            away_team: "Spain".to_string(),
            match_date: "14/06/2030".to_string(),
            stadium: "s".to_string(),
            city: "c".to_string(),
            stage: "g".to_string(),
            total_seats: 1,
            available_seats: Some(1),
        };
        assert!(convert_match_record(record)
            .unwrap_err()
            .contains("Invalid match_date"));
    }

    #[test]
    fn test_convert_category_record() {
        let record = CategoryCsvRecord {
            id: "vip".to_string(),
            name: "VIP".to_string(),
            description: Some("  ".to_string()),
            min_price: "1500.00".to_string(),
            max_price: "3000.00".to_string(),
            color: Some("#C1272D".to_string()),
        };

        let category = convert_category_record(record).unwrap();

        assert_eq!(category.min_price, 150_000);
        assert_eq!(category.max_price, 300_000);
        assert_eq!(category.description, None);
        assert_eq!(category.color, "#C1272D");
    }

    #[test]
    fn test_convert_card_record_defaults() {
        let record = CardCsvRecord {
            user: "u1".to_string(),
            card_number: "4242 4242 4242 4242".to_string(),
            expiry: "12/30".to_string(),
            cvv: "123".to_string(),
            balance: "1000.00".to_string(),
            currency: None,
            status: None,
        };

        let seed = convert_card_record(record).unwrap();

        assert_eq!(seed.balance, 100_000);
        assert_eq!(seed.status, CardStatus::Active);
        assert_eq!(seed.currency, None);
    }

    #[test]
    fn test_convert_seat_record() {
        let record = SeatCsvRecord {
            id: "m1-A-1-1".to_string(),
            match_id: "m1".to_string(),
            category: "vip".to_string(),
            block: "A".to_string(),
            row: "1".to_string(),
            seat: "1".to_string(),
            price: "300.00".to_string(),
            status: Some("sold".to_string()),
        };

        let seat = convert_seat_record(record).unwrap();

        assert_eq!(seat.price, 30_000);
        assert_eq!(seat.status, SeatStatus::Sold);
        assert_eq!(seat.label(), "A-1-1");
    }

    #[test]
    fn test_convert_card_order() {
        let order = convert_order_record(order_record("card", Some("4242 4242 4242 4242"))).unwrap();

        assert_eq!(order.payment_method, PaymentMethod::Card);
        assert_eq!(order.card.unwrap().cleaned_number(), "4242424242424242");
        assert_eq!(order.quantity, 2);
        assert_eq!(order.buyer.full_name, "Amina Benali");
    }

    #[rstest]
    #[case::card_without_number("card", None, "requires card_number")]
    #[case::unknown_method("cheque", Some("4242"), "Invalid payment method")]
    fn test_convert_order_errors(
        #[case] method: &str,
        #[case] card_number: Option<&str>,
        #[case] expected_error: &str,
    ) {
        let error = convert_order_record(order_record(method, card_number)).unwrap_err();
        assert!(error.contains(expected_error), "{}", error);
    }

    #[test]
    fn test_non_card_order_drops_card_columns() {
        let order = convert_order_record(order_record("wallet", Some("4242"))).unwrap();
        assert_eq!(order.payment_method, PaymentMethod::Wallet);
        assert!(order.card.is_none());
    }

    fn statement(user: &str, balance: MinorUnits, transactions: usize) -> CardStatement {
        let now = Utc::now();
        CardStatement {
            card: crate::types::VirtualCard {
                id: format!("card-{}", user),
                user_id: user.to_string(),
                masked_card_number: "**** **** **** 4242".to_string(),
                card_number_hash: String::new(),
                cvv_hash: String::new(),
                expiry_date: "12/30".to_string(),
                balance,
                currency: "MAD".to_string(),
                status: CardStatus::Active,
                created_at: now,
                updated_at: now,
            },
            transaction_count: transactions,
        }
    }

    #[rstest]
    #[case::single(
        vec![statement("u1", 70_000, 1)],
        "user,card,balance,currency,transactions\nu1,**** **** **** 4242,700.00,MAD,1\n"
    )]
    #[case::sorted_by_user(
        vec![statement("u2", 5, 0), statement("u1", 100_000, 0)],
        "user,card,balance,currency,transactions\nu1,**** **** **** 4242,1000.00,MAD,0\nu2,**** **** **** 4242,0.05,MAD,0\n"
    )]
    #[case::empty(vec![], "user,card,balance,currency,transactions\n")]
    fn test_write_cards_csv(#[case] statements: Vec<CardStatement>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_cards_csv(&statements, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }

    #[test]
    fn test_write_purchases_csv() {
        let purchase = Purchase {
            id: "p1".to_string(),
            user_id: "u1".to_string(),
            match_id: "m1".to_string(),
            seat_id: "m1-A-1-1".to_string(),
            ticket_id: "WC2030-LOYW3V28-ABCDEFGH".to_string(),
            category_name: "VIP".to_string(),
            block: "A".to_string(),
            row_number: "1".to_string(),
            seat_number: "1".to_string(),
            price: 30_000,
            holder_name: "Amina Benali".to_string(),
            holder_email: "amina@example.ma".to_string(),
            payment_method: PaymentMethod::Card,
            payment_status: crate::types::PaymentStatus::Completed,
            created_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        };

        let mut output = Vec::new();
        write_purchases_csv(&[purchase], &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ticket_id,user,match,category"));
        assert_eq!(
            lines[1],
            "WC2030-LOYW3V28-ABCDEFGH,u1,m1,VIP,A,1,1,300.00,Amina Benali,amina@example.ma,card,completed,2030-01-02T03:04:05+00:00"
        );
    }
}
