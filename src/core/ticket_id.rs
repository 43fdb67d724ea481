//! Ticket id generation
//!
//! Ticket ids have the form `<PREFIX>-<TIME>-<RANDOM>`, e.g.
//! `WC2030-LZ3K8Q1B-7G2XK9QD`: the time segment is the wall-clock time in
//! milliseconds written in base 36, the random segment is eight base-36
//! characters. There is no global uniqueness check; the recorder redraws
//! an id that repeats inside one batch.

use super::traits::TicketIdSource;
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const RANDOM_SEGMENT_LEN: usize = 8;

/// Time + randomness ticket id generator
#[derive(Debug, Clone)]
pub struct TicketIdGenerator {
    prefix: String,
}

impl TicketIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Draw one id from the current time and the thread-local RNG
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng(), Utc::now().timestamp_millis())
    }

    /// Draw one id from an explicit RNG and timestamp
    pub fn generate_with<R: Rng>(&self, rng: &mut R, timestamp_millis: i64) -> String {
        let random: String = (0..RANDOM_SEGMENT_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();

        format!(
            "{}-{}-{}",
            self.prefix,
            to_base36(timestamp_millis.max(0) as u64),
            random
        )
    }
}

impl TicketIdSource for TicketIdGenerator {
    fn next_ticket_id(&self) -> String {
        self.generate()
    }
}

/// Upper-case base-36 rendering of an unsigned integer
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}

/// Correlation key for one checkout attempt, e.g. `WC2030-3F2A...`
pub fn payment_reference(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Uuid::new_v4().simple().to_string().to_uppercase()
    )
}
