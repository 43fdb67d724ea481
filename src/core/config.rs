//! Engine configuration
//!
//! Fixed policy constants with defaults matching the production site. The
//! CLI overrides them from flags or environment variables.

/// Default per-user ticket limit across all matches
pub const DEFAULT_MAX_TICKETS_PER_USER: u32 = 4;

/// Default prefix of ticket ids and payment references
pub const DEFAULT_TICKET_PREFIX: &str = "WC2030";

/// Currency of provisioned cards when none is given
pub const DEFAULT_CURRENCY: &str = "MAD";

/// Configuration of a [`TicketingService`](crate::core::TicketingService)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketingConfig {
    /// Maximum number of purchases a user may hold in total
    pub max_tickets_per_user: u32,
    /// Fixed first segment of ticket ids ("WC2030-...")
    pub ticket_prefix: String,
    pub default_currency: String,
    /// Seed for seat-map bootstrap; `None` draws from OS entropy
    pub bootstrap_seed: Option<u64>,
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            max_tickets_per_user: DEFAULT_MAX_TICKETS_PER_USER,
            ticket_prefix: DEFAULT_TICKET_PREFIX.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            bootstrap_seed: None,
        }
    }
}

impl TicketingConfig {
    /// Create a config with custom policy values
    ///
    /// An empty prefix falls back to the default one.
    pub fn new(max_tickets_per_user: u32, ticket_prefix: &str, bootstrap_seed: Option<u64>) -> Self {
        let default = Self::default();

        let ticket_prefix = if ticket_prefix.trim().is_empty() {
            tracing::warn!(
                default = %default.ticket_prefix,
                "Empty ticket prefix, using default"
            );
            default.ticket_prefix
        } else {
            ticket_prefix.trim().to_string()
        };

        Self {
            max_tickets_per_user,
            ticket_prefix,
            bootstrap_seed,
            ..default
        }
    }
}
