//! Ticket category catalog
//!
//! Read-only reference data mapping a category to its price band and
//! display color. Loaded once at start-up by the seeding process.

use crate::types::{TicketCategory, TicketingError};
use dashmap::DashMap;

/// Thread-safe category lookup
#[derive(Debug, Default)]
pub struct CategoryCatalog {
    categories: DashMap<String, TicketCategory>,
}

impl CategoryCatalog {
    pub fn new() -> Self {
        Self {
            categories: DashMap::new(),
        }
    }

    /// Register a category
    ///
    /// # Errors
    ///
    /// `ValidationError` if the band is inverted or negative, or if the id
    /// is already registered (reference data is never overwritten).
    pub fn insert(&self, category: TicketCategory) -> Result<(), TicketingError> {
        category.validate().map_err(TicketingError::validation)?;

        match self.categories.entry(category.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(TicketingError::validation(
                format!("category {} already exists", category.id),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(category);
                Ok(())
            }
        }
    }

    pub fn get(&self, category_id: &str) -> Option<TicketCategory> {
        self.categories
            .get(category_id)
            .map(|entry| entry.value().clone())
    }

    /// All categories, most expensive band first (ties by id)
    ///
    /// The order is stable, so seat-map bootstrap assigns blocks to the
    /// same categories on every run.
    pub fn list(&self) -> Vec<TicketCategory> {
        let mut categories: Vec<TicketCategory> = self
            .categories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        categories.sort_by(|a, b| b.max_price.cmp(&a.max_price).then_with(|| a.id.cmp(&b.id)));
        categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
