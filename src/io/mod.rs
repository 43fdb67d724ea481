//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `catalog_loader` - seeds a service from a catalog directory
//! - `sync_reader` - synchronous orders reader with iterator interface
//! - `async_reader` - asynchronous orders reader with batch reading interface

pub mod async_reader;
pub mod catalog_loader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use catalog_loader::load_catalog;
pub use csv_format::{write_cards_csv, write_purchases_csv};
pub use sync_reader::SyncReader;
