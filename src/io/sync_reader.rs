//! Synchronous order file reader with iterator interface
//!
//! Streams [`OrderRecord`]s from an orders CSV one row at a time; the file
//! is never loaded whole. Opening failures are returned from `new()`, row
//! failures are yielded as `Err` items carrying the line number so the
//! caller can skip them and continue.
//!
//! ```no_run
//! use ticketing_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("orders.csv")).unwrap();
//! let orders: Vec<_> = reader.filter_map(Result::ok).collect();
//! println!("{} orders", orders.len());
//! ```

use crate::io::csv_format::{convert_order_record, OrderCsvRecord};
use crate::types::OrderRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open an orders file
    ///
    /// Fields are trimmed and rows may omit trailing card columns.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<OrderRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<OrderCsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        // +1 for the header row
        let line = self.line_num + 1;
        Some(match next {
            Ok(csv_record) => {
                convert_order_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}
