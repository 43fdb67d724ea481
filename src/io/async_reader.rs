//! Asynchronous order file reader with batch interface
//!
//! ```text
//! orders.csv → AsyncReader → batches of OrderRecords
//!                   ↓
//!            csv_format module
//!      (OrderCsvRecord, convert_order_record)
//! ```

use crate::io::csv_format::{convert_order_record, OrderCsvRecord};
use crate::types::OrderRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous orders reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` orders
    ///
    /// Malformed rows are logged and skipped. An empty batch means the end
    /// of the file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OrderRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OrderCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_order_record(csv_record) {
                    Ok(order) => batch.push(order),
                    Err(error) => tracing::warn!(%error, "Skipping order row"),
                },
                Some(Err(error)) => tracing::warn!(%error, "Skipping unparsable order row"),
                None => break,
            }
        }

        batch
    }
}
