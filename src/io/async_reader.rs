//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of requests from any `futures::io::AsyncRead`,
//! for the async processing strategy.
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of SequencedRequests
//!                  ↓
//!           csv_format module
//!           (RequestCsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, RequestCsvRecord};
use crate::types::{RequestSeq, SequencedRequest};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use log::warn;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    seq: RequestSeq,
    finished: bool,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            seq: 0,
            finished: false,
        }
    }

    /// Whether the end of input has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read up to `batch_size` rows
    ///
    /// Rows that fail to parse are logged and skipped but still consume a
    /// sequence number, so the returned batch may hold fewer requests than
    /// rows read, and may be empty before the end of input. Check
    /// [`is_finished`](Self::is_finished) to detect the end.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<SequencedRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows_read = 0;
        let mut records = self.csv_reader.deserialize::<RequestCsvRecord>();

        while rows_read < batch_size {
            let row = match records.next().await {
                Some(row) => row,
                None => {
                    self.finished = true;
                    break;
                }
            };
            rows_read += 1;
            self.seq += 1;
            let line = self.seq + 1;

            match row {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(request) => batch.push(SequencedRequest {
                        seq: self.seq,
                        request,
                    }),
                    Err(e) => warn!("Skipping line {}: {}", line, e),
                },
                Err(e) => warn!("Skipping line {}: CSV parse error: {}", line, e),
            }
        }

        batch
    }
}
