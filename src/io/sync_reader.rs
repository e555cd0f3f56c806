//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over requests from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<SequencedRequest, String>` for each CSV row:
//!
//! ```no_run
//! use bank_account_service::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("requests.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(request) => println!("Request {}: {:?}", request.seq, request.request),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found) are returned from `new()`
//! - Individual row errors are yielded as Err variants and carry the line number
//! - A bad row still consumes its sequence number, so `#N` references keep
//!   pointing at the row on line `N + 1`

use crate::io::csv_format::{convert_csv_record, RequestCsvRecord};
use crate::types::{BankError, RequestSeq, SequencedRequest};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Reads one row at a time, so memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    seq: RequestSeq,
}

impl SyncReader {
    /// Open a request file
    ///
    /// The CSV reader trims whitespace from all fields and accepts rows with
    /// trailing columns left out.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file could not be opened.
    pub fn new(path: &Path) -> Result<Self, BankError> {
        let file = File::open(path).map_err(|e| BankError::Io {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self { reader, seq: 0 })
    }
}

impl Iterator for SyncReader {
    type Item = Result<SequencedRequest, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<RequestCsvRecord>();
        let row = deserializer.next()?;
        self.seq += 1;
        // Line numbers count the header
        let line = self.seq + 1;

        Some(match row {
            Ok(csv_record) => convert_csv_record(csv_record)
                .map(|request| SequencedRequest {
                    seq: self.seq,
                    request,
                })
                .map_err(|e| format!("Line {}: {}", line, e)),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BankRequest, TransactionRef};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,user,account,tx,amount,name\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .expect("Failed to write to temp file");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));

        assert!(matches!(result, Err(BankError::Io { .. })));
    }

    #[test]
    fn test_sync_reader_iterates_requests_in_order() {
        let file = create_temp_csv(
            "register,12,,,,Kevin\n\
             create,12,,,10000,\n\
             use,12,1000000000,,200,\n\
             cancel,,1000000000,#3,200,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        assert_eq!(records.len(), 4);
        assert_eq!(
            records.iter().map(|r| r.seq).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(
            records[3].request,
            BankRequest::Cancel {
                transaction: TransactionRef::Seq(3),
                account_number: "1000000000".to_string(),
                amount: 200,
            }
        );
    }

    #[test]
    fn test_sync_reader_bad_row_keeps_sequence() {
        let file = create_temp_csv(
            "register,12,,,,Kevin\n\
             use,12,1000000000,,lots,\n\
             list,12,,,,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        let error = records[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3"));
        assert_eq!(records[2].as_ref().unwrap().seq, 3);
    }

    #[test]
    fn test_sync_reader_reports_conversion_errors() {
        let file = create_temp_csv("withdraw,12,1000000000,,200,\n");

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        let error = records[0].as_ref().unwrap_err();
        assert!(error.contains("Line 2"));
        assert!(error.contains("Invalid operation"));
    }

    #[test]
    fn test_sync_reader_handles_whitespace_and_short_rows() {
        let file = create_temp_csv("  list  ,  12  \n");

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(
            records[0].as_ref().unwrap().request,
            BankRequest::List { user_id: 12 }
        );
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        let file = create_temp_csv("");

        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }
}
