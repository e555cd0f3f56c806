//! CSV format handling for request files and result output
//!
//! This module centralizes all CSV format concerns, providing:
//! - RequestCsvRecord structure for deserialization
//! - Conversion from CSV records to [`BankRequest`]s
//! - Result output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Request format
//!
//! ```text
//! op,user,account,tx,amount,name
//! register,12,,,,Kevin
//! create,12,,,10000,
//! use,12,1000000000,,200,
//! cancel,,1000000000,#3,200,
//! query,,,#3,,
//! list,12,,,,
//! delete,12,1000000000,,,
//! ```
//!
//! Columns a request does not use are left empty. The `tx` column holds a
//! transaction id or `#N`, the transaction produced by request `N`.

use crate::core::{Outcome, ProcessingResult};
use crate::types::{Amount, BankError, BankRequest, RequestSeq, TransactionRef, UserId};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Every column but `op` is optional here; which ones are required depends
/// on the operation and is checked by [`convert_csv_record`].
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct RequestCsvRecord {
    pub op: String,
    pub user: Option<UserId>,
    pub account: Option<String>,
    pub tx: Option<String>,
    pub amount: Option<Amount>,
    pub name: Option<String>,
}

fn required<T>(value: Option<T>, column: &str, op: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("'{}' request requires the {} column", op, column))
}

/// Drop empty strings, which the CSV reader yields for blank text columns
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Parse a `tx` column value
///
/// `#N` refers to request `N` (1-based); anything else is a transaction id.
pub fn parse_transaction_ref(value: &str) -> Result<TransactionRef, String> {
    match value.strip_prefix('#') {
        Some(seq) => match seq.parse::<RequestSeq>() {
            Ok(seq) if seq > 0 => Ok(TransactionRef::Seq(seq)),
            _ => Err(format!("Invalid request reference '{}'", value)),
        },
        None => Ok(TransactionRef::Id(value.to_string())),
    }
}

/// Convert a RequestCsvRecord to a BankRequest
///
/// # Returns
///
/// * `Ok(BankRequest)` - Successfully converted record
/// * `Err(String)` - The operation is unknown or a required column is empty
pub fn convert_csv_record(csv_record: RequestCsvRecord) -> Result<BankRequest, String> {
    let op = csv_record.op.to_lowercase();
    let account = non_empty(csv_record.account);
    let tx = non_empty(csv_record.tx);

    let request = match op.as_str() {
        "register" => BankRequest::Register {
            user_id: required(csv_record.user, "user", &op)?,
            name: required(non_empty(csv_record.name), "name", &op)?,
        },
        "create" => BankRequest::Create {
            user_id: required(csv_record.user, "user", &op)?,
            initial_balance: required(csv_record.amount, "amount", &op)?,
        },
        "delete" => BankRequest::Delete {
            user_id: required(csv_record.user, "user", &op)?,
            account_number: required(account, "account", &op)?,
        },
        "use" => BankRequest::Use {
            user_id: required(csv_record.user, "user", &op)?,
            account_number: required(account, "account", &op)?,
            amount: required(csv_record.amount, "amount", &op)?,
        },
        "cancel" => BankRequest::Cancel {
            transaction: parse_transaction_ref(&required(tx, "tx", &op)?)?,
            account_number: required(account, "account", &op)?,
            amount: required(csv_record.amount, "amount", &op)?,
        },
        "query" => BankRequest::Query {
            transaction: parse_transaction_ref(&required(tx, "tx", &op)?)?,
        },
        "list" => BankRequest::List {
            user_id: required(csv_record.user, "user", &op)?,
        },
        _ => return Err(format!("Invalid operation: '{}'", csv_record.op)),
    };

    Ok(request)
}

/// Write processing results to CSV format
///
/// Writes results with columns: seq, op, status, account, type, result,
/// amount, balance, error. Results are sorted by sequence number.
/// Transaction ids and timestamps are left out so that replaying the same
/// file always produces the same output.
///
/// For a `list` request the account and balance columns hold the user's
/// accounts joined with `;`. For account requests the result column holds
/// the account status.
pub fn write_results_csv(
    results: &[ProcessingResult],
    output: &mut dyn Write,
) -> Result<(), BankError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "seq", "op", "status", "account", "type", "result", "amount", "balance", "error",
    ])?;

    let mut sorted: Vec<&ProcessingResult> = results.iter().collect();
    sorted.sort_by_key(|result| result.seq);

    for result in sorted {
        let seq = result.seq.to_string();
        let status = if result.outcome.is_ok() { "ok" } else { "error" };
        let [account, tx_type, result_type, amount, balance, error] = result_columns(result);

        writer.write_record([
            seq.as_str(),
            result.op,
            status,
            account.as_str(),
            tx_type.as_str(),
            result_type.as_str(),
            amount.as_str(),
            balance.as_str(),
            error.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Columns account, type, result, amount, balance and error of a result row
fn result_columns(result: &ProcessingResult) -> [String; 6] {
    match &result.outcome {
        Ok(Outcome::Registered { .. }) => Default::default(),
        Ok(Outcome::Account(account)) => [
            account.account_number.clone(),
            String::new(),
            account.status.as_str().to_string(),
            String::new(),
            account.balance.to_string(),
            String::new(),
        ],
        Ok(Outcome::Transaction(transaction)) => [
            transaction.account_number.clone(),
            transaction.transaction_type.as_str().to_string(),
            transaction.result_type.as_str().to_string(),
            transaction.amount.to_string(),
            transaction.balance_snapshot.to_string(),
            String::new(),
        ],
        Ok(Outcome::Accounts(accounts)) => [
            join(accounts.iter().map(|a| a.account_number.clone())),
            String::new(),
            String::new(),
            String::new(),
            join(accounts.iter().map(|a| a.balance.to_string())),
            String::new(),
        ],
        Err(e) => {
            let mut columns: [String; 6] = Default::default();
            columns[5] = e.kind().to_string();
            columns
        }
    }
}

fn join(values: impl Iterator<Item = String>) -> String {
    values.collect::<Vec<_>>().join(";")
}
