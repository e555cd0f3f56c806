//! Transaction-related types for the bank account service
//!
//! This module defines ledger rows, their caller-facing projection, and the
//! request types for the lock-guarded balance operations.

use super::account::{Account, AccountId, Amount, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of balance operation recorded on a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Debit from the account balance
    Use,
    /// Full reversal of an earlier use
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Use => "use",
            TransactionType::Cancel => "cancel",
        }
    }
}

/// Outcome recorded on a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionResultType {
    Success,
    Fail,
}

impl TransactionResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionResultType::Success => "success",
            TransactionResultType::Fail => "fail",
        }
    }
}

/// Ledger row
///
/// One row is appended per attempted use or cancel, successful or not. Rows
/// are never mutated after they are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Surrogate id, `None` until stored
    pub id: Option<i64>,
    pub transaction_type: TransactionType,
    pub result_type: TransactionResultType,
    /// Owning account
    pub account_id: Option<AccountId>,
    pub account_number: String,
    pub amount: Amount,
    /// Account balance after this row's effect
    pub balance_snapshot: Amount,
    /// Globally unique opaque token handed to callers
    pub transaction_id: String,
    pub transacted_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Build an unsaved ledger row against the account's current state
    ///
    /// The snapshot is the account's balance as passed in, so callers must
    /// apply any mutation before building the row.
    pub fn record(
        transaction_type: TransactionType,
        result_type: TransactionResultType,
        account: &Account,
        amount: Amount,
        transacted_at: DateTime<Utc>,
    ) -> Self {
        Transaction {
            id: None,
            transaction_type,
            result_type,
            account_id: account.id,
            account_number: account.account_number.clone(),
            amount,
            balance_snapshot: account.balance,
            transaction_id: new_transaction_id(),
            transacted_at,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Generate a fresh transaction id: a v4 UUID as 32 lowercase hex digits
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Caller-facing view of a ledger row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub result_type: TransactionResultType,
    pub amount: Amount,
    pub balance_snapshot: Amount,
    pub transaction_id: String,
    pub transacted_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        TransactionRecord {
            account_number: transaction.account_number.clone(),
            transaction_type: transaction.transaction_type,
            result_type: transaction.result_type,
            amount: transaction.amount,
            balance_snapshot: transaction.balance_snapshot,
            transaction_id: transaction.transaction_id.clone(),
            transacted_at: transaction.transacted_at,
        }
    }
}

/// Requests that name the account whose lock guards them
pub trait AccountLockKey {
    /// Account number used as the lock key
    fn lock_key(&self) -> &str;
}

/// Request to debit an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseBalanceRequest {
    pub user_id: UserId,
    pub account_number: String,
    pub amount: Amount,
}

impl AccountLockKey for UseBalanceRequest {
    fn lock_key(&self) -> &str {
        &self.account_number
    }
}

/// Request to reverse an earlier use in full
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelBalanceRequest {
    pub transaction_id: String,
    pub account_number: String,
    pub amount: Amount,
}

impl AccountLockKey for CancelBalanceRequest {
    fn lock_key(&self) -> &str {
        &self.account_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_are_unique_hex() {
        let first = new_transaction_id();
        let second = new_transaction_id();

        assert_ne!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_record_snapshots_current_balance() {
        let mut account = Account::new("1000000000", 1, 9_800, Utc::now());
        account.id = Some(4);

        let row = Transaction::record(
            TransactionType::Use,
            TransactionResultType::Success,
            &account,
            200,
            Utc::now(),
        );

        assert_eq!(row.account_id, Some(4));
        assert_eq!(row.account_number, "1000000000");
        assert_eq!(row.balance_snapshot, 9_800);
        assert_eq!(row.amount, 200);
        assert_eq!(row.id, None);
    }

    #[test]
    fn test_requests_lock_on_account_number() {
        let use_request = UseBalanceRequest {
            user_id: 1,
            account_number: "1234567890".to_string(),
            amount: 1_000,
        };
        let cancel_request = CancelBalanceRequest {
            transaction_id: "abc".to_string(),
            account_number: "1234567890".to_string(),
            amount: 1_000,
        };

        assert_eq!(use_request.lock_key(), "1234567890");
        assert_eq!(cancel_request.lock_key(), "1234567890");
    }
}
