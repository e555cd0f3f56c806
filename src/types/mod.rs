//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account users, accounts and their projections
//! - `transaction`: Ledger rows, their projection and balance requests
//! - `request`: Replay requests read from request files
//! - `error`: Error types for the bank account service

pub mod account;
pub mod error;
pub mod request;
pub mod transaction;

pub use account::{
    Account, AccountId, AccountInfo, AccountRecord, AccountStatus, AccountUser, Amount, UserId,
};
pub use error::BankError;
pub use request::{BankRequest, RequestSeq, SequencedRequest, TransactionRef};
pub use transaction::{
    AccountLockKey, CancelBalanceRequest, Transaction, TransactionRecord, TransactionResultType,
    TransactionType, UseBalanceRequest,
};
