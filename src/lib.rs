//! Bank Account Service Library
//! # Overview
//!
//! This library manages user-owned bank accounts: opening and closing
//! accounts, debiting balances, and cancelling earlier debits. Every balance
//! change leaves an append-only ledger row, and mutating operations on one
//! account are serialized by a per-account lock.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (accounts, ledger rows, requests, errors)
//! - [`config`] - Business policy and lock settings
//! - [`repository`] - Storage traits and thread-safe in-memory storage
//! - [`core`] - Business logic components:
//!   - [`core::account_service`] - Opening, closing and looking up accounts
//!   - [`core::transaction_service`] - Balance use and cancellation
//!   - [`core::lock_manager`] - Per-account mutual exclusion
//!   - [`core::engine`] - Lock-guarded facade with failure-ledger writes
//!   - [`core::processor`] - Request replay with account partitioning
//! - [`io`] - CSV request parsing and result output
//! - [`strategy`] - Sequential and concurrent replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Rules
//!
//! - A user owns at most ten accounts, closed ones included
//! - An account can be closed only by its owner and only when its balance is zero
//! - A use needs a sufficient balance on an open account
//! - A cancel reverses a whole use, on the same account, within a year

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod repository;
pub mod strategy;
pub mod types;

pub use config::ServiceConfig;
pub use core::{AccountService, BankingEngine, LockManager, TransactionService};
pub use io::write_results_csv;
pub use types::{
    Account, AccountRecord, AccountUser, BankError, Transaction, TransactionRecord,
    TransactionType,
};
