//! Core business logic module
//!
//! This module contains the banking components:
//! - `account_service` - Opening, closing and looking up accounts
//! - `transaction_service` - Balance use, cancellation and the ledger
//! - `lock_manager` - Per-account mutual exclusion
//! - `engine` - Lock-guarded facade with failure-ledger writes
//! - `processor` - Request replay with account-based partitioning

pub mod account_service;
pub mod engine;
pub mod lock_manager;
pub mod processor;
pub mod transaction_service;

pub use account_service::AccountService;
pub use engine::BankingEngine;
pub use lock_manager::{AccountLockGuard, LockManager};
pub use processor::{Outcome, ProcessingResult, RequestProcessor};
pub use transaction_service::TransactionService;
