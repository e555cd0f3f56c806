//! Error types for the bank account service
//!
//! This module defines every error the services, the lock manager and the
//! replay pipeline can produce.
//!
//! # Error Categories
//!
//! - **Domain Errors**: rule violations detected by the account and
//!   transaction services (missing user, ownership mismatch, insufficient
//!   balance, ...). They are never retried.
//! - **Lock Errors**: the bounded wait for an account lock expired. This is
//!   the only transient kind and callers may retry it.
//! - **Infrastructure Errors**: persistence, configuration and I/O failures.
//!   They are fatal and are never mapped onto a domain kind.

use crate::types::account::{AccountId, Amount, UserId};
use thiserror::Error;

/// Main error type for the bank account service
///
/// Each variant carries enough context to diagnose the failing request
/// without consulting the repository again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// No account user exists with the requested id
    #[error("User {user_id} not found")]
    UserNotFound {
        /// The requested user id
        user_id: UserId,
    },

    /// No account exists with the requested number or id
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Account number, or `id=<n>` when looked up by surrogate id
        account: String,
    },

    /// No ledger row exists with the requested transaction id
    #[error("Transaction {transaction_id} not found")]
    TransactionNotFound {
        /// The requested transaction id
        transaction_id: String,
    },

    /// The account is owned by a different user than the requester
    #[error("Account {account_number} is not owned by user {user_id}")]
    OwnershipMismatch {
        /// Requesting user
        user_id: UserId,
        /// Target account
        account_number: String,
    },

    /// The original transaction belongs to a different account than the
    /// one named in the cancel request
    #[error("Transaction {transaction_id} does not belong to account {account_number}")]
    TransactionAccountMismatch {
        /// Original transaction
        transaction_id: String,
        /// Account named in the cancel request
        account_number: String,
    },

    /// The user already owns the maximum number of accounts
    #[error("User {user_id} already owns the maximum of {limit} accounts")]
    MaxAccountsPerUser {
        /// Owning user
        user_id: UserId,
        /// Configured per-user cap
        limit: usize,
    },

    /// The account has been closed and accepts no further changes
    #[error("Account {account_number} is already unregistered")]
    AlreadyUnregistered {
        /// The closed account
        account_number: String,
    },

    /// Closing an account requires a zero balance
    #[error("Account {account_number} still holds a balance of {balance}")]
    BalanceNotEmpty {
        /// Account being closed
        account_number: String,
        /// Remaining balance
        balance: Amount,
    },

    /// The use amount exceeds the current balance
    #[error(
        "Insufficient balance on account {account_number}: balance {balance}, requested {requested}"
    )]
    InsufficientBalance {
        /// Target account
        account_number: String,
        /// Current balance
        balance: Amount,
        /// Requested use amount
        requested: Amount,
    },

    /// Cancellation must reverse the full original amount
    #[error("Transaction {transaction_id} must be cancelled in full: original {original}, requested {requested}")]
    PartialCancelNotAllowed {
        /// Original transaction
        transaction_id: String,
        /// Amount of the original transaction
        original: Amount,
        /// Amount in the cancel request
        requested: Amount,
    },

    /// The original transaction is older than the cancellation window
    #[error("Transaction {transaction_id} is too old to cancel")]
    CancelWindowExpired {
        /// Original transaction
        transaction_id: String,
    },

    /// A request argument is outside its valid range
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument
        message: String,
    },

    /// A balance change would overflow the balance type
    #[error("Arithmetic overflow in {operation} on account {account_number}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Target account
        account_number: String,
    },

    /// The bounded wait for an account lock expired
    ///
    /// Transient: the account was busy with another mutation. Callers may retry.
    #[error("Account {account_number} is busy with another transaction")]
    LockTimeout {
        /// Lock key that could not be acquired
        account_number: String,
    },

    /// The repository failed or returned inconsistent data
    #[error("Persistence error: {message}")]
    Persistence {
        /// Description of the storage failure
        message: String,
    },

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// I/O error while reading requests or writing results
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },
}

impl From<std::io::Error> for BankError {
    fn from(error: std::io::Error) -> Self {
        BankError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for BankError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());
        BankError::Io {
            message: match line {
                Some(line) => format!("CSV error at line {}: {}", line, error),
                None => format!("CSV error: {}", error),
            },
        }
    }
}

impl BankError {
    /// Stable name of the error kind, used in replay output
    pub fn kind(&self) -> &'static str {
        match self {
            BankError::UserNotFound { .. } => "UserNotFound",
            BankError::AccountNotFound { .. } => "AccountNotFound",
            BankError::TransactionNotFound { .. } => "TransactionNotFound",
            BankError::OwnershipMismatch { .. } => "OwnershipMismatch",
            BankError::TransactionAccountMismatch { .. } => "TransactionAccountMismatch",
            BankError::MaxAccountsPerUser { .. } => "MaxAccountsPerUser",
            BankError::AlreadyUnregistered { .. } => "AlreadyUnregistered",
            BankError::BalanceNotEmpty { .. } => "BalanceNotEmpty",
            BankError::InsufficientBalance { .. } => "InsufficientBalance",
            BankError::PartialCancelNotAllowed { .. } => "PartialCancelNotAllowed",
            BankError::CancelWindowExpired { .. } => "CancelWindowExpired",
            BankError::InvalidArgument { .. } => "InvalidArgument",
            BankError::ArithmeticOverflow { .. } => "ArithmeticOverflow",
            BankError::LockTimeout { .. } => "LockTimeout",
            BankError::Persistence { .. } => "Persistence",
            BankError::Config { .. } => "Config",
            BankError::Io { .. } => "Io",
        }
    }

    /// Whether the error is a business-rule violation
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            BankError::LockTimeout { .. }
                | BankError::Persistence { .. }
                | BankError::Config { .. }
                | BankError::Io { .. }
        )
    }

    /// Whether a caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, BankError::LockTimeout { .. })
    }

    /// Create a UserNotFound error
    pub fn user_not_found(user_id: UserId) -> Self {
        BankError::UserNotFound { user_id }
    }

    /// Create an AccountNotFound error for an account number
    pub fn account_not_found(account_number: &str) -> Self {
        BankError::AccountNotFound {
            account: account_number.to_string(),
        }
    }

    /// Create an AccountNotFound error for a surrogate id lookup
    pub fn account_id_not_found(id: AccountId) -> Self {
        BankError::AccountNotFound {
            account: format!("id={}", id),
        }
    }

    /// Create a TransactionNotFound error
    pub fn transaction_not_found(transaction_id: &str) -> Self {
        BankError::TransactionNotFound {
            transaction_id: transaction_id.to_string(),
        }
    }

    /// Create an OwnershipMismatch error
    pub fn ownership_mismatch(user_id: UserId, account_number: &str) -> Self {
        BankError::OwnershipMismatch {
            user_id,
            account_number: account_number.to_string(),
        }
    }

    /// Create a TransactionAccountMismatch error
    pub fn transaction_account_mismatch(transaction_id: &str, account_number: &str) -> Self {
        BankError::TransactionAccountMismatch {
            transaction_id: transaction_id.to_string(),
            account_number: account_number.to_string(),
        }
    }

    /// Create a MaxAccountsPerUser error
    pub fn max_accounts_per_user(user_id: UserId, limit: usize) -> Self {
        BankError::MaxAccountsPerUser { user_id, limit }
    }

    /// Create an AlreadyUnregistered error
    pub fn already_unregistered(account_number: &str) -> Self {
        BankError::AlreadyUnregistered {
            account_number: account_number.to_string(),
        }
    }

    /// Create a BalanceNotEmpty error
    pub fn balance_not_empty(account_number: &str, balance: Amount) -> Self {
        BankError::BalanceNotEmpty {
            account_number: account_number.to_string(),
            balance,
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(account_number: &str, balance: Amount, requested: Amount) -> Self {
        BankError::InsufficientBalance {
            account_number: account_number.to_string(),
            balance,
            requested,
        }
    }

    /// Create a PartialCancelNotAllowed error
    pub fn partial_cancel_not_allowed(
        transaction_id: &str,
        original: Amount,
        requested: Amount,
    ) -> Self {
        BankError::PartialCancelNotAllowed {
            transaction_id: transaction_id.to_string(),
            original,
            requested,
        }
    }

    /// Create a CancelWindowExpired error
    pub fn cancel_window_expired(transaction_id: &str) -> Self {
        BankError::CancelWindowExpired {
            transaction_id: transaction_id.to_string(),
        }
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BankError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account_number: &str) -> Self {
        BankError::ArithmeticOverflow {
            operation: operation.to_string(),
            account_number: account_number.to_string(),
        }
    }

    /// Create a LockTimeout error
    pub fn lock_timeout(account_number: &str) -> Self {
        BankError::LockTimeout {
            account_number: account_number.to_string(),
        }
    }

    /// Create a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        BankError::Persistence {
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        BankError::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::user_not_found(BankError::user_not_found(12), "User 12 not found")]
    #[case::account_not_found(
        BankError::account_not_found("1000000012"),
        "Account 1000000012 not found"
    )]
    #[case::account_id_not_found(BankError::account_id_not_found(7), "Account id=7 not found")]
    #[case::ownership_mismatch(
        BankError::ownership_mismatch(12, "1000000012"),
        "Account 1000000012 is not owned by user 12"
    )]
    #[case::max_accounts(
        BankError::max_accounts_per_user(3, 10),
        "User 3 already owns the maximum of 10 accounts"
    )]
    #[case::insufficient_balance(
        BankError::insufficient_balance("1000000012", 100, 1000),
        "Insufficient balance on account 1000000012: balance 100, requested 1000"
    )]
    #[case::partial_cancel(
        BankError::partial_cancel_not_allowed("abc", 200, 100),
        "Transaction abc must be cancelled in full: original 200, requested 100"
    )]
    #[case::lock_timeout(
        BankError::lock_timeout("1000000000"),
        "Account 1000000000 is busy with another transaction"
    )]
    fn test_error_display(#[case] error: BankError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::domain(BankError::insufficient_balance("1", 0, 1), true, false)]
    #[case::expired(BankError::cancel_window_expired("abc"), true, false)]
    #[case::lock(BankError::lock_timeout("1"), false, true)]
    #[case::persistence(BankError::persistence("disk gone"), false, false)]
    fn test_error_classification(
        #[case] error: BankError,
        #[case] domain: bool,
        #[case] retryable: bool,
    ) {
        assert_eq!(error.is_domain(), domain);
        assert_eq!(error.is_retryable(), retryable);
    }

    #[test]
    fn test_kind_names_match_variants() {
        assert_eq!(BankError::user_not_found(1).kind(), "UserNotFound");
        assert_eq!(
            BankError::transaction_account_mismatch("t", "1").kind(),
            "TransactionAccountMismatch"
        );
        assert_eq!(BankError::balance_not_empty("1", 5).kind(), "BalanceNotEmpty");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: BankError = io_error.into();
        assert!(matches!(error, BankError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
        assert!(!error.is_domain());
    }
}
