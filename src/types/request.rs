//! Replay request types
//!
//! A request file is a numbered list of [`BankRequest`]s. Cancel requests
//! may refer to a transaction produced earlier in the same file by its
//! request sequence number, since transaction ids are generated at runtime.

use super::account::{Amount, UserId};

/// Request sequence number, 1-based in input order
pub type RequestSeq = usize;

/// Reference to an existing ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRef {
    /// A transaction id as issued by the service
    Id(String),
    /// The transaction produced by the request with this sequence number
    Seq(RequestSeq),
}

/// One request of a replay file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankRequest {
    /// Seed an account user
    Register { user_id: UserId, name: String },
    /// Open an account with an initial balance
    Create {
        user_id: UserId,
        initial_balance: Amount,
    },
    /// Close an account
    Delete {
        user_id: UserId,
        account_number: String,
    },
    /// Debit an account
    Use {
        user_id: UserId,
        account_number: String,
        amount: Amount,
    },
    /// Reverse an earlier use in full
    Cancel {
        transaction: TransactionRef,
        account_number: String,
        amount: Amount,
    },
    /// Look up a ledger row
    Query { transaction: TransactionRef },
    /// List a user's accounts
    List { user_id: UserId },
}

impl BankRequest {
    /// Operation name as written in request and result files
    pub fn op(&self) -> &'static str {
        match self {
            BankRequest::Register { .. } => "register",
            BankRequest::Create { .. } => "create",
            BankRequest::Delete { .. } => "delete",
            BankRequest::Use { .. } => "use",
            BankRequest::Cancel { .. } => "cancel",
            BankRequest::Query { .. } => "query",
            BankRequest::List { .. } => "list",
        }
    }

    /// Account this request mutates, if it is account-keyed
    ///
    /// Requests with a key commute with requests on other accounts and can
    /// be processed concurrently with them.
    pub fn account_key(&self) -> Option<&str> {
        match self {
            BankRequest::Delete { account_number, .. }
            | BankRequest::Use { account_number, .. }
            | BankRequest::Cancel { account_number, .. } => Some(account_number),
            BankRequest::Register { .. }
            | BankRequest::Create { .. }
            | BankRequest::Query { .. }
            | BankRequest::List { .. } => None,
        }
    }
}

/// A request tagged with its position in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedRequest {
    pub seq: RequestSeq,
    pub request: BankRequest,
}
