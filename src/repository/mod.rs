//! Repository abstractions for account users, accounts and ledger rows
//!
//! The services only talk to storage through these traits. Implementations
//! must behave like durable, consistent storage with at least
//! read-your-writes semantics within one operation, and must report storage
//! failures as [`BankError::Persistence`] rather than as a domain error.
//!
//! Saving an entity whose id is `None` inserts it: the repository assigns the
//! id and sets both `created_at` and `updated_at`. Saving an entity with an id
//! updates it and refreshes `updated_at`.

pub mod memory;

use crate::types::{Account, AccountId, AccountUser, BankError, Transaction, UserId};

pub use memory::{MemoryAccountRepository, MemoryAccountUserRepository, MemoryTransactionRepository};

/// Storage for account users
pub trait AccountUserRepository: Send + Sync {
    /// Find a user by id
    fn find_by_id(&self, id: UserId) -> Result<Option<AccountUser>, BankError>;

    /// Insert or update a user
    fn save(&self, user: AccountUser) -> Result<AccountUser, BankError>;
}

/// Storage for accounts
pub trait AccountRepository: Send + Sync {
    /// Find an account by surrogate id
    fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, BankError>;

    /// Find an account by its exact account number
    fn find_by_account_number(&self, account_number: &str) -> Result<Option<Account>, BankError>;

    /// The most recently inserted account, if any
    fn find_latest(&self) -> Result<Option<Account>, BankError>;

    /// Number of accounts owned by a user, closed ones included
    fn count_by_user(&self, user_id: UserId) -> Result<usize, BankError>;

    /// All accounts owned by a user
    fn find_by_user(&self, user_id: UserId) -> Result<Vec<Account>, BankError>;

    /// Insert or update an account
    fn save(&self, account: Account) -> Result<Account, BankError>;
}

/// Append-only storage for ledger rows
pub trait TransactionRepository: Send + Sync {
    /// Find a ledger row by its transaction id
    fn find_by_transaction_id(&self, transaction_id: &str)
        -> Result<Option<Transaction>, BankError>;

    /// Append a ledger row
    fn save(&self, transaction: Transaction) -> Result<Transaction, BankError>;
}
