//! Thread-safe in-memory repositories
//!
//! These repositories keep every entity in a `DashMap`, so different rows can
//! be read and written from many tasks at once while each single-row write is
//! atomic. Surrogate ids come from an atomic counter and start at 1, which
//! makes id order equal to insertion order.
//!
//! Multi-row atomicity is not provided: a service operation that saves an
//! account and then a ledger row relies on its caller (the lock manager) to
//! keep other writers away from the same account in between.

use crate::repository::{AccountRepository, AccountUserRepository, TransactionRepository};
use crate::types::{Account, AccountId, AccountUser, BankError, Transaction, UserId};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory account user storage
#[derive(Debug, Default)]
pub struct MemoryAccountUserRepository {
    users: DashMap<UserId, AccountUser>,
}

impl MemoryAccountUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountUserRepository for MemoryAccountUserRepository {
    fn find_by_id(&self, id: UserId) -> Result<Option<AccountUser>, BankError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    fn save(&self, mut user: AccountUser) -> Result<AccountUser, BankError> {
        let now = Utc::now();
        let mut entry = self.users.entry(user.id).or_insert_with(|| AccountUser {
            created_at: Some(now),
            ..user.clone()
        });
        user.created_at = entry.created_at.or(Some(now));
        user.updated_at = Some(now);
        *entry = user.clone();
        Ok(user)
    }
}

/// In-memory account storage
///
/// Account numbers are unique: inserting a second account with a number that
/// is already taken fails with a persistence error, the way a unique index
/// would.
#[derive(Debug, Default)]
pub struct MemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
    /// Account number to surrogate id
    by_number: DashMap<String, AccountId>,
    last_id: AtomicI64,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn insert(&self, mut account: Account) -> Result<Account, BankError> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;

        let mut claimed = false;
        self.by_number
            .entry(account.account_number.clone())
            .or_insert_with(|| {
                claimed = true;
                id
            });
        if !claimed {
            return Err(BankError::persistence(format!(
                "duplicate account number {}",
                account.account_number
            )));
        }

        let now = Utc::now();
        account.id = Some(id);
        account.created_at = Some(now);
        account.updated_at = Some(now);
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn update(&self, id: AccountId, mut account: Account) -> Result<Account, BankError> {
        let mut stored = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| BankError::persistence(format!("no stored account with id {}", id)))?;

        if stored.account_number != account.account_number || stored.owner != account.owner {
            return Err(BankError::persistence(format!(
                "account {} cannot change its number or owner",
                id
            )));
        }

        account.created_at = stored.created_at;
        account.updated_at = Some(Utc::now());
        *stored = account.clone();
        Ok(account)
    }
}

impl AccountRepository for MemoryAccountRepository {
    fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, BankError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    fn find_by_account_number(&self, account_number: &str) -> Result<Option<Account>, BankError> {
        let id = match self.by_number.get(account_number) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        self.find_by_id(id)
    }

    fn find_latest(&self) -> Result<Option<Account>, BankError> {
        Ok(self
            .accounts
            .iter()
            .max_by_key(|entry| *entry.key())
            .map(|entry| entry.value().clone()))
    }

    fn count_by_user(&self, user_id: UserId) -> Result<usize, BankError> {
        Ok(self
            .accounts
            .iter()
            .filter(|entry| entry.value().owner == user_id)
            .count())
    }

    fn find_by_user(&self, user_id: UserId) -> Result<Vec<Account>, BankError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().owner == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }

    fn save(&self, account: Account) -> Result<Account, BankError> {
        match account.id {
            None => self.insert(account),
            Some(id) => self.update(id, account),
        }
    }
}

/// In-memory ledger storage
///
/// Rows are keyed by transaction id. Saving a row that already has an id, or
/// reusing a transaction id, is rejected: the ledger is append-only.
#[derive(Debug, Default)]
pub struct MemoryTransactionRepository {
    transactions: DashMap<String, Transaction>,
    last_id: AtomicI64,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// All rows recorded against an account, oldest first
    pub fn find_by_account_number(&self, account_number: &str) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.value().account_number == account_number)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }
}

impl TransactionRepository for MemoryTransactionRepository {
    fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, BankError> {
        Ok(self
            .transactions
            .get(transaction_id)
            .map(|entry| entry.value().clone()))
    }

    fn save(&self, mut transaction: Transaction) -> Result<Transaction, BankError> {
        if let Some(id) = transaction.id {
            return Err(BankError::persistence(format!(
                "ledger row {} is append-only",
                id
            )));
        }

        let now = Utc::now();
        transaction.id = Some(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        transaction.created_at = Some(now);
        transaction.updated_at = Some(now);

        let mut claimed = false;
        self.transactions
            .entry(transaction.transaction_id.clone())
            .or_insert_with(|| {
                claimed = true;
                transaction.clone()
            });
        if !claimed {
            return Err(BankError::persistence(format!(
                "duplicate transaction id {}",
                transaction.transaction_id
            )));
        }

        Ok(transaction)
    }
}
