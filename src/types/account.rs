//! Account-related types for the bank account service
//!
//! This module defines account users, accounts and the projections the
//! services hand back to callers.

use super::error::BankError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account user identifier
pub type UserId = i64;

/// Surrogate account identifier assigned by the repository
pub type AccountId = i64;

/// Monetary amount in minor currency units
pub type Amount = u64;

/// Account user
///
/// Users are created outside the account core and never change once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: UserId,
    pub name: String,
    /// Set by the repository on first save
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the repository on every save
    pub updated_at: Option<DateTime<Utc>>,
}

impl AccountUser {
    /// Create an unsaved user
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        AccountUser {
            id,
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Lifecycle status of an account
///
/// `InUse` moves to `Unregistered` exactly once; the reverse never happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    InUse,
    Unregistered,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::InUse => "in_use",
            AccountStatus::Unregistered => "unregistered",
        }
    }
}

/// Balance-holding account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Surrogate id, `None` until the repository stores the account
    pub id: Option<AccountId>,

    /// Unique numeric account number, e.g. `"1000000000"`
    pub account_number: String,

    /// Owning user, fixed at creation
    pub owner: UserId,

    pub status: AccountStatus,

    /// Current balance in minor units
    ///
    /// Unsigned, so a negative balance is unrepresentable. Mutations go
    /// through [`Account::use_balance`] and [`Account::cancel_balance`].
    pub balance: Amount,

    pub registered_at: DateTime<Utc>,

    /// Set only when the account is closed
    pub unregistered_at: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create an unsaved, in-use account
    pub fn new(
        account_number: impl Into<String>,
        owner: UserId,
        balance: Amount,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Account {
            id: None,
            account_number: account_number.into(),
            owner,
            status: AccountStatus::InUse,
            balance,
            registered_at,
            unregistered_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_in_use(&self) -> bool {
        self.status == AccountStatus::InUse
    }

    /// Debit the balance
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if `amount` exceeds the balance. The
    /// balance is left untouched on error.
    pub fn use_balance(&mut self, amount: Amount) -> Result<(), BankError> {
        self.balance = self.balance.checked_sub(amount).ok_or_else(|| {
            BankError::insufficient_balance(&self.account_number, self.balance, amount)
        })?;
        Ok(())
    }

    /// Credit the balance with a cancelled amount
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the new balance does not fit.
    pub fn cancel_balance(&mut self, amount: Amount) -> Result<(), BankError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("cancel", &self.account_number))?;
        Ok(())
    }

    /// Close the account
    pub fn unregister(&mut self, at: DateTime<Utc>) {
        self.status = AccountStatus::Unregistered;
        self.unregistered_at = Some(at);
    }
}

/// Caller-facing view of an account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub user_id: UserId,
    pub account_number: String,
    pub balance: Amount,
    pub status: AccountStatus,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        AccountRecord {
            user_id: account.owner,
            account_number: account.account_number.clone(),
            balance: account.balance,
            status: account.status,
            registered_at: account.registered_at,
            unregistered_at: account.unregistered_at,
        }
    }
}

/// Account number and balance, as listed per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub account_number: String,
    pub balance: Amount,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        AccountInfo {
            account_number: account.account_number.clone(),
            balance: account.balance,
        }
    }
}
