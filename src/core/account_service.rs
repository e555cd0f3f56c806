//! Account lifecycle
//!
//! The `AccountService` opens, closes and looks up accounts. It is
//! synchronous and holds no locks of its own: callers that need creation to
//! be serialized (so two concurrent requests cannot pick the same account
//! number) go through the [`BankingEngine`](crate::core::BankingEngine).
//!
//! # Rules
//!
//! Opening an account:
//! - the user must exist
//! - the user must own fewer than `max_accounts_per_user` accounts
//! - the new number is the latest account's number plus one, or
//!   `first_account_number` for the very first account
//!
//! Closing an account (checked in this order):
//! - the user and the account must exist
//! - the account must belong to the user
//! - the account must not already be closed
//! - the balance must be zero

use crate::config::AccountPolicy;
use crate::repository::{AccountRepository, AccountUserRepository};
use crate::types::{
    Account, AccountId, AccountInfo, AccountRecord, AccountUser, Amount, BankError, UserId,
};
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

/// Account lifecycle service
#[derive(Clone)]
pub struct AccountService {
    account_users: Arc<dyn AccountUserRepository>,
    accounts: Arc<dyn AccountRepository>,
    policy: AccountPolicy,
}

impl AccountService {
    pub fn new(
        account_users: Arc<dyn AccountUserRepository>,
        accounts: Arc<dyn AccountRepository>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            account_users,
            accounts,
            policy,
        }
    }

    /// Open a new account for a user
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user does not exist
    /// - `MaxAccountsPerUser` if the user is at the account cap
    /// - `Persistence` if the latest stored account number is not numeric
    pub fn create_account(
        &self,
        user_id: UserId,
        initial_balance: Amount,
    ) -> Result<AccountRecord, BankError> {
        let user = self.get_account_user(user_id)?;

        self.validate_create_account(&user)?;

        let account_number = self.next_account_number()?;
        let account = self.accounts.save(Account::new(
            account_number,
            user.id,
            initial_balance,
            Utc::now(),
        ))?;

        info!(
            "Opened account {} for user {} with balance {}",
            account.account_number, user.id, account.balance
        );
        Ok(AccountRecord::from(&account))
    }

    fn validate_create_account(&self, user: &AccountUser) -> Result<(), BankError> {
        let limit = self.policy.max_accounts_per_user;
        if self.accounts.count_by_user(user.id)? >= limit {
            return Err(BankError::max_accounts_per_user(user.id, limit));
        }
        Ok(())
    }

    fn next_account_number(&self) -> Result<String, BankError> {
        let next = match self.accounts.find_latest()? {
            Some(latest) => latest
                .account_number
                .parse::<u64>()
                .ok()
                .and_then(|number| number.checked_add(1))
                .ok_or_else(|| {
                    BankError::persistence(format!(
                        "stored account number '{}' cannot be incremented",
                        latest.account_number
                    ))
                })?,
            None => self.policy.first_account_number,
        };
        Ok(next.to_string())
    }

    /// Close an account
    ///
    /// Closure is a soft state change: the account stays stored with status
    /// `Unregistered` and its closing time.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `AccountNotFound`, `OwnershipMismatch`,
    /// `AlreadyUnregistered` or `BalanceNotEmpty`, checked in that order.
    pub fn delete_account(
        &self,
        user_id: UserId,
        account_number: &str,
    ) -> Result<AccountRecord, BankError> {
        let user = self.get_account_user(user_id)?;
        let mut account = self
            .accounts
            .find_by_account_number(account_number)?
            .ok_or_else(|| BankError::account_not_found(account_number))?;

        validate_delete_account(&user, &account)?;

        account.unregister(Utc::now());
        let account = self.accounts.save(account)?;

        info!("Closed account {} of user {}", account.account_number, user.id);
        Ok(AccountRecord::from(&account))
    }

    /// List the number and balance of every account a user owns
    pub fn get_accounts_by_user(&self, user_id: UserId) -> Result<Vec<AccountInfo>, BankError> {
        let user = self.get_account_user(user_id)?;
        let accounts = self.accounts.find_by_user(user.id)?;
        debug!("User {} owns {} accounts", user.id, accounts.len());
        Ok(accounts.iter().map(AccountInfo::from).collect())
    }

    /// Look up an account by surrogate id
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `id` is negative
    /// - `AccountNotFound` if no account has this id
    pub fn get_account(&self, id: AccountId) -> Result<AccountRecord, BankError> {
        if id < 0 {
            return Err(BankError::invalid_argument(format!(
                "account id must not be negative, got {}",
                id
            )));
        }
        self.accounts
            .find_by_id(id)?
            .map(|account| AccountRecord::from(&account))
            .ok_or_else(|| BankError::account_id_not_found(id))
    }

    fn get_account_user(&self, user_id: UserId) -> Result<AccountUser, BankError> {
        self.account_users
            .find_by_id(user_id)?
            .ok_or_else(|| BankError::user_not_found(user_id))
    }
}

fn validate_delete_account(user: &AccountUser, account: &Account) -> Result<(), BankError> {
    if account.owner != user.id {
        return Err(BankError::ownership_mismatch(
            user.id,
            &account.account_number,
        ));
    }
    if !account.is_in_use() {
        return Err(BankError::already_unregistered(&account.account_number));
    }
    if account.balance > 0 {
        return Err(BankError::balance_not_empty(
            &account.account_number,
            account.balance,
        ));
    }
    Ok(())
}
