//! Balance use and cancellation
//!
//! The `TransactionService` applies balance changes and appends one ledger
//! row per attempt. It assumes its caller holds the account lock for the
//! duration of a mutating call (see [`LockManager`](crate::core::LockManager));
//! on its own it does nothing to stop two calls from reading the same balance.
//!
//! # Ledger snapshots
//!
//! A successful row records the balance after the change. A failure row
//! records the current, unchanged balance.

use crate::config::AccountPolicy;
use crate::repository::{AccountRepository, AccountUserRepository, TransactionRepository};
use crate::types::{
    Account, AccountUser, Amount, BankError, Transaction, TransactionRecord,
    TransactionResultType, TransactionType, UserId,
};
use chrono::{DateTime, Months, Utc};
use log::{debug, info};
use std::sync::Arc;

/// Balance use/cancel service
#[derive(Clone)]
pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
    account_users: Arc<dyn AccountUserRepository>,
    accounts: Arc<dyn AccountRepository>,
    policy: AccountPolicy,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        account_users: Arc<dyn AccountUserRepository>,
        accounts: Arc<dyn AccountRepository>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            transactions,
            account_users,
            accounts,
            policy,
        }
    }

    /// Debit an account and record a successful use
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `AccountNotFound`, then `OwnershipMismatch`,
    /// `AlreadyUnregistered` and `InsufficientBalance` in that order. No
    /// ledger row is written on error.
    pub fn use_balance(
        &self,
        user_id: UserId,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionRecord, BankError> {
        let user = self
            .account_users
            .find_by_id(user_id)?
            .ok_or_else(|| BankError::user_not_found(user_id))?;
        let mut account = self.get_account(account_number)?;

        validate_use_balance(&user, &account, amount)?;

        account.use_balance(amount)?;
        let account = self.accounts.save(account)?;

        let transaction = self.save_and_get_transaction(
            TransactionType::Use,
            TransactionResultType::Success,
            &account,
            amount,
        )?;
        info!(
            "Used {} on account {}, balance now {}",
            amount, account.account_number, account.balance
        );
        Ok(TransactionRecord::from(&transaction))
    }

    /// Record a failed use without touching the balance
    ///
    /// Not validated: the caller has already decided the use failed and only
    /// needs the ledger trail.
    pub fn save_failed_use_transaction(
        &self,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionRecord, BankError> {
        let account = self.get_account(account_number)?;
        let transaction = self.save_and_get_transaction(
            TransactionType::Use,
            TransactionResultType::Fail,
            &account,
            amount,
        )?;
        Ok(TransactionRecord::from(&transaction))
    }

    /// Reverse an earlier use in full and record the cancellation
    ///
    /// # Errors
    ///
    /// `TransactionNotFound`, `AccountNotFound`, then
    /// `TransactionAccountMismatch`, `PartialCancelNotAllowed`,
    /// `CancelWindowExpired`, `InvalidArgument` (the original row is not a
    /// successful use) and `AlreadyUnregistered` in that order.
    pub fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionRecord, BankError> {
        let original = self
            .transactions
            .find_by_transaction_id(transaction_id)?
            .ok_or_else(|| BankError::transaction_not_found(transaction_id))?;
        let mut account = self.get_account(account_number)?;

        self.validate_cancel_balance(&original, &account, amount, Utc::now())?;

        account.cancel_balance(amount)?;
        let account = self.accounts.save(account)?;

        let transaction = self.save_and_get_transaction(
            TransactionType::Cancel,
            TransactionResultType::Success,
            &account,
            amount,
        )?;
        info!(
            "Cancelled {} of transaction {} on account {}, balance now {}",
            amount, transaction_id, account.account_number, account.balance
        );
        Ok(TransactionRecord::from(&transaction))
    }

    fn validate_cancel_balance(
        &self,
        original: &Transaction,
        account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), BankError> {
        if original.account_id != account.id {
            return Err(BankError::transaction_account_mismatch(
                &original.transaction_id,
                &account.account_number,
            ));
        }
        if original.amount != amount {
            return Err(BankError::partial_cancel_not_allowed(
                &original.transaction_id,
                original.amount,
                amount,
            ));
        }
        let cutoff = now.checked_sub_months(Months::new(self.policy.cancel_window_months));
        if cutoff.is_some_and(|cutoff| original.transacted_at < cutoff) {
            return Err(BankError::cancel_window_expired(&original.transaction_id));
        }
        if original.transaction_type != TransactionType::Use
            || original.result_type != TransactionResultType::Success
        {
            return Err(BankError::invalid_argument(format!(
                "transaction {} is not a successful use",
                original.transaction_id
            )));
        }
        if !account.is_in_use() {
            return Err(BankError::already_unregistered(&account.account_number));
        }
        Ok(())
    }

    /// Record a failed cancellation without touching the balance
    pub fn save_failed_cancel_transaction(
        &self,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionRecord, BankError> {
        let account = self.get_account(account_number)?;
        let transaction = self.save_and_get_transaction(
            TransactionType::Cancel,
            TransactionResultType::Fail,
            &account,
            amount,
        )?;
        Ok(TransactionRecord::from(&transaction))
    }

    /// Look up a ledger row
    pub fn query_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, BankError> {
        self.transactions
            .find_by_transaction_id(transaction_id)?
            .map(|transaction| TransactionRecord::from(&transaction))
            .ok_or_else(|| BankError::transaction_not_found(transaction_id))
    }

    fn get_account(&self, account_number: &str) -> Result<Account, BankError> {
        self.accounts
            .find_by_account_number(account_number)?
            .ok_or_else(|| BankError::account_not_found(account_number))
    }

    fn save_and_get_transaction(
        &self,
        transaction_type: TransactionType,
        result_type: TransactionResultType,
        account: &Account,
        amount: Amount,
    ) -> Result<Transaction, BankError> {
        let transaction = self.transactions.save(Transaction::record(
            transaction_type,
            result_type,
            account,
            amount,
            Utc::now(),
        ))?;
        debug!(
            "Recorded {} {} of {} on account {} as {}",
            transaction_type.as_str(),
            result_type.as_str(),
            amount,
            account.account_number,
            transaction.transaction_id
        );
        Ok(transaction)
    }
}

fn validate_use_balance(
    user: &AccountUser,
    account: &Account,
    amount: Amount,
) -> Result<(), BankError> {
    if account.owner != user.id {
        return Err(BankError::ownership_mismatch(
            user.id,
            &account.account_number,
        ));
    }
    if !account.is_in_use() {
        return Err(BankError::already_unregistered(&account.account_number));
    }
    if account.balance < amount {
        return Err(BankError::insufficient_balance(
            &account.account_number,
            account.balance,
            amount,
        ));
    }
    Ok(())
}
