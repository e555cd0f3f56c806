//! Banking engine
//!
//! The `BankingEngine` is the entry point for callers. It puts the account
//! and transaction services behind the [`LockManager`] and keeps the failure
//! ledger:
//!
//! - creating an account is serialized on a dedicated lock key, so two
//!   concurrent creations can neither pick the same number nor push a user
//!   past the account cap
//! - closing an account, using a balance and cancelling a use each hold the
//!   account's lock for the whole validate-mutate-record sequence
//! - a use or cancel that fails with a domain error or a lock timeout leaves
//!   a `Fail` row on the ledger before the error is returned
//!
//! Lookups are not lock-guarded and may observe state from just before or
//! just after a concurrent mutation.
//!
//! # Architecture
//!
//! ```text
//! BankingEngine
//!     ├── AccountService      (open, close, look up)
//!     ├── TransactionService  (use, cancel, ledger)
//!     └── LockManager         (one handle per account number)
//! ```

use crate::config::ServiceConfig;
use crate::core::{AccountService, LockManager, TransactionService};
use crate::repository::{
    AccountRepository, AccountUserRepository, MemoryAccountRepository,
    MemoryAccountUserRepository, MemoryTransactionRepository, TransactionRepository,
};
use crate::types::{
    AccountId, AccountInfo, AccountLockKey, AccountRecord, AccountUser, Amount, BankError,
    CancelBalanceRequest, TransactionRecord, UseBalanceRequest, UserId,
};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Lock key serializing account creation
///
/// Account numbers are all digits, so this never collides with one.
const ACCOUNT_SEQUENCE_LOCK: &str = "__account_sequence__";

/// Lock-guarded facade over the account and transaction services
pub struct BankingEngine {
    account_users: Arc<dyn AccountUserRepository>,
    account_service: AccountService,
    transaction_service: TransactionService,
    locks: LockManager,
}

impl BankingEngine {
    /// Create an engine backed by empty in-memory repositories
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_repositories(
            config,
            Arc::new(MemoryAccountUserRepository::new()),
            Arc::new(MemoryAccountRepository::new()),
            Arc::new(MemoryTransactionRepository::new()),
        )
    }

    /// Create an engine over caller-supplied repositories
    pub fn with_repositories(
        config: &ServiceConfig,
        account_users: Arc<dyn AccountUserRepository>,
        accounts: Arc<dyn AccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        let account_service = AccountService::new(
            Arc::clone(&account_users),
            Arc::clone(&accounts),
            config.policy.clone(),
        );
        let transaction_service = TransactionService::new(
            transactions,
            Arc::clone(&account_users),
            accounts,
            config.policy.clone(),
        );
        Self {
            account_users,
            account_service,
            transaction_service,
            locks: LockManager::new(config.lock.wait()),
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    /// Store an account user, replacing any user with the same id
    pub fn register_user(&self, user_id: UserId, name: &str) -> Result<AccountUser, BankError> {
        let user = self.account_users.save(AccountUser::new(user_id, name))?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Open an account; see [`AccountService::create_account`]
    pub async fn create_account(
        &self,
        user_id: UserId,
        initial_balance: Amount,
    ) -> Result<AccountRecord, BankError> {
        self.locks
            .with_lock(ACCOUNT_SEQUENCE_LOCK, || {
                self.account_service.create_account(user_id, initial_balance)
            })
            .await
    }

    /// Close an account; see [`AccountService::delete_account`]
    pub async fn delete_account(
        &self,
        user_id: UserId,
        account_number: &str,
    ) -> Result<AccountRecord, BankError> {
        self.locks
            .with_lock(account_number, || {
                self.account_service.delete_account(user_id, account_number)
            })
            .await
    }

    /// Debit an account under its lock
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero amount (nothing is recorded), the
    /// service's domain errors, `LockTimeout`, or `Persistence`. Domain errors
    /// and lock timeouts are recorded as a failed use first.
    pub async fn use_balance(
        &self,
        request: &UseBalanceRequest,
    ) -> Result<TransactionRecord, BankError> {
        validate_amount(request.amount)?;

        let result = self
            .locks
            .with_lock(request.lock_key(), || {
                self.transaction_service
                    .use_balance(request.user_id, &request.account_number, request.amount)
                    .inspect_err(|e| {
                        if e.is_domain() {
                            self.record_failed_use(request, e);
                        }
                    })
            })
            .await;

        if let Err(e @ BankError::LockTimeout { .. }) = &result {
            self.record_failed_use(request, e);
        }
        result
    }

    /// Cancel a use under the account's lock
    ///
    /// Errors are handled like [`use_balance`](Self::use_balance), recorded
    /// as a failed cancel.
    pub async fn cancel_balance(
        &self,
        request: &CancelBalanceRequest,
    ) -> Result<TransactionRecord, BankError> {
        validate_amount(request.amount)?;

        let result = self
            .locks
            .with_lock(request.lock_key(), || {
                self.transaction_service
                    .cancel_balance(
                        &request.transaction_id,
                        &request.account_number,
                        request.amount,
                    )
                    .inspect_err(|e| {
                        if e.is_domain() {
                            self.record_failed_cancel(request, e);
                        }
                    })
            })
            .await;

        if let Err(e @ BankError::LockTimeout { .. }) = &result {
            self.record_failed_cancel(request, e);
        }
        result
    }

    pub fn query_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, BankError> {
        self.transaction_service.query_transaction(transaction_id)
    }

    pub fn get_accounts_by_user(&self, user_id: UserId) -> Result<Vec<AccountInfo>, BankError> {
        self.account_service.get_accounts_by_user(user_id)
    }

    pub fn get_account(&self, id: AccountId) -> Result<AccountRecord, BankError> {
        self.account_service.get_account(id)
    }

    fn record_failed_use(&self, request: &UseBalanceRequest, cause: &BankError) {
        warn!(
            "Use of {} on account {} failed: {}",
            request.amount, request.account_number, cause
        );
        if skip_failure_row(cause) {
            return;
        }
        if let Err(e) = self
            .transaction_service
            .save_failed_use_transaction(&request.account_number, request.amount)
        {
            report_unrecorded("use", &request.account_number, &e);
        }
    }

    fn record_failed_cancel(&self, request: &CancelBalanceRequest, cause: &BankError) {
        warn!(
            "Cancel of transaction {} on account {} failed: {}",
            request.transaction_id, request.account_number, cause
        );
        if skip_failure_row(cause) {
            return;
        }
        if let Err(e) = self
            .transaction_service
            .save_failed_cancel_transaction(&request.account_number, request.amount)
        {
            report_unrecorded("cancel", &request.account_number, &e);
        }
    }
}

/// A failure row needs an account to attach to
fn skip_failure_row(cause: &BankError) -> bool {
    if let BankError::AccountNotFound { account } = cause {
        debug!("No failure row for unknown account {}", account);
        return true;
    }
    false
}

fn report_unrecorded(op: &str, account_number: &str, e: &BankError) {
    match e {
        BankError::AccountNotFound { .. } => {
            debug!("No failure row for unknown account {}", account_number)
        }
        _ => error!(
            "Could not record failed {} on account {}: {}",
            op, account_number, e
        ),
    }
}

fn validate_amount(amount: Amount) -> Result<(), BankError> {
    if amount == 0 {
        return Err(BankError::invalid_argument("amount must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockConfig;
    use crate::types::{Account, TransactionResultType, TransactionType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        accounts: Arc<MemoryAccountRepository>,
        ledger: Arc<MemoryTransactionRepository>,
        engine: BankingEngine,
    }

    fn fixture_with(config: ServiceConfig) -> Fixture {
        let users = Arc::new(MemoryAccountUserRepository::new());
        let accounts = Arc::new(MemoryAccountRepository::new());
        let ledger = Arc::new(MemoryTransactionRepository::new());
        let engine =
            BankingEngine::with_repositories(&config, users, accounts.clone(), ledger.clone());
        engine.register_user(12, "Kevin").unwrap();
        engine.register_user(13, "Grace").unwrap();
        Fixture {
            accounts,
            ledger,
            engine,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ServiceConfig::default())
    }

    fn use_request(user_id: UserId, account_number: &str, amount: Amount) -> UseBalanceRequest {
        UseBalanceRequest {
            user_id,
            account_number: account_number.to_string(),
            amount,
        }
    }

    fn cancel_request(
        transaction_id: &str,
        account_number: &str,
        amount: Amount,
    ) -> CancelBalanceRequest {
        CancelBalanceRequest {
            transaction_id: transaction_id.to_string(),
            account_number: account_number.to_string(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_use_and_cancel_round_trip() {
        let f = fixture();
        let account = f.engine.create_account(12, 10_000).await.unwrap();

        let used = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 200))
            .await
            .unwrap();
        let cancelled = f
            .engine
            .cancel_balance(&cancel_request(
                &used.transaction_id,
                &account.account_number,
                200,
            ))
            .await
            .unwrap();

        assert_eq!(used.balance_snapshot, 9_800);
        assert_eq!(cancelled.balance_snapshot, 10_000);
        assert_eq!(f.ledger.len(), 2);
        assert!(!f.engine.lock_manager().is_locked(&account.account_number));
    }

    #[tokio::test]
    async fn test_failed_use_is_recorded() {
        let f = fixture();
        let account = f.engine.create_account(12, 100).await.unwrap();

        let result = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 1_000))
            .await;

        assert!(matches!(result, Err(BankError::InsufficientBalance { .. })));
        let rows = f.ledger.find_by_account_number(&account.account_number);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].transaction_type, TransactionType::Use);
        assert_eq!(rows[0].result_type, TransactionResultType::Fail);
        assert_eq!(rows[0].amount, 1_000);
        assert_eq!(rows[0].balance_snapshot, 100);
    }

    #[tokio::test]
    async fn test_failed_cancel_is_recorded() {
        let f = fixture();
        let account = f.engine.create_account(12, 10_000).await.unwrap();
        let used = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 200))
            .await
            .unwrap();

        let result = f
            .engine
            .cancel_balance(&cancel_request(
                &used.transaction_id,
                &account.account_number,
                100,
            ))
            .await;

        assert!(matches!(
            result,
            Err(BankError::PartialCancelNotAllowed { .. })
        ));
        let rows = f.ledger.find_by_account_number(&account.account_number);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].transaction_type, TransactionType::Cancel);
        assert_eq!(rows[1].result_type, TransactionResultType::Fail);
        assert_eq!(rows[1].balance_snapshot, 9_800);
    }

    /// Counts account-number lookups
    #[derive(Default)]
    struct CountingAccounts {
        inner: MemoryAccountRepository,
        lookups: AtomicUsize,
    }

    impl AccountRepository for CountingAccounts {
        fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, BankError> {
            self.inner.find_by_id(id)
        }

        fn find_by_account_number(&self, number: &str) -> Result<Option<Account>, BankError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_account_number(number)
        }

        fn find_latest(&self) -> Result<Option<Account>, BankError> {
            self.inner.find_latest()
        }

        fn count_by_user(&self, user_id: UserId) -> Result<usize, BankError> {
            self.inner.count_by_user(user_id)
        }

        fn find_by_user(&self, user_id: UserId) -> Result<Vec<Account>, BankError> {
            self.inner.find_by_user(user_id)
        }

        fn save(&self, account: Account) -> Result<Account, BankError> {
            self.inner.save(account)
        }
    }

    #[tokio::test]
    async fn test_unknown_account_skips_failure_row() {
        let accounts = Arc::new(CountingAccounts::default());
        let ledger = Arc::new(MemoryTransactionRepository::new());
        let engine = BankingEngine::with_repositories(
            &ServiceConfig::default(),
            Arc::new(MemoryAccountUserRepository::new()),
            accounts.clone(),
            ledger.clone(),
        );
        engine.register_user(12, "Kevin").unwrap();

        let used = engine
            .use_balance(&use_request(12, "1000000099", 200))
            .await;
        let used_lookups = accounts.lookups.load(Ordering::SeqCst);
        let cancelled = engine
            .cancel_balance(&cancel_request("tx", "1000000099", 200))
            .await;

        assert_eq!(used, Err(BankError::account_not_found("1000000099")));
        assert_eq!(used_lookups, 1);
        assert!(matches!(
            cancelled,
            Err(BankError::TransactionNotFound { .. })
        ));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected_before_locking() {
        let f = fixture();
        let account = f.engine.create_account(12, 100).await.unwrap();

        let used = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 0))
            .await;
        let cancelled = f
            .engine
            .cancel_balance(&cancel_request("tx", &account.account_number, 0))
            .await;

        assert!(matches!(used, Err(BankError::InvalidArgument { .. })));
        assert!(matches!(cancelled, Err(BankError::InvalidArgument { .. })));
        assert!(f.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_lock_timeout_is_recorded_as_failure() {
        let f = fixture_with(ServiceConfig {
            lock: LockConfig { wait_ms: 20 },
            ..ServiceConfig::default()
        });
        let account = f.engine.create_account(12, 10_000).await.unwrap();
        let _held = f
            .engine
            .lock_manager()
            .acquire(&account.account_number)
            .await
            .unwrap();

        let result = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 200))
            .await;

        assert_eq!(
            result,
            Err(BankError::lock_timeout(&account.account_number))
        );
        assert!(result.unwrap_err().is_retryable());
        let rows = f.ledger.find_by_account_number(&account.account_number);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result_type, TransactionResultType::Fail);
        assert_eq!(f.engine.get_account(1).unwrap().balance, 10_000);
    }

    #[tokio::test]
    async fn test_cancel_lock_timeout_is_recorded_as_failure() {
        let f = fixture_with(ServiceConfig {
            lock: LockConfig { wait_ms: 20 },
            ..ServiceConfig::default()
        });
        let account = f.engine.create_account(12, 10_000).await.unwrap();
        let used = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 200))
            .await
            .unwrap();
        let _held = f
            .engine
            .lock_manager()
            .acquire(&account.account_number)
            .await
            .unwrap();

        let result = f
            .engine
            .cancel_balance(&cancel_request(
                &used.transaction_id,
                &account.account_number,
                200,
            ))
            .await;

        assert_eq!(
            result,
            Err(BankError::lock_timeout(&account.account_number))
        );
        assert!(result.unwrap_err().is_retryable());
        let rows = f.ledger.find_by_account_number(&account.account_number);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].transaction_type, TransactionType::Cancel);
        assert_eq!(rows[1].result_type, TransactionResultType::Fail);
        assert_eq!(rows[1].balance_snapshot, 9_800);
        assert_eq!(f.engine.get_account(1).unwrap().balance, 9_800);
    }

    #[tokio::test]
    async fn test_delete_waits_for_account_lock() {
        let f = fixture_with(ServiceConfig {
            lock: LockConfig { wait_ms: 20 },
            ..ServiceConfig::default()
        });
        let account = f.engine.create_account(12, 0).await.unwrap();
        let held = f
            .engine
            .lock_manager()
            .acquire(&account.account_number)
            .await
            .unwrap();

        let blocked = f.engine.delete_account(12, &account.account_number).await;
        drop(held);
        let closed = f.engine.delete_account(12, &account.account_number).await;

        assert!(matches!(blocked, Err(BankError::LockTimeout { .. })));
        assert!(closed.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creation_allocates_distinct_numbers() {
        let f = fixture_with(ServiceConfig {
            lock: LockConfig { wait_ms: 0 },
            ..ServiceConfig::default()
        });
        let engine = Arc::new(f.engine);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let engine = Arc::clone(&engine);
            let user_id = if i % 2 == 0 { 12 } else { 13 };
            tasks.push(tokio::spawn(async move {
                engine.create_account(user_id, 0).await
            }));
        }
        let mut numbers = Vec::new();
        for task in tasks {
            numbers.push(task.await.unwrap().unwrap().account_number);
        }
        numbers.sort();
        numbers.dedup();

        assert_eq!(numbers.len(), 20);
        assert_eq!(f.accounts.len(), 20);
    }

    #[tokio::test]
    async fn test_lookups() {
        let f = fixture();
        let account = f.engine.create_account(12, 500).await.unwrap();
        let used = f
            .engine
            .use_balance(&use_request(12, &account.account_number, 200))
            .await
            .unwrap();

        assert_eq!(f.engine.query_transaction(&used.transaction_id), Ok(used));
        assert_eq!(
            f.engine.get_accounts_by_user(12).unwrap(),
            vec![AccountInfo {
                account_number: account.account_number.clone(),
                balance: 300
            }]
        );
        assert_eq!(f.engine.get_account(1).unwrap().balance, 300);
    }
}
