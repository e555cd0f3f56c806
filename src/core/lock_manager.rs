//! Per-account mutual exclusion
//!
//! The `LockManager` hands out one exclusive handle per account number. A
//! mutating operation acquires the handle for its account, runs, and releases
//! it when the [`AccountLockGuard`] is dropped, so release happens exactly once
//! on every exit path, early returns and panics included.
//!
//! # Design
//!
//! ```text
//! LockManager
//!     ├── Arc<DashMap<String, Arc<tokio::sync::Mutex<()>>>>  (one handle per key)
//!     └── Option<Duration>                                   (bounded wait)
//! ```
//!
//! The handle is cloned out of the map before waiting on it, so no `DashMap`
//! shard lock is ever held across an `.await`. Handles are created on first
//! use. A handle is evicted once nobody holds or waits on it: the map's own
//! `Arc` is then the only one left, and `remove_if` checks that under the
//! shard lock that `handle` also needs to clone it.

use crate::types::BankError;
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Handles = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive handles keyed by account number
#[derive(Debug)]
pub struct LockManager {
    locks: Arc<Handles>,
    /// `None` waits until the handle is free
    wait: Option<Duration>,
}

impl LockManager {
    /// Create a lock manager
    ///
    /// # Arguments
    ///
    /// * `wait` - Longest time `acquire` waits for a busy account, or `None`
    ///   to wait indefinitely
    pub fn new(wait: Option<Duration>) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            wait,
        }
    }

    fn handle(&self, account_number: &str) -> Arc<Mutex<()>> {
        // Fast path avoids allocating the key for accounts seen before
        if let Some(handle) = self.locks.get(account_number) {
            return Arc::clone(handle.value());
        }
        Arc::clone(
            self.locks
                .entry(account_number.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Acquire the exclusive handle for an account
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` if a bounded wait is configured and the handle
    /// stays busy for longer than that.
    pub async fn acquire(&self, account_number: &str) -> Result<AccountLockGuard, BankError> {
        let handle = self.handle(account_number);

        let guard = match self.wait {
            Some(wait) => match tokio::time::timeout(wait, handle.lock_owned()).await {
                Ok(guard) => guard,
                Err(_) => {
                    warn!(
                        "Timed out after {:?} waiting for lock on account {}",
                        wait, account_number
                    );
                    evict_idle(&self.locks, account_number);
                    return Err(BankError::lock_timeout(account_number));
                }
            },
            None => handle.lock_owned().await,
        };

        debug!("Acquired lock for account {}", account_number);
        Ok(AccountLockGuard {
            account_number: account_number.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        })
    }

    /// Run `op` while holding the account's handle
    ///
    /// The handle is released before this returns, whether `op` succeeded or
    /// not, and `op`'s result is passed through unchanged.
    pub async fn with_lock<T, F>(&self, account_number: &str, op: F) -> Result<T, BankError>
    where
        F: FnOnce() -> Result<T, BankError>,
    {
        let _guard = self.acquire(account_number).await?;
        op()
    }

    /// Whether the account's handle is currently held
    pub fn is_locked(&self, account_number: &str) -> bool {
        self.locks
            .get(account_number)
            .map(|handle| handle.value().try_lock().is_err())
            .unwrap_or(false)
    }
}

/// Drop the handle for `account_number` if the map holds the only reference
fn evict_idle(locks: &Handles, account_number: &str) {
    if locks
        .remove_if(account_number, |_, handle| Arc::strong_count(handle) == 1)
        .is_some()
    {
        debug!("Evicted idle lock for account {}", account_number);
    }
}

/// Proof of holding an account's handle; releases it on drop
#[derive(Debug)]
pub struct AccountLockGuard {
    account_number: String,
    /// Taken on drop so the handle is released before eviction is checked
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Handles>,
}

impl AccountLockGuard {
    pub fn account_number(&self) -> &str {
        &self.account_number
    }
}

impl Drop for AccountLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        debug!("Released lock for account {}", self.account_number);
        evict_idle(&self.locks, &self.account_number);
    }
}
