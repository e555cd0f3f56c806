//! Service configuration
//!
//! Configuration is read from an optional TOML file. Every field has a
//! default, so an empty file (or no file) yields the standard policy:
//!
//! ```toml
//! [policy]
//! max_accounts_per_user = 10
//! first_account_number = 1000000000
//! cancel_window_months = 12
//!
//! [lock]
//! wait_ms = 1000
//! ```
//!
//! Setting `lock.wait_ms = 0` disables the bounded wait; lock acquisition then
//! waits until the account is free.

use crate::types::BankError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Business rules applied by the account and transaction services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountPolicy {
    /// Accounts a single user may own, closed accounts included
    pub max_accounts_per_user: usize,
    /// Number assigned to the very first account
    pub first_account_number: u64,
    /// Age after which a use can no longer be cancelled
    pub cancel_window_months: u32,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            max_accounts_per_user: 10,
            first_account_number: 1_000_000_000,
            cancel_window_months: 12,
        }
    }
}

/// Lock manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Bounded wait for an account lock in milliseconds, 0 for unbounded
    pub wait_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { wait_ms: 1000 }
    }
}

impl LockConfig {
    /// The bounded wait, or `None` when waits are unbounded
    pub fn wait(&self) -> Option<Duration> {
        (self.wait_ms > 0).then(|| Duration::from_millis(self.wait_ms))
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub policy: AccountPolicy,
    pub lock: LockConfig,
}

impl ServiceConfig {
    /// Parse a configuration from TOML text
    ///
    /// Out-of-range policy values are replaced by their defaults with a
    /// warning rather than rejected.
    pub fn from_toml(contents: &str) -> Result<Self, BankError> {
        let config: ServiceConfig = toml::from_str(contents)
            .map_err(|e| BankError::config(format!("Failed to parse TOML config: {}", e)))?;
        Ok(config.sanitized())
    }

    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, BankError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BankError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn sanitized(mut self) -> Self {
        let default = AccountPolicy::default();

        if self.policy.max_accounts_per_user == 0 {
            warn!(
                "Invalid max_accounts_per_user (0), using default ({})",
                default.max_accounts_per_user
            );
            self.policy.max_accounts_per_user = default.max_accounts_per_user;
        }

        if self.policy.cancel_window_months == 0 {
            warn!(
                "Invalid cancel_window_months (0), using default ({})",
                default.cancel_window_months
            );
            self.policy.cancel_window_months = default.cancel_window_months;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();

        assert_eq!(config.policy.max_accounts_per_user, 10);
        assert_eq!(config.policy.first_account_number, 1_000_000_000);
        assert_eq!(config.policy.cancel_window_months, 12);
        assert_eq!(config.lock.wait(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = ServiceConfig::from_toml("").unwrap();

        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        let config = ServiceConfig::from_toml("[policy]\nmax_accounts_per_user = 3\n").unwrap();

        assert_eq!(config.policy.max_accounts_per_user, 3);
        assert_eq!(config.policy.first_account_number, 1_000_000_000);
        assert_eq!(config.lock, LockConfig::default());
    }

    #[test]
    fn test_zero_wait_disables_bound() {
        let config = ServiceConfig::from_toml("[lock]\nwait_ms = 0\n").unwrap();

        assert_eq!(config.lock.wait(), None);
    }

    #[test]
    fn test_zero_policy_values_fall_back_to_defaults() {
        let config = ServiceConfig::from_toml(
            "[policy]\nmax_accounts_per_user = 0\ncancel_window_months = 0\n",
        )
        .unwrap();

        assert_eq!(config.policy, AccountPolicy::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = ServiceConfig::from_toml("[policy\n");

        assert!(matches!(result, Err(BankError::Config { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(b"[lock]\nwait_ms = 250\n")
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");

        let config = ServiceConfig::load(file.path()).unwrap();

        assert_eq!(config.lock.wait(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServiceConfig::load(Path::new("does-not-exist.toml"));

        assert!(matches!(result, Err(BankError::Config { .. })));
    }
}
