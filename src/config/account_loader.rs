use std::{collections::HashSet, path::PathBuf};

use chrono::TimeDelta;
use thiserror::Error;

use super::{ConfigLoader, LoaderError};
use crate::models::{Account, AccountConfig};

/// Loads the monitored accounts and applies the configured defaults.
pub struct AccountLoader {
    loader: ConfigLoader,
    default_threshold: f64,
    default_repeat_interval_secs: u64,
}

/// Errors that can occur while loading the account list.
#[derive(Debug, Error)]
pub enum AccountConfigError {
    /// The accounts file could not be read or parsed.
    #[error("Failed to load accounts: {0}")]
    Loader(#[from] LoaderError),

    /// The file does not contain any account.
    #[error("No accounts configured")]
    Empty,

    /// An account has no identifier.
    #[error("Account at position {0} has an empty account_id")]
    MissingId(usize),

    /// The same identifier is used twice.
    #[error("Duplicate account_id '{0}'")]
    DuplicateId(String),

    /// The threshold is negative or not a number.
    #[error("Account '{account_id}' has an invalid threshold {threshold}")]
    InvalidThreshold {
        /// The offending account.
        account_id: String,
        /// The rejected value.
        threshold: f64,
    },

    /// The reminder cadence is zero or too large.
    #[error("Account '{account_id}' has an invalid repeat interval of {secs}s")]
    InvalidRepeatInterval {
        /// The offending account.
        account_id: String,
        /// The rejected value.
        secs: u64,
    },
}

impl AccountLoader {
    /// Creates a loader for the given file.
    pub fn new(path: PathBuf, default_threshold: f64, default_repeat_interval_secs: u64) -> Self {
        Self { loader: ConfigLoader::new(path), default_threshold, default_repeat_interval_secs }
    }

    /// Loads, completes and validates the account list.
    pub fn load(&self) -> Result<Vec<Account>, AccountConfigError> {
        let entries: Vec<AccountConfig> = self.loader.load("accounts")?;
        let accounts = self.resolve(entries)?;
        tracing::info!(
            path = %self.loader.path().display(),
            count = accounts.len(),
            "Accounts loaded."
        );
        Ok(accounts)
    }

    /// Applies defaults to raw entries and validates the result.
    pub fn resolve(&self, entries: Vec<AccountConfig>) -> Result<Vec<Account>, AccountConfigError> {
        if entries.is_empty() {
            return Err(AccountConfigError::Empty);
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let mut accounts = Vec::with_capacity(entries.len());

        for (position, entry) in entries.into_iter().enumerate() {
            let account_id = entry.account_id.trim().to_string();
            if account_id.is_empty() {
                return Err(AccountConfigError::MissingId(position));
            }
            if !seen.insert(account_id.clone()) {
                return Err(AccountConfigError::DuplicateId(account_id));
            }

            let threshold = entry.threshold.unwrap_or(self.default_threshold);
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(AccountConfigError::InvalidThreshold { account_id, threshold });
            }

            let secs = entry.repeat_interval_secs.unwrap_or(self.default_repeat_interval_secs);
            let representable =
                i64::try_from(secs).ok().and_then(TimeDelta::try_seconds).is_some();
            if secs == 0 || !representable {
                return Err(AccountConfigError::InvalidRepeatInterval { account_id, secs });
            }

            let display_name = entry
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| account_id.clone());

            accounts.push(Account::new(account_id, display_name, threshold, secs));
        }

        Ok(accounts)
    }
}
