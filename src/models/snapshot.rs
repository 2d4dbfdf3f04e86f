use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// A batch of balances delivered by the balance feed.
///
/// Accounts missing from a snapshot are simply not updated that round.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceSnapshot {
    /// Balance per account id.
    pub balances: HashMap<String, f64>,
    /// When the feed produced the snapshot.
    pub observed_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Creates a snapshot observed now.
    pub fn new(balances: HashMap<String, f64>) -> Self {
        Self { balances, observed_at: Utc::now() }
    }

    /// Creates a snapshot holding a single balance.
    pub fn single(account_id: impl Into<String>, balance: f64) -> Self {
        Self::new(HashMap::from([(account_id.into(), balance)]))
    }
}
