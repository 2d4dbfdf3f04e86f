use crate::models::Account;

/// A builder for creating `Account` instances for testing.
pub struct AccountBuilder {
    account: Account,
}

impl AccountBuilder {
    /// Creates a builder for an account with threshold 10 and an hourly
    /// reminder.
    pub fn new(id: &str) -> Self {
        Self { account: Account::new(id, id, 10.0, 3600) }
    }

    /// Sets the display name.
    pub fn display_name(mut self, name: &str) -> Self {
        self.account.display_name = name.to_string();
        self
    }

    /// Sets the threshold.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.account.threshold = threshold;
        self
    }

    /// Sets the reminder cadence in seconds.
    pub fn repeat_interval_secs(mut self, secs: u64) -> Self {
        self.account.repeat_interval_secs = secs;
        self
    }

    /// Builds the account.
    pub fn build(self) -> Account {
        self.account
    }
}
