use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::providers::{BalanceSource, BalanceSourceError};

/// A balance source replaying a fixed list of responses. Once the list is
/// exhausted it keeps returning the last response.
#[derive(Default)]
pub struct ScriptedBalanceSource {
    responses: Mutex<VecDeque<HashMap<String, f64>>>,
    last: Mutex<HashMap<String, f64>>,
}

impl ScriptedBalanceSource {
    /// Creates a source replaying `responses` in order.
    pub fn new(responses: Vec<HashMap<String, f64>>) -> Self {
        Self { responses: Mutex::new(responses.into()), last: Mutex::new(HashMap::new()) }
    }

    /// Creates a source that always reports the same balance for one account.
    pub fn constant(account_id: &str, balance: f64) -> Self {
        Self::new(vec![HashMap::from([(account_id.to_string(), balance)])])
    }
}

#[async_trait]
impl BalanceSource for ScriptedBalanceSource {
    async fn fetch_balances(
        &self,
        account_ids: &[String],
    ) -> Result<HashMap<String, f64>, BalanceSourceError> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last
            .iter()
            .filter(|(id, _)| account_ids.contains(*id))
            .map(|(id, balance)| (id.clone(), *balance))
            .collect())
    }
}
