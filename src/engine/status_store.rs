//! In-memory mirror of each account's last known status, backed by durable
//! storage.
//!
//! Transition detection only ever looks at the mirror. Storage is written on
//! every observation through the write-behind queue and never read back
//! after [`AccountStatusStore::load`].

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    models::{HealthStatus, StatusRecord},
    persistence::{StateWriter, error::PersistenceError, traits::AccountStatusRepository},
};

/// The outcome of [`AccountStatusStore::observe`].
#[derive(Debug)]
pub struct Observation {
    /// The mirrored status before this observation, `None` for an account
    /// without a record.
    pub previous: Option<HealthStatus>,
    /// The observed status.
    pub current: HealthStatus,
    /// Set when the write could not be enqueued. The mirror is updated
    /// regardless.
    pub write_error: Option<PersistenceError>,
}

impl Observation {
    /// Whether the status differs from the previous one. Accounts without a
    /// record count as `Resolved`.
    pub fn changed(&self) -> bool {
        self.previous.unwrap_or_default() != self.current
    }
}

/// Single source of truth for "did this account's status change".
pub struct AccountStatusStore {
    repository: Arc<dyn AccountStatusRepository>,
    writer: StateWriter,
    statuses: HashMap<String, HealthStatus>,
}

impl AccountStatusStore {
    /// Creates an empty store. [`load`](Self::load) must run before the first
    /// observation.
    pub fn new(repository: Arc<dyn AccountStatusRepository>, writer: StateWriter) -> Self {
        Self { repository, writer, statuses: HashMap::new() }
    }

    /// Populates the mirror from storage. Accounts without a record stay
    /// absent. Returns the number of records loaded.
    pub async fn load(&mut self, account_ids: &[String]) -> Result<usize, PersistenceError> {
        let records = self.repository.get_many(account_ids).await?;
        let count = records.len();
        for record in records {
            tracing::debug!(
                account_id = %record.account_id,
                status = %record.status,
                "Restored account status."
            );
            self.statuses.insert(record.account_id, record.status);
        }
        tracing::info!(requested = account_ids.len(), loaded = count, "Account statuses loaded.");
        Ok(count)
    }

    /// The mirrored status of an account, `None` if it has never been
    /// recorded.
    pub fn status(&self, account_id: &str) -> Option<HealthStatus> {
        self.statuses.get(account_id).copied()
    }

    /// Records an observed status and reports whether it changed.
    ///
    /// Storage is written on every call, an insert for an account without a
    /// record and an update otherwise. The mirror is updated even when the
    /// write cannot be enqueued.
    pub fn observe(
        &mut self,
        account_id: &str,
        status: HealthStatus,
        now: DateTime<Utc>,
    ) -> Observation {
        let previous = self.statuses.insert(account_id.to_string(), status);

        let write = match previous {
            None => self.writer.insert_status(StatusRecord::new(account_id, status, now)),
            Some(_) => self.writer.update_status(account_id, status, now),
        };
        let write_error = write.err();
        if let Some(e) = &write_error {
            tracing::error!(account_id, error = %e, "Failed to enqueue account status write.");
        }

        Observation { previous, current: status, write_error }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::persistence::traits::{MockAccountStatusRepository, MockNotificationRepository};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    /// Builds a store whose writer records what reaches the repository.
    fn recording_store(
        existing: Vec<StatusRecord>,
    ) -> (AccountStatusStore, StateWriter, Arc<Mutex<Vec<String>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));

        let mut loader = MockAccountStatusRepository::new();
        loader.expect_get_many().returning(move |_| Ok(existing.clone()));

        let mut backend = MockAccountStatusRepository::new();
        let inserts = writes.clone();
        backend.expect_insert().returning(move |r| {
            inserts.lock().unwrap().push(format!("insert {} {}", r.account_id, r.status));
            Ok(())
        });
        let updates = writes.clone();
        backend.expect_update().returning(move |id, status, _| {
            updates.lock().unwrap().push(format!("update {id} {status}"));
            Ok(())
        });

        let (writer, task) =
            StateWriter::new(Arc::new(backend), Arc::new(MockNotificationRepository::new()));
        tokio::spawn(task.run());

        let store = AccountStatusStore::new(Arc::new(loader), writer.clone());
        (store, writer, writes)
    }

    #[tokio::test]
    async fn test_unknown_account_is_absent_after_load() {
        let (mut store, _, _) = recording_store(vec![]);
        assert_eq!(store.load(&["a".to_string()]).await.unwrap(), 0);
        assert_eq!(store.status("a"), None);
    }

    #[tokio::test]
    async fn test_load_populates_mirror() {
        let (mut store, _, _) =
            recording_store(vec![StatusRecord::new("a", HealthStatus::Unhealthy, at(0))]);
        assert_eq!(store.load(&["a".to_string(), "b".to_string()]).await.unwrap(), 1);
        assert_eq!(store.status("a"), Some(HealthStatus::Unhealthy));
        assert_eq!(store.status("b"), None);
    }

    #[tokio::test]
    async fn test_same_status_twice_is_not_a_change() {
        let (mut store, _, _) = recording_store(vec![]);
        store.load(&[]).await.unwrap();

        assert!(store.observe("a", HealthStatus::Approaching, at(0)).changed());
        assert!(!store.observe("a", HealthStatus::Approaching, at(1)).changed());
        assert!(store.observe("a", HealthStatus::Unhealthy, at(2)).changed());
    }

    #[tokio::test]
    async fn test_never_seen_account_defaults_to_resolved() {
        let (mut store, _, _) = recording_store(vec![]);
        store.load(&[]).await.unwrap();

        let observation = store.observe("a", HealthStatus::Resolved, at(0));
        assert_eq!(observation.previous, None);
        assert!(!observation.changed());
        assert_eq!(store.status("a"), Some(HealthStatus::Resolved));
    }

    #[tokio::test]
    async fn test_loaded_status_is_compared_against() {
        let (mut store, _, _) =
            recording_store(vec![StatusRecord::new("a", HealthStatus::Unhealthy, at(0))]);
        store.load(&["a".to_string()]).await.unwrap();

        let observation = store.observe("a", HealthStatus::Unhealthy, at(10));
        assert_eq!(observation.previous, Some(HealthStatus::Unhealthy));
        assert!(!observation.changed());
    }

    #[tokio::test]
    async fn test_every_observation_is_persisted_as_upsert() {
        let (mut store, writer, writes) =
            recording_store(vec![StatusRecord::new("b", HealthStatus::Approaching, at(0))]);
        store.load(&["a".to_string(), "b".to_string()]).await.unwrap();

        store.observe("a", HealthStatus::Resolved, at(1));
        store.observe("a", HealthStatus::Resolved, at(2));
        store.observe("b", HealthStatus::Approaching, at(3));
        writer.flush().await.unwrap();

        assert_eq!(
            *writes.lock().unwrap(),
            vec!["insert a resolved", "update a resolved", "update b approaching"]
        );
    }

    #[tokio::test]
    async fn test_mirror_is_updated_when_writer_is_gone() {
        let mut loader = MockAccountStatusRepository::new();
        loader.expect_get_many().returning(|_| Ok(vec![]));
        let (writer, task) = StateWriter::new(
            Arc::new(MockAccountStatusRepository::new()),
            Arc::new(MockNotificationRepository::new()),
        );
        drop(task);
        let mut store = AccountStatusStore::new(Arc::new(loader), writer);

        let observation = store.observe("a", HealthStatus::Unhealthy, at(0));
        assert!(observation.changed());
        assert!(matches!(observation.write_error, Some(PersistenceError::WriterClosed)));
        assert_eq!(store.status("a"), Some(HealthStatus::Unhealthy));
        assert!(!store.observe("a", HealthStatus::Unhealthy, at(1)).changed());
    }

    #[tokio::test]
    async fn test_load_failure_is_returned() {
        let mut loader = MockAccountStatusRepository::new();
        loader
            .expect_get_many()
            .returning(|_| Err(PersistenceError::OperationFailed("locked".into())));
        let (writer, _task) = StateWriter::new(
            Arc::new(MockAccountStatusRepository::new()),
            Arc::new(MockNotificationRepository::new()),
        );
        let mut store = AccountStatusStore::new(Arc::new(loader), writer);

        assert!(store.load(&["a".to_string()]).await.is_err());
    }
}
