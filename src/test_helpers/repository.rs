use std::sync::Arc;

use crate::persistence::SqliteStateRepository;

/// Creates an in-memory SQLite repository with migrations applied.
pub async fn create_test_repository() -> Arc<SqliteStateRepository> {
    let repository = SqliteStateRepository::new("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");
    repository.run_migrations().await.expect("Failed to run migrations");
    Arc::new(repository)
}
