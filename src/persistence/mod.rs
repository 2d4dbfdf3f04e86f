//! This module contains the state persistence logic for the balance sentinel.

pub mod error;
pub mod sqlite;
pub use sqlite::SqliteStateRepository;
pub mod traits;
pub mod writer;
pub use writer::{StateWriter, StateWriterTask};
