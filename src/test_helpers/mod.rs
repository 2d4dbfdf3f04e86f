//! A set of helpers for testing

mod account;
mod repository;
mod sink;
mod source;

pub use account::AccountBuilder;
pub use repository::create_test_repository;
pub use sink::RecordingSink;
pub use source::ScriptedBalanceSource;
