//! Database executor adapters.

pub mod mock;
pub mod sqlite;

pub use mock::MockExecutor;
pub use sqlite::SqliteExecutor;
