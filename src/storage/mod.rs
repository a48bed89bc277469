pub mod budget_store;
pub mod database;
pub mod executor;
pub mod sample;

pub use budget_store::{NewTransaction, SqliteBudgetStore, StoreStats};
pub use database::{Database, PoolConfig, SharedDatabase};
pub use executor::{MAX_RESULT_ROWS, SqliteQueryExecutor};
