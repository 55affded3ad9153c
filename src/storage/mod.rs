pub mod database;
pub mod pattern_store;
pub mod trend_store;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use pattern_store::SqlitePatternStore;
pub use trend_store::SqliteTrendStore;
