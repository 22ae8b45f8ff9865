// Sales Dashboard - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod aggregation;
pub mod config;
pub mod dataset;
pub mod db;
pub mod import;
pub mod memory;
pub mod month;
pub mod price_range;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use aggregation::{
    category_counts, AggregationEngine, CategoryCount, CategoryGroups, CombinedPayload,
    CombinedView, PriceBucketCount, Statistics,
};
pub use config::Config;
pub use dataset::{Dataset, QueryError, QueryResult};
pub use db::{
    get_transaction, ImportRecord, ListQuery, SqliteStore, StoreError, StoreResult, Transaction,
    TransactionStore,
};
pub use import::{import_seed, load_seed, ImportError, SeedSource};
pub use memory::MemoryStore;
pub use month::{MonthParseError, MonthSelector};
pub use price_range::{PriceRange, PRICE_RANGES};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
