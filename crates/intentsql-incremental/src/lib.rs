//! Incremental and cached analysis
//!
//! This crate keeps repeated work to a minimum across and within builds:
//!
//! - **Inputs**: SourceInput, ConfigInput
//! - **Tracked Functions**: parsing, schema analysis, query collection
//! - **Caching**: generated SQL persisted on disk, keyed by query identity,
//!   with a 24 hour lifetime
//!
//! Salsa memoizes per-file analysis inside one process; the disk cache
//! short-circuits generation across separate invocations.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use intentsql_incremental::{IntentSqlDatabase, queries, QueryCache};
//!
//! let db = IntentSqlDatabase::default();
//! let config = queries::ConfigInput::new(&db, config);
//! let file = queries::SourceInput::new(&db, path, contents);
//!
//! let collected = queries::collect_queries(&db, file, config);
//!
//! let cache = QueryCache::from_config(&config_value);
//! if let Some(hit) = cache.get(&q.id, &q.intent, q.params.as_ref()) { /* reuse */ }
//! ```

pub mod cache;
pub mod db;
pub mod queries;

pub use cache::{CacheEntry, CacheError, CacheStats, QueryCache, DEFAULT_TTL};
pub use db::IntentSqlDatabase;
