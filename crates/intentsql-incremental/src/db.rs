//! Salsa database definition for incremental computation
//!
//! This module defines the Salsa database that memoizes per-file analysis.
//! Inputs are source files and configuration; tracked functions derive
//! parsed trees, schema models and collected queries from them.

/// Main Salsa database implementation
///
/// ## Usage
///
/// ```rust,ignore
/// use intentsql_incremental::{IntentSqlDatabase, queries};
///
/// let db = IntentSqlDatabase::default();
///
/// let file = queries::SourceInput::new(&db, path, contents);
/// let config = queries::ConfigInput::new(&db, config);
///
/// // Cached until the file contents or config change
/// let schema = queries::analyze_schema(&db, file, config);
/// ```
#[salsa::db]
#[derive(Default, Clone)]
pub struct IntentSqlDatabase {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for IntentSqlDatabase {}
