//! intentsql Core
//!
//! Core domain model shared by every stage of the pipeline:
//! schema model, collected/generated queries, identity hashing and config.
//! Serialized field names are part of the artifact format - do not rename them.

pub mod schema;
pub mod query;
pub mod identity;
pub mod config;

pub use schema::{SchemaInfo, TableInfo, ColumnInfo, ColumnReference, RelationInfo, RelationType};
pub use query::{CollectedQuery, GeneratedQuery, ParamValue, Params, QueryLocation, intent_placeholders};
pub use identity::{query_id, runtime_query_id, content_hash, cache_key, canonical_json};
pub use config::{Config, ConfigError, SchemaConfig, QueriesConfig, CacheConfig, RecognitionConfig};
