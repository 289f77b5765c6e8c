//! Salsa inputs and tracked functions for incremental computation
//!
//! Inputs are the raw text of a source file and the project configuration.
//! Everything else is derived and memoized per file.

use intentsql_analyzer::{QueryCollector, SchemaAnalyzer};
use intentsql_core::{CollectedQuery, Config, SchemaInfo};
use intentsql_syntax::SourceFile;
use std::path::PathBuf;

/// Input: a schema or query source file with its path and contents
///
/// Changes when a user edits the file.
#[salsa::input]
pub struct SourceInput {
    /// Path to the source file
    pub path: PathBuf,

    /// Text content of the file
    #[returns(ref)]
    pub contents: String,
}

/// Input: Configuration
///
/// Changes when intentsql.toml is modified. Recognition vocabulary affects
/// both schema analysis and query collection.
#[salsa::input]
pub struct ConfigInput {
    #[returns(ref)]
    pub config: Config,
}

/// Tracked function: Parse a source file into a lowered tree
///
/// Recomputed only when the file contents change.
#[salsa::tracked]
pub fn parse_source(db: &dyn salsa::Database, file: SourceInput) -> Result<SourceFile, String> {
    let path = file.path(db);
    let display = path.to_string_lossy().replace('\\', "/");

    intentsql_syntax::parse_source(&display, file.contents(db)).map_err(|e| format!("Parse error: {}", e))
}

/// Tracked function: Reconstruct the tables declared in one schema file
///
/// Recomputed when the file contents or the configuration change.
/// Files that fail to parse contribute no tables.
#[salsa::tracked]
pub fn analyze_schema(db: &dyn salsa::Database, file: SourceInput, config: ConfigInput) -> SchemaInfo {
    let parsed = match parse_source(db, file) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(path = %file.path(db).display(), error = %e, "skipping schema source");
            return SchemaInfo::new();
        }
    };

    let recognition = config.config(db).recognition.clone();
    SchemaAnalyzer::new(recognition).analyze(&parsed)
}

/// Tracked function: Collect the query sites of one source file
///
/// Recomputed when the file contents or the configuration change.
#[salsa::tracked]
pub fn collect_queries(db: &dyn salsa::Database, file: SourceInput, config: ConfigInput) -> Vec<CollectedQuery> {
    let parsed = match parse_source(db, file) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(path = %file.path(db).display(), error = %e, "skipping query source");
            return Vec::new();
        }
    };

    let recognition = config.config(db).recognition.clone();
    QueryCollector::new(recognition).collect(&parsed)
}

/// Merge per-file schema results in input order
pub fn analyze_schema_files(db: &dyn salsa::Database, files: &[SourceInput], config: ConfigInput) -> SchemaInfo {
    let mut schema = SchemaInfo::new();
    for file in files {
        schema.extend(analyze_schema(db, *file, config));
    }
    schema
}

/// Concatenate per-file query results in input order
pub fn collect_all_queries(
    db: &dyn salsa::Database,
    files: &[SourceInput],
    config: ConfigInput,
) -> Vec<CollectedQuery> {
    files
        .iter()
        .flat_map(|file| collect_queries(db, *file, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IntentSqlDatabase;

    #[test]
    fn test_parse_source_memoized() {
        let db = IntentSqlDatabase::default();
        let file = SourceInput::new(&db, PathBuf::from("src/a.ts"), "const a = db.llm('Get users');".to_string());

        let first = parse_source(&db, file);
        let second = parse_source(&db, file);

        assert!(first.is_ok());
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_queries_uses_input_path() {
        let db = IntentSqlDatabase::default();
        let config = ConfigInput::new(&db, Config::default());
        let file = SourceInput::new(
            &db,
            PathBuf::from("src/users.ts"),
            "export const all = () => db.llm('Get all users');".to_string(),
        );

        let queries = collect_queries(&db, file, config);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].source_file, "src/users.ts");
        assert_eq!(queries[0].location.file, "src/users.ts");
    }

    #[test]
    fn test_recognition_config_is_respected() {
        let db = IntentSqlDatabase::default();
        let mut custom = Config::default();
        custom.recognition.query_objects = vec!["store".to_string()];

        let default_config = ConfigInput::new(&db, Config::default());
        let custom_config = ConfigInput::new(&db, custom);
        let file = SourceInput::new(
            &db,
            PathBuf::from("src/q.ts"),
            "const a = store.llm('Get users');".to_string(),
        );

        assert!(collect_queries(&db, file, default_config).is_empty());
        assert_eq!(collect_queries(&db, file, custom_config).len(), 1);
    }
}
