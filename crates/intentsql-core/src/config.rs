//! Configuration schema (intentsql.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the schema declarations live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema source files or directories, relative to the project root
    #[serde(default = "default_schema_paths")]
    pub paths: Vec<PathBuf>,
}

fn default_schema_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("src/db/schema.ts")]
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            paths: default_schema_paths(),
        }
    }
}

/// Where query sites are searched for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueriesConfig {
    /// Source roots to scan, relative to the project root
    #[serde(default = "default_include")]
    pub include: Vec<PathBuf>,

    /// File extensions considered source files
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_include() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx", "mts", "cts"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            extensions: default_extensions(),
        }
    }
}

impl QueriesConfig {
    /// Check whether a path has one of the configured extensions
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Generated-query cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory, relative to the project root
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Entry lifetime in hours
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".intentsql/cache")
}

fn default_ttl_hours() -> u64 {
    24
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// Names the analyzers recognize in source code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Table declaration functions (`pgTable('users', {...})`)
    #[serde(default = "default_table_functions")]
    pub table_functions: Vec<String>,

    /// Composite primary key composer
    #[serde(default = "default_primary_key_function")]
    pub primary_key_function: String,

    /// Receivers of the call form (`db.llm('...')`)
    #[serde(default = "default_query_objects")]
    pub query_objects: Vec<String>,

    /// Method name of the call form
    #[serde(default = "default_query_method")]
    pub query_method: String,

    /// Tag of the tagged-template form (`` llm`...` ``)
    #[serde(default = "default_template_tag")]
    pub template_tag: String,

    /// Executor returning a single row
    #[serde(default = "default_single_executor")]
    pub single_executor: String,

    /// Executor returning many rows
    #[serde(default = "default_multiple_executor")]
    pub multiple_executor: String,
}

fn default_table_functions() -> Vec<String> {
    vec!["pgTable".to_string(), "table".to_string()]
}

fn default_primary_key_function() -> String {
    "primaryKey".to_string()
}

fn default_query_objects() -> Vec<String> {
    vec!["db".to_string(), "client".to_string()]
}

fn default_query_method() -> String {
    "llm".to_string()
}

fn default_template_tag() -> String {
    "llm".to_string()
}

fn default_single_executor() -> String {
    "one".to_string()
}

fn default_multiple_executor() -> String {
    "many".to_string()
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            table_functions: default_table_functions(),
            primary_key_function: default_primary_key_function(),
            query_objects: default_query_objects(),
            query_method: default_query_method(),
            template_tag: default_template_tag(),
            single_executor: default_single_executor(),
            multiple_executor: default_multiple_executor(),
        }
    }
}

impl RecognitionConfig {
    pub fn is_table_function(&self, name: &str) -> bool {
        self.table_functions.iter().any(|f| f == name)
    }

    pub fn is_query_object(&self, name: &str) -> bool {
        self.query_objects.iter().any(|o| o == name)
    }

    /// Map an executor method to its `expectsMultiple` flag
    pub fn executor_flag(&self, method: &str) -> Option<bool> {
        if method == self.multiple_executor {
            Some(true)
        } else if method == self.single_executor {
            Some(false)
        } else {
            None
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub queries: QueriesConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: SchemaConfig::default(),
            queries: QueriesConfig::default(),
            cache: CacheConfig::default(),
            recognition: RecognitionConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Absolute cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.cache.dir)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.recognition.table_functions, vec!["pgTable", "table"]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [cache]
            enabled = false

            [recognition]
            query_objects = ["database"]
            "#,
        )
        .unwrap();

        assert!(!config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from(".intentsql/cache"));
        assert!(config.recognition.is_query_object("database"));
        assert!(!config.recognition.is_query_object("db"));
        assert_eq!(config.recognition.query_method, "llm");
    }

    #[test]
    fn executor_flags() {
        let recognition = RecognitionConfig::default();
        assert_eq!(recognition.executor_flag("many"), Some(true));
        assert_eq!(recognition.executor_flag("one"), Some(false));
        assert_eq!(recognition.executor_flag("then"), None);
    }

    #[test]
    fn extension_matching() {
        let queries = QueriesConfig::default();
        assert!(queries.matches_extension(Path::new("src/users.ts")));
        assert!(!queries.matches_extension(Path::new("src/users.rs")));
        assert!(!queries.matches_extension(Path::new("Makefile")));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.recognition, parsed.recognition);
        assert_eq!(config.cache, parsed.cache);
    }
}
