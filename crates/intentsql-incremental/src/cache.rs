//! Generated-query caching on disk with TTL
//!
//! Each entry lives in its own JSON file named by the cache key, a hash over
//! the query id, trimmed intent and params. Entries older than the TTL are
//! treated as absent on read but stay on disk until evicted or cleared.
//!
//! The cache never fails a build: unreadable or corrupt entries are misses,
//! write failures are logged, and a disabled cache answers every lookup
//! with "absent".

use chrono::Utc;
use intentsql_core::{cache_key, Config, GeneratedQuery, Params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Entries older than this are treated as absent
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One cached generation result, as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key this entry was written under
    pub hash: String,

    pub query: GeneratedQuery,

    /// Write time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CacheEntry {
    /// `now - timestamp < ttl`; entries stamped in the future count as fresh
    fn is_fresh(&self, ttl: Duration, now_ms: i64) -> bool {
        let age = i128::from(now_ms) - i128::from(self.timestamp);
        age < ttl.as_millis() as i128
    }
}

/// Cache I/O errors
///
/// Never surfaced to callers of the public operations; they are logged and
/// turned into misses or skipped writes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt entry {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Summary of what is stored on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entry files, expired ones included
    pub count: usize,
    pub total_bytes: u64,
}

/// Disk cache of generated queries
///
/// ## Usage
///
/// ```rust,ignore
/// let cache = QueryCache::from_config(&config);
///
/// if let Some(generated) = cache.get(&query.id, &query.intent, query.params.as_ref()) {
///     // reuse without regenerating
/// } else {
///     let generated = generate(&query)?;
///     cache.set(&query.id, &query.intent, &generated, query.params.as_ref());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct QueryCache {
    dir: PathBuf,
    enabled: bool,
    ttl: Duration,
}

impl QueryCache {
    /// Create an enabled cache rooted at `dir` with the default TTL
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
            ttl: DEFAULT_TTL,
        }
    }

    /// Cache configured from the `[cache]` section
    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: config.cache_dir(),
            enabled: config.cache.enabled,
            ttl: Duration::from_secs(config.cache.ttl_hours.saturating_mul(60 * 60)),
        }
    }

    /// A cache that stores nothing and finds nothing
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read an entry file; `Ok(None)` when it does not exist
    fn read_entry(&self, path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path)(e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read an entry, logging failures as misses
    fn load(&self, path: &Path) -> Option<CacheEntry> {
        self.read_entry(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "treating cache entry as a miss");
            None
        })
    }

    /// Look up a generated query if a fresh entry exists
    pub fn get(&self, id: &str, intent: &str, params: Option<&Params>) -> Option<GeneratedQuery> {
        if !self.enabled {
            return None;
        }

        let key = cache_key(id, intent, params);
        let entry = self.load(&self.entry_path(&key))?;

        if !entry.is_fresh(self.ttl, Utc::now().timestamp_millis()) {
            tracing::debug!(key = %key, "cache entry expired");
            return None;
        }

        tracing::trace!(key = %key, "cache hit");
        Some(entry.query)
    }

    /// Check for a fresh entry without returning it
    pub fn has(&self, id: &str, intent: &str, params: Option<&Params>) -> bool {
        self.get(id, intent, params).is_some()
    }

    /// Store a generated query, replacing any previous entry for the key
    pub fn set(&self, id: &str, intent: &str, query: &GeneratedQuery, params: Option<&Params>) {
        if !self.enabled {
            return;
        }

        let key = cache_key(id, intent, params);
        let entry = CacheEntry {
            hash: key.clone(),
            query: query.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };

        if let Err(e) = self.write_entry(&key, &entry) {
            tracing::warn!(key = %key, error = %e, "failed to write cache entry");
        }
    }

    /// Whole-file replace: write beside the target, then rename over it
    fn write_entry(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(CacheError::io(&self.dir))?;

        let json = serde_json::to_string_pretty(entry)?;
        let target = self.entry_path(key);
        let staging = self.dir.join(format!("{}.json.tmp", key));

        fs::write(&staging, json).map_err(CacheError::io(&staging))?;
        fs::rename(&staging, &target).map_err(CacheError::io(&target))
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }

    /// Remove every entry
    pub fn clear(&self) {
        if !self.enabled {
            return;
        }

        for path in self.entry_files() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove cache entry");
            }
        }
    }

    /// Remove entries that are expired or unreadable
    ///
    /// Returns the number of files removed.
    pub fn evict_expired(&self) -> usize {
        if !self.enabled {
            return 0;
        }

        let now = Utc::now().timestamp_millis();
        let mut removed = 0;

        for path in self.entry_files() {
            let stale = match self.read_entry(&path) {
                Ok(Some(entry)) => !entry.is_fresh(self.ttl, now),
                Ok(None) => false,
                Err(e) => {
                    tracing::debug!(error = %e, "evicting unreadable cache entry");
                    true
                }
            };

            if stale && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        tracing::debug!(removed, "evicted expired cache entries");
        removed
    }

    /// Count entries and their size on disk
    pub fn stats(&self) -> CacheStats {
        if !self.enabled {
            return CacheStats::default();
        }

        self.entry_files()
            .iter()
            .filter_map(|path| fs::metadata(path).ok())
            .fold(CacheStats::default(), |stats, meta| CacheStats {
                count: stats.count + 1,
                total_bytes: stats.total_bytes + meta.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentsql_core::ParamValue;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_query() -> GeneratedQuery {
        GeneratedQuery {
            id: "abc123".to_string(),
            intent: "Get user with id ${0}".to_string(),
            sql: "SELECT * FROM users WHERE id = $1".to_string(),
            parameters: vec!["param0".to_string()],
            return_type: "User".to_string(),
            hash: "content".to_string(),
            source_file: Some("src/users.ts".to_string()),
        }
    }

    fn create_test_params() -> Params {
        let mut params = Params::new();
        params.insert("param0".into(), ParamValue::Expression("userId".into()));
        params
    }

    #[test]
    fn test_cache_set_and_get() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let query = create_test_query();
        let params = create_test_params();

        assert!(cache.get(&query.id, &query.intent, Some(&params)).is_none());

        cache.set(&query.id, &query.intent, &query, Some(&params));

        assert_eq!(cache.get(&query.id, &query.intent, Some(&params)), Some(query.clone()));
        assert!(cache.has(&query.id, &query.intent, Some(&params)));
    }

    #[test]
    fn test_key_trims_intent_and_distinguishes_params() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let query = create_test_query();

        cache.set(&query.id, "  Get user with id ${0}\n", &query, None);

        assert!(cache.has(&query.id, "Get user with id ${0}", None));
        assert!(!cache.has(&query.id, "Get user with id ${0}", Some(&create_test_params())));
        assert!(!cache.has("other", "Get user with id ${0}", None));
    }

    #[test]
    fn test_expired_entry_is_absent_but_kept() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let query = create_test_query();
        let key = cache_key(&query.id, &query.intent, None);

        let stale = CacheEntry {
            hash: key.clone(),
            query: query.clone(),
            timestamp: Utc::now().timestamp_millis() - (DEFAULT_TTL.as_millis() as i64) - 1_000,
        };
        cache.write_entry(&key, &stale).unwrap();

        assert!(cache.get(&query.id, &query.intent, None).is_none());
        assert!(!cache.has(&query.id, &query.intent, None));
        assert!(cache.entry_path(&key).exists());
        assert_eq!(cache.stats().count, 1);

        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.stats().count, 0);
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let query = create_test_query();
        let key = cache_key(&query.id, &query.intent, None);

        let ahead = CacheEntry {
            hash: key.clone(),
            query: query.clone(),
            timestamp: Utc::now().timestamp_millis() + 60_000,
        };
        cache.write_entry(&key, &ahead).unwrap();

        assert_eq!(cache.get(&query.id, &query.intent, None), Some(query));
        assert_eq!(cache.evict_expired(), 0);
    }

    #[test]
    fn test_read_errors_are_typed() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let path = cache.entry_path("broken");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(cache.read_entry(&path), Err(CacheError::Corrupt { .. })));
        assert!(matches!(cache.read_entry(&cache.entry_path("absent")), Ok(None)));
    }

    #[test]
    fn test_write_into_file_path_fails_with_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let cache = QueryCache::new(&blocker);
        let query = create_test_query();

        let entry = CacheEntry {
            hash: "k".to_string(),
            query: query.clone(),
            timestamp: 0,
        };
        assert!(matches!(cache.write_entry("k", &entry), Err(CacheError::Io { .. })));

        // Public operations stay silent
        cache.set(&query.id, &query.intent, &query, None);
        assert!(!cache.has(&query.id, &query.intent, None));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path()).with_ttl(Duration::ZERO);
        let query = create_test_query();

        cache.set(&query.id, &query.intent, &query, None);
        assert!(cache.get(&query.id, &query.intent, None).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let query = create_test_query();
        let key = cache_key(&query.id, &query.intent, None);

        fs::write(cache.entry_path(&key), "{ not json").unwrap();

        assert!(cache.get(&query.id, &query.intent, None).is_none());
        assert_eq!(cache.evict_expired(), 1);
    }

    #[test]
    fn test_disabled_cache_is_inert() {
        let dir = TempDir::new().unwrap();
        let enabled = QueryCache::new(dir.path());
        let query = create_test_query();
        enabled.set(&query.id, &query.intent, &query, None);

        let mut config = Config::default();
        config.project_root = dir.path().to_path_buf();
        config.cache.enabled = false;
        config.cache.dir = PathBuf::from(".");
        let disabled = QueryCache::from_config(&config);

        assert!(!disabled.is_enabled());
        assert!(disabled.get(&query.id, &query.intent, None).is_none());
        assert!(!disabled.has(&query.id, &query.intent, None));
        disabled.set(&query.id, &query.intent, &query, None);
        disabled.clear();
        assert_eq!(disabled.stats(), CacheStats::default());

        // Nothing was touched on disk
        assert!(enabled.has(&query.id, &query.intent, None));
        assert!(!QueryCache::disabled().has(&query.id, &query.intent, None));
    }

    #[test]
    fn test_clear_and_stats() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path().join("nested"));
        let query = create_test_query();

        assert_eq!(cache.stats(), CacheStats::default());

        cache.set("a", "Get users", &query, None);
        cache.set("b", "Get posts", &query, None);

        let stats = cache.stats();
        assert_eq!(stats.count, 2);
        assert!(stats.total_bytes > 0);

        cache.clear();
        assert_eq!(cache.stats().count, 0);
        assert!(!cache.has("a", "Get users", None));
    }

    #[test]
    fn test_entry_file_format() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path());
        let query = create_test_query();
        cache.set(&query.id, &query.intent, &query, None);

        let key = cache_key(&query.id, &query.intent, None);
        let raw = fs::read_to_string(cache.entry_path(&key)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["hash"], key);
        assert_eq!(json["query"]["sql"], "SELECT * FROM users WHERE id = $1");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = CacheStats { count: 2, total_bytes: 512 };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["totalBytes"], 512);
    }
}
