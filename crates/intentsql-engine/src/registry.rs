//! Build-scoped registry of generated queries
//!
//! Holds the generated output of one build, indexed by query id and by
//! runtime id. A running process can resolve a tagged-template invocation
//! from its literal segments alone, without knowing where it was written.

use intentsql_core::{intent_placeholders, runtime_query_id, GeneratedQuery};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    by_id: HashMap<String, GeneratedQuery>,
    /// Runtime id -> query id of the first registration with that intent
    by_runtime_id: HashMap<String, String>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from generated output
    pub fn from_queries(queries: impl IntoIterator<Item = GeneratedQuery>) -> Self {
        let mut registry = Self::new();
        for query in queries {
            registry.register(query);
        }
        registry
    }

    /// Add or replace a generated query
    ///
    /// Distinct sites with the same intent share a runtime id; the first
    /// registration keeps it.
    pub fn register(&mut self, query: GeneratedQuery) {
        if let Some(replaced) = self.by_id.get(&query.id) {
            let stale = runtime_query_id(&replaced.intent);
            if self.by_runtime_id.get(&stale) == Some(&query.id) {
                self.by_runtime_id.remove(&stale);
            }
        }

        if query.has_recorded_intent() {
            let runtime_id = runtime_query_id(&query.intent);
            if let Some(previous) = self.by_runtime_id.get(&runtime_id) {
                if previous != &query.id {
                    tracing::debug!(intent = %query.intent, "runtime id shared by several query sites");
                }
            } else {
                self.by_runtime_id.insert(runtime_id, query.id.clone());
            }
        }

        self.by_id.insert(query.id.clone(), query);
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedQuery> {
        self.by_id.get(id)
    }

    /// Resolve by intent pattern (with `${n}` placeholders)
    pub fn resolve_intent(&self, intent: &str) -> Option<&GeneratedQuery> {
        let id = self.by_runtime_id.get(&runtime_query_id(intent))?;
        self.by_id
            .get(id)
            .filter(|query| query.intent.trim() == intent.trim())
    }

    /// Resolve a tagged-template invocation from its literal segments
    pub fn resolve_template(&self, strings: &[&str]) -> Option<&GeneratedQuery> {
        let intent = template_intent(strings);
        let expected: Vec<usize> = (0..strings.len().saturating_sub(1)).collect();

        let query = self.resolve_intent(&intent)?;
        (intent_placeholders(&intent) == expected).then_some(query)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedQuery> {
        self.by_id.values()
    }

    /// Generated output keyed by id, as consumed by categorization
    pub fn into_map(self) -> HashMap<String, GeneratedQuery> {
        self.by_id
    }
}

/// Rebuild the intent pattern: segments joined by `${0}`, `${1}`, ...
pub fn template_intent(strings: &[&str]) -> String {
    let mut intent = String::new();
    for (i, segment) in strings.iter().enumerate() {
        if i > 0 {
            intent.push_str(&format!("${{{}}}", i - 1));
        }
        intent.push_str(segment);
    }
    intent
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentsql_core::{CollectedQuery, Params, ParamValue, QueryLocation};

    fn generated(query: &CollectedQuery, sql: &str) -> GeneratedQuery {
        GeneratedQuery {
            id: query.id.clone(),
            intent: query.intent.clone(),
            sql: sql.to_string(),
            parameters: vec!["param0".to_string()],
            return_type: "User".to_string(),
            hash: query.content_hash(),
            source_file: Some(query.source_file.clone()),
        }
    }

    fn template_query(intent: &str, line: usize) -> CollectedQuery {
        let mut params = Params::new();
        params.insert("param0".into(), ParamValue::Expression("userId".into()));
        CollectedQuery::new(intent, Some(params), QueryLocation::new("src/users.ts", line, 3))
    }

    #[test]
    fn template_intent_matches_collector_format() {
        assert_eq!(template_intent(&["Get user with id ", ""]), "Get user with id ${0}");
        assert_eq!(template_intent(&["", " and ", "!"]), "${0} and ${1}!");
        assert_eq!(template_intent(&["Get all users"]), "Get all users");
    }

    #[test]
    fn resolves_template_without_location() {
        let query = template_query("Get user with id ${0}", 12);
        let registry = QueryRegistry::from_queries(vec![generated(&query, "SELECT * FROM users WHERE id = $1")]);

        let resolved = registry.resolve_template(&["Get user with id ", ""]).unwrap();
        assert_eq!(resolved.id, query.id);
        assert!(registry.resolve_template(&["Get user with email ", ""]).is_none());
    }

    #[test]
    fn first_registration_keeps_shared_runtime_id() {
        let first = template_query("Get user with id ${0}", 12);
        let second = template_query("Get user with id ${0}", 40);
        assert_ne!(first.id, second.id);

        let registry = QueryRegistry::from_queries(vec![
            generated(&first, "SELECT 1"),
            generated(&second, "SELECT 2"),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve_intent("Get user with id ${0}").unwrap().sql, "SELECT 1");
        assert_eq!(registry.get(&second.id).unwrap().sql, "SELECT 2");
    }

    #[test]
    fn replacing_an_entry_drops_its_old_intent() {
        let users = template_query("Get users", 1);
        let mut posts = generated(&users, "SELECT * FROM posts");
        posts.intent = "Get posts".to_string();

        let mut registry = QueryRegistry::new();
        registry.register(generated(&users, "SELECT * FROM users"));
        registry.register(posts);

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve_intent("Get users").is_none());
        assert_eq!(registry.resolve_intent("Get posts").unwrap().sql, "SELECT * FROM posts");
    }

    #[test]
    fn entries_without_intent_are_not_runtime_resolvable() {
        let query = template_query("Get user with id ${0}", 1);
        let mut entry = generated(&query, "SELECT 1");
        entry.intent.clear();

        let registry = QueryRegistry::from_queries(vec![entry]);
        assert!(registry.get(&query.id).is_some());
        assert!(registry.resolve_intent("Get user with id ${0}").is_none());
    }
}
