//! Change categorization between builds
//!
//! Compares freshly collected queries against previously generated output
//! and decides which ones need (re)generation.

use intentsql_core::{CollectedQuery, GeneratedQuery};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Bucket a collected query falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Same id and same intent (or same content hash): reuse prior SQL
    Valid,
    /// Same id, but the intent or content hash differs
    Changed,
    /// No prior output with this id
    New,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Valid => write!(f, "unchanged"),
            ChangeKind::Changed => write!(f, "changed"),
            ChangeKind::New => write!(f, "new"),
        }
    }
}

/// Result of categorizing current queries against prior output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Categorization {
    /// Unchanged queries whose prior output is carried forward
    pub valid: Vec<CollectedQuery>,
    /// Queries whose prior output no longer matches
    pub changed: Vec<CollectedQuery>,
    /// Queries seen for the first time
    pub invalid: Vec<CollectedQuery>,
    /// Ids with prior output but no current query site, sorted
    pub removed: Vec<String>,
}

impl Categorization {
    /// Queries to hand to generation: changed first, then new
    pub fn needs_generation(&self) -> impl Iterator<Item = &CollectedQuery> {
        self.changed.iter().chain(self.invalid.iter())
    }

    pub fn generation_count(&self) -> usize {
        self.changed.len() + self.invalid.len()
    }

    /// Check if anything must be regenerated or dropped
    pub fn has_changes(&self) -> bool {
        self.generation_count() > 0 || !self.removed.is_empty()
    }

    /// Prior generated output for the valid set, in collection order
    pub fn carried_forward(&self, existing: &HashMap<String, GeneratedQuery>) -> Vec<GeneratedQuery> {
        self.valid
            .iter()
            .filter_map(|q| existing.get(&q.id).cloned())
            .collect()
    }

    /// Bucket of a query id, if it was categorized
    pub fn kind_of(&self, id: &str) -> Option<ChangeKind> {
        let contains = |set: &[CollectedQuery]| set.iter().any(|q| q.id == id);

        if contains(&self.valid[..]) {
            Some(ChangeKind::Valid)
        } else if contains(&self.changed[..]) {
            Some(ChangeKind::Changed)
        } else if contains(&self.invalid[..]) {
            Some(ChangeKind::New)
        } else {
            None
        }
    }
}

/// Partitions collected queries against previously generated ones
pub struct ChangeCategorizer;

impl ChangeCategorizer {
    /// Categorize current queries against existing generated output
    ///
    /// Each query lands in exactly one bucket, in collection order. Intent
    /// text is compared before the content hash; the hash is only consulted
    /// when the prior entry has no recorded intent.
    pub fn categorize(
        current: &[CollectedQuery],
        existing: &HashMap<String, GeneratedQuery>,
    ) -> Categorization {
        let mut result = Categorization::default();

        for query in current {
            match Self::classify(query, existing.get(&query.id)) {
                ChangeKind::Valid => result.valid.push(query.clone()),
                ChangeKind::Changed => result.changed.push(query.clone()),
                ChangeKind::New => result.invalid.push(query.clone()),
            }
        }

        let current_ids: HashSet<&str> = current.iter().map(|q| q.id.as_str()).collect();
        result.removed = existing
            .keys()
            .filter(|id| !current_ids.contains(id.as_str()))
            .cloned()
            .collect();
        result.removed.sort();

        tracing::debug!(
            valid = result.valid.len(),
            changed = result.changed.len(),
            new = result.invalid.len(),
            removed = result.removed.len(),
            "categorized queries"
        );

        result
    }

    /// Classify a single query against its prior output, if any
    pub fn classify(query: &CollectedQuery, existing: Option<&GeneratedQuery>) -> ChangeKind {
        let Some(existing) = existing else {
            return ChangeKind::New;
        };

        if existing.has_recorded_intent() {
            // Params are not compared once intent text is available
            if existing.intent.trim() == query.intent.trim() {
                return ChangeKind::Valid;
            }
        } else if existing.hash == query.content_hash() {
            return ChangeKind::Valid;
        }

        ChangeKind::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentsql_core::{ParamValue, Params, QueryLocation};
    use pretty_assertions::assert_eq;

    fn collected(intent: &str, line: usize) -> CollectedQuery {
        CollectedQuery::new(intent, None, QueryLocation::new("src/users.ts", line, 1))
    }

    fn generated_for(query: &CollectedQuery, intent: &str) -> GeneratedQuery {
        GeneratedQuery {
            id: query.id.clone(),
            intent: intent.to_string(),
            sql: "SELECT * FROM users".to_string(),
            parameters: Vec::new(),
            return_type: "User[]".to_string(),
            hash: query.content_hash(),
            source_file: Some(query.source_file.clone()),
        }
    }

    fn existing(entries: Vec<GeneratedQuery>) -> HashMap<String, GeneratedQuery> {
        entries.into_iter().map(|g| (g.id.clone(), g)).collect()
    }

    #[test]
    fn same_intent_is_valid() {
        let query = collected("Get users", 1);
        let prior = existing(vec![generated_for(&query, "Get users")]);

        let result = ChangeCategorizer::categorize(&[query.clone()], &prior);

        assert_eq!(result.valid.len(), 1);
        assert!(result.changed.is_empty());
        assert!(result.invalid.is_empty());
        assert!(!result.has_changes());
        assert_eq!(result.carried_forward(&prior), vec![prior[&query.id].clone()]);
    }

    #[test]
    fn different_intent_same_id_is_changed() {
        let mut query = collected("Get active users", 1);
        let prior_query = collected("Get users", 1);
        // Same site, same id, edited text
        query.id = prior_query.id.clone();
        let prior = existing(vec![generated_for(&prior_query, "Get users")]);

        let result = ChangeCategorizer::categorize(&[query], &prior);

        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.kind_of(&prior_query.id), Some(ChangeKind::Changed));
        assert_eq!(result.generation_count(), 1);
    }

    #[test]
    fn unknown_id_is_new() {
        let query = collected("Get users", 1);
        let result = ChangeCategorizer::categorize(&[query.clone()], &HashMap::new());

        assert_eq!(result.invalid.len(), 1);
        assert_eq!(result.kind_of(&query.id), Some(ChangeKind::New));
    }

    #[test]
    fn intent_comparison_trims_whitespace() {
        let query = collected("  Get users\n", 1);
        let prior = existing(vec![generated_for(&query, "Get users")]);

        assert_eq!(ChangeCategorizer::classify(&query, prior.get(&query.id)), ChangeKind::Valid);
    }

    #[test]
    fn hash_fallback_without_recorded_intent() {
        let query = collected("Get users", 1);
        let mut prior = generated_for(&query, "");

        assert_eq!(ChangeCategorizer::classify(&query, Some(&prior)), ChangeKind::Valid);

        prior.hash = "stale".to_string();
        assert_eq!(ChangeCategorizer::classify(&query, Some(&prior)), ChangeKind::Changed);
    }

    #[test]
    fn param_only_change_stays_valid_when_intent_recorded() {
        let mut params = Params::new();
        params.insert("limit".into(), ParamValue::Number(10.0));
        let query = CollectedQuery::new("Get users", Some(params), QueryLocation::new("a.ts", 1, 1));

        let mut prior = generated_for(&query, "Get users");
        prior.hash = "hash-from-different-params".to_string();

        assert_eq!(ChangeCategorizer::classify(&query, Some(&prior)), ChangeKind::Valid);
    }

    #[test]
    fn partitions_are_disjoint_and_ordered() {
        let unchanged = collected("Get users", 1);
        let mut edited = collected("Get posts by author", 2);
        let original = collected("Get posts", 2);
        edited.id = original.id.clone();
        let fresh = collected("Count comments", 3);
        let gone = collected("Get tags", 4);

        let prior = existing(vec![
            generated_for(&unchanged, "Get users"),
            generated_for(&original, "Get posts"),
            generated_for(&gone, "Get tags"),
        ]);

        let current = vec![fresh.clone(), edited.clone(), unchanged.clone()];
        let result = ChangeCategorizer::categorize(&current, &prior);

        assert_eq!(result.valid.iter().map(|q| &q.id).collect::<Vec<_>>(), vec![&unchanged.id]);
        assert_eq!(result.changed.iter().map(|q| &q.id).collect::<Vec<_>>(), vec![&edited.id]);
        assert_eq!(result.invalid.iter().map(|q| &q.id).collect::<Vec<_>>(), vec![&fresh.id]);
        assert_eq!(result.removed, vec![gone.id.clone()]);

        let regenerate: Vec<_> = result.needs_generation().map(|q| q.intent.as_str()).collect();
        assert_eq!(regenerate, vec!["Get posts by author", "Count comments"]);
    }

    #[test]
    fn change_kind_display() {
        assert_eq!(ChangeKind::Valid.to_string(), "unchanged");
        assert_eq!(ChangeKind::New.to_string(), "new");
    }
}
