//! Query types: collected query sites and generated SQL artifacts

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\d+)\}").expect("placeholder pattern is valid"));

/// A parameter value extracted from a query call site
///
/// Literal values are decoded; anything else is kept as its source text
/// so consumers can tell evaluated constants from passthrough expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ParamValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    /// Unresolved expression, stored as source text
    Expression(String),
}

impl ParamValue {
    /// JSON form used for hashing: literals as JSON scalars, expressions as text
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::String(s) | Self::Expression(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(b) => Value::Bool(*b),
            Self::Null => Value::Null,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }
}

/// Parameter map with stable key order
pub type Params = BTreeMap<String, ParamValue>;

/// Source position of a query site (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl QueryLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for QueryLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A natural-language query site discovered in source code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedQuery {
    /// Content hash of intent, params and location
    pub id: String,

    /// Intent text, with `${n}` placeholders for interpolated values
    pub intent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    pub location: QueryLocation,

    pub source_file: String,

    /// Set when the query is wrapped by a single/multiple result executor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expects_multiple: Option<bool>,
}

impl CollectedQuery {
    /// Build a query and derive its identity from intent, params and location
    pub fn new(
        intent: impl Into<String>,
        params: Option<Params>,
        location: QueryLocation,
    ) -> Self {
        let intent = intent.into();
        let id = crate::identity::query_id(&intent, params.as_ref(), Some(&location));
        let source_file = location.file.clone();

        Self {
            id,
            intent,
            params,
            return_type: None,
            location,
            source_file,
            expects_multiple: None,
        }
    }

    pub fn with_return_type(mut self, return_type: Option<String>) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_expects_multiple(mut self, expects_multiple: Option<bool>) -> Self {
        self.expects_multiple = expects_multiple;
        self
    }

    /// Secondary hash over intent, params and return type
    pub fn content_hash(&self) -> String {
        crate::identity::content_hash(&self.intent, self.params.as_ref(), self.return_type.as_deref())
    }
}

/// SQL generated for a collected query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    pub id: String,

    /// Intent the SQL was generated from; empty when not recorded
    #[serde(default)]
    pub intent: String,

    pub sql: String,

    /// Ordered placeholder names
    #[serde(default)]
    pub parameters: Vec<String>,

    pub return_type: String,

    /// Content hash of the query this was generated from
    pub hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl GeneratedQuery {
    /// Whether the artifact recorded the intent it was generated from
    pub fn has_recorded_intent(&self) -> bool {
        !self.intent.trim().is_empty()
    }
}

/// Placeholder indices referenced by an intent, in order of appearance
pub fn intent_placeholders(intent: &str) -> Vec<usize> {
    PLACEHOLDER
        .captures_iter(intent)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_in_order() {
        assert_eq!(intent_placeholders("Get user ${0} in ${1}"), vec![0, 1]);
        assert!(intent_placeholders("Get all users").is_empty());
        assert!(intent_placeholders("price in $ {0}").is_empty());
    }

    #[test]
    fn collected_query_identity_is_derived() {
        let location = QueryLocation::new("src/users.ts", 3, 5);
        let a = CollectedQuery::new("Get users", None, location.clone());
        let b = CollectedQuery::new("Get users", None, location);

        assert_eq!(a.id, b.id);
        assert_eq!(a.source_file, "src/users.ts");
    }

    #[test]
    fn param_value_serialization_keeps_kind() {
        let json = serde_json::to_value(ParamValue::Expression("userId".into())).unwrap();
        assert_eq!(json["kind"], "expression");
        assert_eq!(json["value"], "userId");

        let parsed: ParamValue = serde_json::from_value(json).unwrap();
        assert!(parsed.is_expression());
    }

    #[test]
    fn generated_query_without_intent() {
        let json = r#"{
            "id": "abc",
            "sql": "SELECT 1",
            "returnType": "number",
            "hash": "def"
        }"#;

        let generated: GeneratedQuery = serde_json::from_str(json).unwrap();
        assert!(!generated.has_recorded_intent());
        assert!(generated.parameters.is_empty());
    }
}
