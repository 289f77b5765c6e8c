//! Schema model reconstructed from the fluent-builder schema DSL

use serde::{Deserialize, Serialize};

/// Constraint tag recorded for `.primaryKey()`
pub const PRIMARY_KEY: &str = "PRIMARY KEY";

/// Constraint tag recorded for `.unique()`
pub const UNIQUE: &str = "UNIQUE";

/// Foreign key target of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnReference {
    /// Referenced table identifier (as written in the schema source)
    pub table: String,

    /// Referenced column property name
    pub column: String,
}

/// A column extracted from a table declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Source-level identifier (object literal property name)
    pub name: String,

    /// Physical column name, defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,

    /// Canonical type tag
    #[serde(rename = "type")]
    pub column_type: String,

    /// True unless a `notNull` modifier was observed
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ColumnReference>,
}

impl ColumnInfo {
    /// Create a nullable column with no modifiers
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_name: None,
            column_type: column_type.into(),
            nullable: true,
            default_value: None,
            enum_values: None,
            constraints: None,
            references: None,
        }
    }

    /// Physical column name, falling back to the source identifier
    pub fn physical_name(&self) -> &str {
        self.db_name.as_deref().unwrap_or(&self.name)
    }

    /// Check whether a constraint tag is present
    pub fn has_constraint(&self, constraint: &str) -> bool {
        self.constraints
            .as_ref()
            .is_some_and(|c| c.iter().any(|existing| existing == constraint))
    }

    /// Add a constraint tag, keeping first-seen order without duplicates
    pub fn add_constraint(&mut self, constraint: &str) {
        if self.has_constraint(constraint) {
            return;
        }
        self.constraints
            .get_or_insert_with(Vec::new)
            .push(constraint.to_string());
    }

    pub fn is_primary_key(&self) -> bool {
        self.has_constraint(PRIMARY_KEY)
    }
}

/// A table declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Physical table name (first string argument of the declaration call)
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: None,
        }
    }

    /// Find a column by its source-level identifier
    pub fn find_column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Physical names of all columns
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.physical_name()).collect()
    }

    /// A table is usable only with a name and at least one column
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.columns.is_empty()
    }
}

/// Cardinality of a cross-table relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Cross-table relation
///
/// Reserved: the analyzer currently records foreign keys on
/// [`ColumnInfo::references`] and leaves [`SchemaInfo::relations`] empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationInfo {
    pub table: String,
    pub referenced_table: String,
    pub columns: Vec<String>,
    pub referenced_columns: Vec<String>,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
}

/// Complete schema model for one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub tables: Vec<TableInfo>,

    #[serde(default)]
    pub relations: Vec<RelationInfo>,
}

impl SchemaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a table by physical name
    pub fn find_table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Merge tables from another schema, keeping declaration order
    pub fn extend(&mut self, other: SchemaInfo) {
        self.tables.extend(other.tables);
        self.relations.extend(other.relations);
    }
}
