//! Schema extraction from the fluent builder DSL
//!
//! Recognizes top-level declarations such as
//!
//! ```text
//! export const users = pgTable('users', {
//!   id: uuid('id').primaryKey().defaultRandom(),
//!   orgId: uuid('org_id').references(() => orgs.id),
//! });
//! ```
//!
//! and rebuilds [`SchemaInfo`] without executing anything. Declarations
//! that don't fit the pattern are skipped silently.

use crate::chain::{ChainCall, MethodChain};
use crate::error::AnalyzerError;
use intentsql_core::schema::{PRIMARY_KEY, UNIQUE};
use intentsql_core::{ColumnInfo, ColumnReference, RecognitionConfig, SchemaInfo, TableInfo};
use intentsql_syntax::visit::{walk_call, Visitor};
use intentsql_syntax::{Call, Node, NodeKind, Property, SourceFile, SourceParser};
use std::path::{Path, PathBuf};

/// Map a root type call name to its canonical type; unknown tags pass through
pub fn canonical_type(tag: &str) -> &str {
    match tag {
        "uuid" => "uuid",
        "text" => "text",
        "varchar" => "varchar",
        "char" => "char",
        "integer" | "int" => "integer",
        "smallint" => "smallint",
        "bigint" => "bigint",
        "serial" => "serial",
        "bigserial" => "bigserial",
        "boolean" => "boolean",
        "timestamp" => "timestamp",
        "date" => "date",
        "time" => "time",
        "json" => "json",
        "jsonb" => "jsonb",
        "real" => "real",
        "doublePrecision" => "double precision",
        "numeric" | "decimal" => "numeric",
        other => other,
    }
}

/// Schema analyzer for one recognition vocabulary
pub struct SchemaAnalyzer {
    recognition: RecognitionConfig,
}

impl SchemaAnalyzer {
    pub fn new(recognition: RecognitionConfig) -> Self {
        Self { recognition }
    }

    /// Analyze schema files, skipping ones that cannot be read or parsed
    pub fn analyze_files(&self, paths: &[PathBuf]) -> SchemaInfo {
        let mut schema = SchemaInfo::new();

        for path in paths {
            match self.analyze_file(path) {
                Ok(partial) => schema.extend(partial),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping schema source");
                }
            }
        }

        schema
    }

    /// Read and analyze a single schema file
    pub fn analyze_file(&self, path: &Path) -> Result<SchemaInfo, AnalyzerError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::Io {
            path: display.clone(),
            source,
        })?;

        let mut parser = SourceParser::for_path(path)?;
        let file = parser.parse(&display, &text)?;
        Ok(self.analyze(&file))
    }

    /// Analyze schema source text
    pub fn analyze_source(&self, path: &str, text: &str) -> Result<SchemaInfo, AnalyzerError> {
        let mut parser = SourceParser::for_path(Path::new(path))?;
        let file = parser.parse(path, text)?;
        Ok(self.analyze(&file))
    }

    /// Analyze an already parsed file
    pub fn analyze(&self, file: &SourceFile) -> SchemaInfo {
        let mut tables: Vec<TableInfo> = Vec::new();
        // Index into `tables` of the most recent table declaration in this scope
        let mut last_table: Option<usize> = None;

        for statement in file.top_level() {
            let NodeKind::Declaration(decls) = &statement.kind else {
                continue;
            };

            for decl in decls {
                let Some(init) = decl.init.as_deref() else {
                    continue;
                };
                let Some(call) = init.as_call() else {
                    continue;
                };

                if self.is_table_call(call) {
                    match self.table_from_call(call, file).filter(TableInfo::is_valid) {
                        Some(table) => {
                            tracing::debug!(table = %table.name, columns = table.columns.len(), "found table");
                            tables.push(table);
                            last_table = Some(tables.len() - 1);
                        }
                        None => {
                            tracing::debug!(variable = %decl.name, "skipping table without name or columns");
                            last_table = None;
                        }
                    }
                } else if self.is_primary_key_composer(call) {
                    // Attributed by adjacency, not by resolving the referenced identifier
                    if let Some(table) = last_table.and_then(|i| tables.get_mut(i)) {
                        let columns = composite_key_columns(call);
                        if !columns.is_empty() {
                            table.primary_key = Some(resolve_key_columns(table, columns));
                        }
                    }
                }
            }
        }

        for table in &mut tables {
            if table.primary_key.is_none() {
                let keyed: Vec<String> = table
                    .columns
                    .iter()
                    .filter(|c| c.is_primary_key())
                    .map(|c| c.physical_name().to_string())
                    .collect();
                if !keyed.is_empty() {
                    table.primary_key = Some(keyed);
                }
            }
        }

        SchemaInfo {
            tables,
            relations: Vec::new(),
        }
    }

    fn is_table_call(&self, call: &Call) -> bool {
        call.callee_name()
            .is_some_and(|name| self.recognition.is_table_function(name))
    }

    fn is_primary_key_composer(&self, call: &Call) -> bool {
        call.callee_name() == Some(self.recognition.primary_key_function.as_str())
    }

    fn table_from_call(&self, call: &Call, file: &SourceFile) -> Option<TableInfo> {
        if !self.is_table_call(call) {
            return None;
        }

        let name = call.argument(0)?.as_str()?;
        let props = call.argument(1)?.as_object()?;

        let columns: Vec<ColumnInfo> = props
            .iter()
            .filter_map(|prop| column_from_property(prop, file))
            .collect();

        let mut table = TableInfo::new(name, columns);

        // pgTable('t', {...}, (t) => ({ pk: primaryKey(t.a, t.b) }))
        if let Some(extra) = call.argument(2) {
            let mut finder = ComposerFinder {
                composer: &self.recognition.primary_key_function,
                columns: Vec::new(),
            };
            finder.visit_node(extra);
            if !finder.columns.is_empty() {
                table.primary_key = Some(resolve_key_columns(&table, finder.columns));
            }
        }

        Some(table)
    }
}

impl Default for SchemaAnalyzer {
    fn default() -> Self {
        Self::new(RecognitionConfig::default())
    }
}

fn column_from_property(prop: &Property, file: &SourceFile) -> Option<ColumnInfo> {
    let key = prop.key.as_deref()?;
    let chain = MethodChain::unwind(&prop.value)?;

    let mut column = ColumnInfo::new(key, canonical_type(chain.root.name));

    column.db_name = Some(
        chain
            .root
            .argument(0)
            .and_then(|a| a.as_str())
            .unwrap_or(key)
            .to_string(),
    );
    column.enum_values = enum_domain(&chain.root);

    for modifier in &chain.modifiers {
        apply_modifier(&mut column, modifier, file);
    }

    Some(column)
}

fn enum_domain(root: &ChainCall<'_>) -> Option<Vec<String>> {
    let values = root
        .arguments
        .iter()
        .find_map(|arg| arg.property("enum"))?
        .as_array()?;

    let values: Vec<String> = values
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    (!values.is_empty()).then_some(values)
}

fn apply_modifier(column: &mut ColumnInfo, modifier: &ChainCall<'_>, file: &SourceFile) {
    match modifier.name {
        "notNull" => column.nullable = false,
        "primaryKey" => column.add_constraint(PRIMARY_KEY),
        "unique" => column.add_constraint(UNIQUE),
        "default" | "$default" | "$defaultFn" => {
            if let Some(value) = modifier.argument(0) {
                column.default_value = Some(default_text(value, file));
            }
        }
        "defaultNow" => column.default_value = Some("now()".to_string()),
        "defaultRandom" => column.default_value = Some("gen_random_uuid()".to_string()),
        "references" => {
            column.references = modifier.argument(0).and_then(reference_target);
        }
        _ => {}
    }
}

fn default_text(value: &Node, file: &SourceFile) -> String {
    match &value.kind {
        NodeKind::Str(s) => s.clone(),
        _ => file.text_of(value.span).to_string(),
    }
}

/// `() => table.column` resolves; any other arrow body does not
fn reference_target(arg: &Node) -> Option<ColumnReference> {
    let function = arg.as_function()?;
    let member = function.body.as_member()?;
    let table = member.object.as_ident()?;

    Some(ColumnReference {
        table: table.to_string(),
        column: member.property.clone(),
    })
}

/// Column properties referenced by a composer call
///
/// Accepts `primaryKey(t.a, t.b)`, `primaryKey([t.a, t.b])` and
/// `primaryKey({ columns: [t.a, t.b] })`.
fn composite_key_columns(call: &Call) -> Vec<String> {
    let mut columns = Vec::new();

    for arg in &call.arguments {
        match &arg.kind {
            NodeKind::Member(member) => columns.push(member.property.clone()),
            NodeKind::Array(items) => columns.extend(member_properties(items)),
            NodeKind::Object(_) => {
                if let Some(items) = arg.property("columns").and_then(|c| c.as_array()) {
                    columns.extend(member_properties(items));
                }
            }
            _ => {}
        }
    }

    columns
}

fn member_properties(items: &[Node]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .filter_map(|item| item.as_member().map(|m| m.property.clone()))
}

/// Translate column property names to physical names where known
fn resolve_key_columns(table: &TableInfo, columns: Vec<String>) -> Vec<String> {
    columns
        .into_iter()
        .map(|name| match table.find_column(&name) {
            Some(column) => column.physical_name().to_string(),
            None => name,
        })
        .collect()
}

struct ComposerFinder<'r> {
    composer: &'r str,
    columns: Vec<String>,
}

impl Visitor for ComposerFinder<'_> {
    fn visit_call(&mut self, call: &Call, _node: &Node) {
        if call.callee_name() == Some(self.composer) && self.columns.is_empty() {
            self.columns = composite_key_columns(call);
            return;
        }
        walk_call(self, call);
    }
}
