//! Query site collection
//!
//! Two shapes are recognized, purely by node shape:
//!
//! - call form: `db.llm('Get active users', { limit: 10 })`
//! - tagged-template form: `` llm`Get user with id ${userId}` ``
//!
//! Return types come from the first of: explicit generic argument, the
//! annotation of the enclosing variable declaration, and (call form only)
//! the enclosing function's return annotation with one `Promise<...>` removed.

use crate::error::AnalyzerError;
use intentsql_core::{CollectedQuery, ParamValue, Params, QueryLocation, RecognitionConfig};
use intentsql_syntax::visit::{walk_call, walk_function, walk_tagged_template, walk_var_decl, Visitor};
use intentsql_syntax::{Call, Function, Node, NodeKind, SourceFile, SourceParser, TaggedTemplate, VarDecl};
use std::path::{Path, PathBuf};

/// Collects query sites from source files
pub struct QueryCollector {
    recognition: RecognitionConfig,
}

impl QueryCollector {
    pub fn new(recognition: RecognitionConfig) -> Self {
        Self { recognition }
    }

    /// Collect from files in the given order; unreadable files are skipped
    pub fn collect_files(&self, paths: &[PathBuf]) -> Vec<CollectedQuery> {
        let mut queries = Vec::new();

        for path in paths {
            match self.collect_file(path) {
                Ok(found) => {
                    tracing::debug!(path = %path.display(), count = found.len(), "collected queries");
                    queries.extend(found);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping query source");
                }
            }
        }

        queries
    }

    /// Read and collect a single file
    pub fn collect_file(&self, path: &Path) -> Result<Vec<CollectedQuery>, AnalyzerError> {
        let display = normalize_path(path);
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::Io {
            path: display.clone(),
            source,
        })?;

        self.collect_source(&display, &text)
    }

    /// Collect from source text
    pub fn collect_source(&self, path: &str, text: &str) -> Result<Vec<CollectedQuery>, AnalyzerError> {
        let mut parser = SourceParser::for_path(Path::new(path))?;
        let file = parser.parse(path, text)?;
        Ok(self.collect(&file))
    }

    /// Collect from an already parsed file, in discovery order
    pub fn collect(&self, file: &SourceFile) -> Vec<CollectedQuery> {
        let mut visitor = CollectVisitor {
            recognition: &self.recognition,
            file,
            frames: Vec::new(),
            queries: Vec::new(),
        };
        visitor.visit_node(&file.program);
        visitor.queries
    }
}

impl Default for QueryCollector {
    fn default() -> Self {
        Self::new(RecognitionConfig::default())
    }
}

/// Location paths use forward slashes so identities match across platforms
fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Enclosing syntactic context of the node being visited
enum Frame {
    Function { return_type: Option<String> },
    Variable { type_annotation: Option<String> },
    Executor { expects_multiple: bool },
}

struct CollectVisitor<'a> {
    recognition: &'a RecognitionConfig,
    file: &'a SourceFile,
    frames: Vec<Frame>,
    queries: Vec<CollectedQuery>,
}

impl CollectVisitor<'_> {
    /// Annotation of the nearest variable declaration inside the current function
    fn variable_type(&self) -> Option<String> {
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Variable { type_annotation } => return type_annotation.clone(),
                Frame::Function { .. } => return None,
                Frame::Executor { .. } => {}
            }
        }
        None
    }

    /// Return annotation of the nearest enclosing function, `Promise<T>` unwrapped
    fn function_return_type(&self) -> Option<String> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Function { return_type } => Some(return_type.as_deref().map(unwrap_promise)),
            _ => None,
        })?
    }

    fn expects_multiple(&self) -> Option<bool> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Executor { expects_multiple } => Some(*expects_multiple),
            _ => None,
        })
    }

    fn location(&self, node: &Node) -> QueryLocation {
        QueryLocation::new(self.file.path.clone(), node.span.line, node.span.column)
    }

    fn is_query_call(&self, call: &Call) -> bool {
        let NodeKind::Member(member) = &call.callee.kind else {
            return false;
        };

        member.property == self.recognition.query_method
            && member
                .object
                .as_ident()
                .is_some_and(|name| self.recognition.is_query_object(name))
    }

    fn record_call(&mut self, call: &Call, node: &Node) {
        let intent = match call.argument(0).map(|a| &a.kind) {
            Some(NodeKind::Str(s)) => s.clone(),
            Some(NodeKind::Template(template)) => match template.as_plain() {
                Some(text) => text.to_string(),
                None => return,
            },
            _ => return,
        };

        let params = call
            .argument(1)
            .and_then(|arg| arg.as_object())
            .map(|props| {
                props
                    .iter()
                    .filter_map(|p| Some((p.key.clone()?, self.param_value(&p.value))))
                    .collect::<Params>()
            });

        let return_type = call
            .type_arguments
            .clone()
            .or_else(|| self.variable_type())
            .or_else(|| self.function_return_type());

        let query = CollectedQuery::new(intent, params, self.location(node))
            .with_return_type(return_type)
            .with_expects_multiple(self.expects_multiple());

        self.queries.push(query);
    }

    fn record_template(&mut self, tagged: &TaggedTemplate, node: &Node) {
        let template = &tagged.template;

        let mut intent = String::new();
        let mut params = Params::new();
        for (i, quasi) in template.quasis.iter().enumerate() {
            intent.push_str(quasi);
            if let Some(expression) = template.expressions.get(i) {
                intent.push_str(&format!("${{{i}}}"));
                params.insert(
                    format!("param{i}"),
                    ParamValue::Expression(self.file.text_of(expression.span).to_string()),
                );
            }
        }

        let params = (!params.is_empty()).then_some(params);
        let return_type = tagged
            .type_arguments
            .clone()
            .or_else(|| self.variable_type());

        self.queries
            .push(CollectedQuery::new(intent, params, self.location(node)).with_return_type(return_type));
    }

    fn param_value(&self, value: &Node) -> ParamValue {
        match &value.kind {
            NodeKind::Str(s) => ParamValue::String(s.clone()),
            NodeKind::Num(n) => ParamValue::Number(*n),
            NodeKind::Bool(b) => ParamValue::Bool(*b),
            NodeKind::Null => ParamValue::Null,
            _ => ParamValue::Expression(self.file.text_of(value.span).to_string()),
        }
    }
}

impl Visitor for CollectVisitor<'_> {
    fn visit_var_decl(&mut self, decl: &VarDecl) {
        self.frames.push(Frame::Variable {
            type_annotation: decl.type_annotation.clone(),
        });
        walk_var_decl(self, decl);
        self.frames.pop();
    }

    fn visit_function(&mut self, function: &Function, _node: &Node) {
        self.frames.push(Frame::Function {
            return_type: function.return_type.clone(),
        });
        walk_function(self, function);
        self.frames.pop();
    }

    fn visit_call(&mut self, call: &Call, node: &Node) {
        if self.is_query_call(call) {
            self.record_call(call, node);
        }

        let executor = match &call.callee.kind {
            NodeKind::Member(member) => self.recognition.executor_flag(&member.property),
            _ => None,
        };

        match executor {
            Some(expects_multiple) => {
                self.frames.push(Frame::Executor { expects_multiple });
                walk_call(self, call);
                self.frames.pop();
            }
            None => walk_call(self, call),
        }
    }

    fn visit_tagged_template(&mut self, tagged: &TaggedTemplate, node: &Node) {
        if tagged.tag.as_ident() == Some(self.recognition.template_tag.as_str()) {
            self.record_template(tagged, node);
        }
        walk_tagged_template(self, tagged);
    }
}

fn unwrap_promise(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("Promise<")
        .and_then(|inner| inner.strip_suffix('>'))
        .map(str::trim)
        .unwrap_or(text)
        .to_string()
}
