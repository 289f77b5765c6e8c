//! Source parsing using tree-sitter
//!
//! Parses TypeScript/JavaScript and lowers the concrete syntax tree into the
//! closed [`NodeKind`] model. tree-sitter is error tolerant, so malformed
//! regions become `Other` nodes instead of failing the whole file.

use crate::ast::*;
use std::path::Path;
use tree_sitter::Parser;

/// Grammar used to parse a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    /// `.ts`, `.js` and friends
    TypeScript,
    /// `.tsx`, `.jsx`
    Tsx,
}

impl SourceLanguage {
    /// Detect the grammar from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("tsx") | Some("jsx") => Self::Tsx,
            _ => Self::TypeScript,
        }
    }

    fn grammar(self) -> tree_sitter::Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Parser for one source language
pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    /// Create a parser for the given grammar
    pub fn new(language: SourceLanguage) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| SyntaxError::Language(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Create a parser suited to a file path
    pub fn for_path(path: &Path) -> Result<Self, SyntaxError> {
        Self::new(SourceLanguage::from_path(path))
    }

    /// Parse source text into a lowered [`SourceFile`]
    pub fn parse(&mut self, path: &str, text: &str) -> Result<SourceFile, SyntaxError> {
        let tree = self
            .parser
            .parse(text, None)
            .ok_or_else(|| SyntaxError::ParseFailed { path: path.to_string() })?;

        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(path, "source contains syntax errors, continuing with partial tree");
        }

        let program = Lowering { src: text }.lower(root);

        Ok(SourceFile {
            path: path.to_string(),
            text: text.to_string(),
            program,
        })
    }
}

/// Parse a single file in one step
pub fn parse_source(path: &str, text: &str) -> Result<SourceFile, SyntaxError> {
    SourceParser::for_path(Path::new(path))?.parse(path, text)
}

/// Parsing error
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("failed to load grammar: {0}")]
    Language(String),

    #[error("parser produced no tree for {path}")]
    ParseFailed { path: String },
}

struct Lowering<'s> {
    src: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: tree_sitter::Node) -> &'s str {
        self.src.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }

    fn span(&self, node: tree_sitter::Node) -> Span {
        self.span_between(node, node)
    }

    /// Span from the start of `first` to the end of `last`
    fn span_between(&self, first: tree_sitter::Node, last: tree_sitter::Node) -> Span {
        let start = first.start_byte();
        let line_start = self.src[..start.min(self.src.len())]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let column = self.src.get(line_start..start).map_or(0, |s| s.chars().count()) + 1;

        Span {
            start,
            end: last.end_byte(),
            line: first.start_position().row + 1,
            column,
        }
    }

    fn named_children(&self, node: tree_sitter::Node<'_>) -> Vec<Node> {
        let mut cursor = node.walk();
        let children: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|c| !c.is_extra())
            .collect();
        children.into_iter().map(|c| self.lower(c)).collect()
    }

    fn lower(&self, node: tree_sitter::Node<'_>) -> Node {
        let span = self.span(node);

        let kind = match node.kind() {
            "program" => NodeKind::Program(self.named_children(node)),
            "export_statement" => NodeKind::Export(self.named_children(node)),
            "lexical_declaration" | "variable_declaration" => {
                NodeKind::Declaration(self.declarators(node))
            }
            "function_declaration" | "generator_function_declaration" => {
                NodeKind::Function(self.function(node, FunctionKind::Declaration))
            }
            "function_expression" | "function" | "generator_function" => {
                NodeKind::Function(self.function(node, FunctionKind::Expression))
            }
            "arrow_function" => NodeKind::Function(self.function(node, FunctionKind::Arrow)),
            "method_definition" => NodeKind::Function(self.function(node, FunctionKind::Method)),
            "call_expression" => self.call(node),
            "member_expression" => match (
                node.child_by_field_name("object"),
                node.child_by_field_name("property"),
            ) {
                (Some(object), Some(property)) => NodeKind::Member(Member {
                    object: Box::new(self.lower(object)),
                    property: self.text(property).to_string(),
                }),
                _ => NodeKind::Other(self.named_children(node)),
            },
            "template_string" => NodeKind::Template(self.template(node)),
            "binary_expression" => self
                .generic_tagged_template(node)
                .unwrap_or_else(|| NodeKind::Other(self.named_children(node))),
            "object" => NodeKind::Object(self.properties(node)),
            "array" => NodeKind::Array(self.named_children(node)),
            "identifier" | "property_identifier" | "shorthand_property_identifier" | "this"
            | "undefined" => NodeKind::Ident(self.text(node).to_string()),
            "string" => NodeKind::Str(string_value(self.text(node))),
            "number" => match parse_number(self.text(node)) {
                Some(n) => NodeKind::Num(n),
                None => NodeKind::Other(Vec::new()),
            },
            "true" => NodeKind::Bool(true),
            "false" => NodeKind::Bool(false),
            "null" => NodeKind::Null,
            "parenthesized_expression" => {
                let mut inner = self.named_children(node);
                if inner.len() == 1 {
                    return inner.remove(0);
                }
                NodeKind::Other(inner)
            }
            _ => NodeKind::Other(self.named_children(node)),
        };

        Node { kind, span }
    }

    fn declarators(&self, node: tree_sitter::Node<'_>) -> Vec<VarDecl> {
        let mut cursor = node.walk();
        let declarators: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();

        declarators
            .into_iter()
            .map(|d| VarDecl {
                name: d
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                type_annotation: d
                    .child_by_field_name("type")
                    .map(|t| strip_annotation(self.text(t))),
                init: d
                    .child_by_field_name("value")
                    .map(|v| Box::new(self.lower(v))),
                span: self.span(d),
            })
            .collect()
    }

    fn function(&self, node: tree_sitter::Node<'_>, kind: FunctionKind) -> Function {
        let params = match node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"))
        {
            Some(p) if p.kind() == "formal_parameters" => self.named_children(p),
            Some(p) => vec![self.lower(p)],
            None => Vec::new(),
        };

        let body = match node.child_by_field_name("body") {
            Some(body) => self.lower(body),
            None => Node {
                kind: NodeKind::Other(Vec::new()),
                span: self.span(node),
            },
        };

        Function {
            kind,
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string()),
            return_type: node
                .child_by_field_name("return_type")
                .map(|t| strip_annotation(self.text(t))),
            params,
            body: Box::new(body),
        }
    }

    /// Operand of an `await_expression`
    fn awaited<'t>(&self, node: tree_sitter::Node<'t>) -> Option<tree_sitter::Node<'t>> {
        if node.kind() != "await_expression" {
            return None;
        }
        let mut cursor = node.walk();
        let operand = node.named_children(&mut cursor).find(|c| !c.is_extra());
        operand
    }

    /// `await` has no node kind of its own; it lowers to `Other` around its operand
    fn await_wrapped(&self, inner: Node) -> NodeKind {
        NodeKind::Other(vec![inner])
    }

    fn call(&self, node: tree_sitter::Node<'_>) -> NodeKind {
        let Some(function) = node.child_by_field_name("function") else {
            return NodeKind::Other(self.named_children(node));
        };

        // `await db.llm<T>(...)` parses with the await inside the callee
        if let Some(operand) = self.awaited(function) {
            if node.child_by_field_name("type_arguments").is_some() {
                let call = Node {
                    kind: self.call_with_callee(node, operand),
                    span: self.span_between(operand, node),
                };
                return self.await_wrapped(call);
            }
        }

        self.call_with_callee(node, function)
    }

    fn call_with_callee(&self, node: tree_sitter::Node<'_>, function: tree_sitter::Node<'_>) -> NodeKind {
        let type_arguments = node
            .child_by_field_name("type_arguments")
            .map(|t| strip_type_arguments(self.text(t)));
        let callee = Box::new(self.lower(function));

        match node.child_by_field_name("arguments") {
            Some(args) if args.kind() == "template_string" => {
                NodeKind::TaggedTemplate(TaggedTemplate {
                    tag: callee,
                    type_arguments,
                    template: self.template(args),
                })
            }
            Some(args) => NodeKind::Call(Call {
                callee,
                type_arguments,
                arguments: self.named_children(args),
            }),
            None => NodeKind::Call(Call {
                callee,
                type_arguments,
                arguments: Vec::new(),
            }),
        }
    }

    /// Recover `` tag<T>`...` ``, which the grammar reads as
    /// `(tag < T) > template`
    ///
    /// Only a bare identifier tag (optionally awaited) is recognized. The
    /// type argument is the source text between the two operators.
    fn generic_tagged_template(&self, node: tree_sitter::Node<'_>) -> Option<NodeKind> {
        let close = node.child_by_field_name("operator").filter(|op| op.kind() == ">")?;
        let template = node
            .child_by_field_name("right")
            .filter(|right| right.kind() == "template_string")?;
        let comparison = node
            .child_by_field_name("left")
            .filter(|left| left.kind() == "binary_expression")?;
        let open = comparison
            .child_by_field_name("operator")
            .filter(|op| op.kind() == "<")?;
        let left = comparison.child_by_field_name("left")?;

        let (tag, awaited) = match self.awaited(left) {
            Some(operand) => (operand, true),
            None => (left, false),
        };
        if tag.kind() != "identifier" {
            return None;
        }

        let type_arguments = self.src.get(open.end_byte()..close.start_byte())?.trim();
        if type_arguments.is_empty() {
            return None;
        }

        let tagged = NodeKind::TaggedTemplate(TaggedTemplate {
            tag: Box::new(self.lower(tag)),
            type_arguments: Some(type_arguments.to_string()),
            template: self.template(template),
        });

        if awaited {
            let inner = Node {
                kind: tagged,
                span: self.span_between(tag, node),
            };
            Some(self.await_wrapped(inner))
        } else {
            Some(tagged)
        }
    }

    /// Split a template literal at its substitutions.
    ///
    /// Segments are cut from the raw text between delimiters: the head runs
    /// from the opening backtick to the first `${`, middles from `}` to the
    /// next `${`, and the tail from the last `}` to the closing backtick.
    fn template(&self, node: tree_sitter::Node<'_>) -> Template {
        let close = node.end_byte().saturating_sub(1);
        let mut segment_start = (node.start_byte() + 1).min(close);
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        let mut cursor = node.walk();
        let substitutions: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "template_substitution")
            .collect();

        for substitution in substitutions {
            let raw = self.src.get(segment_start..substitution.start_byte()).unwrap_or("");
            quasis.push(unescape(raw));

            let mut inner = self.named_children(substitution);
            expressions.push(if inner.len() == 1 {
                inner.remove(0)
            } else {
                Node {
                    kind: NodeKind::Other(inner),
                    span: self.span(substitution),
                }
            });

            segment_start = substitution.end_byte();
        }

        let tail = self.src.get(segment_start..close).unwrap_or("");
        quasis.push(unescape(tail));

        Template { quasis, expressions }
    }

    fn properties(&self, node: tree_sitter::Node<'_>) -> Vec<Property> {
        let mut cursor = node.walk();
        let members: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|c| !c.is_extra())
            .collect();

        members
            .into_iter()
            .filter_map(|member| match member.kind() {
                "pair" => {
                    let key = member.child_by_field_name("key")?;
                    let value = member.child_by_field_name("value")?;
                    Some(Property {
                        key: Some(self.property_key(key)),
                        value: self.lower(value),
                    })
                }
                "shorthand_property_identifier" => Some(Property {
                    key: Some(self.text(member).to_string()),
                    value: self.lower(member),
                }),
                "method_definition" => Some(Property {
                    key: member
                        .child_by_field_name("name")
                        .map(|n| self.property_key(n)),
                    value: self.lower(member),
                }),
                _ => Some(Property {
                    key: None,
                    value: self.lower(member),
                }),
            })
            .collect()
    }

    fn property_key(&self, key: tree_sitter::Node<'_>) -> String {
        match key.kind() {
            "string" => string_value(self.text(key)),
            _ => self.text(key).to_string(),
        }
    }
}

fn strip_annotation(text: &str) -> String {
    text.trim().trim_start_matches(':').trim().to_string()
}

fn strip_type_arguments(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(text)
        .trim()
        .to_string()
}

/// Decode a quoted string literal
fn string_value(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        ""
    };
    unescape(inner)
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.trim_end_matches('n');
    let lower = cleaned.to_ascii_lowercase();

    let radix = |prefix: &str, radix: u32| {
        lower
            .strip_prefix(prefix)
            .and_then(|digits| i64::from_str_radix(digits, radix).ok())
            .map(|n| n as f64)
    };

    radix("0x", 16)
        .or_else(|| radix("0o", 8))
        .or_else(|| radix("0b", 2))
        .or_else(|| cleaned.parse().ok())
}

/// Decode JavaScript escape sequences
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };

        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('x');
                        out.push_str(&hex);
                    }
                }
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            other => out.push(other),
        }
    }

    out
}
