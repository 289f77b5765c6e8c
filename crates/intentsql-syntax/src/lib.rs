//! Source parsing and a closed syntax tree
//!
//! This crate handles:
//! - Parsing TypeScript/JavaScript with tree-sitter
//! - Lowering the concrete tree into [`NodeKind`], a closed set of node
//!   kinds relevant to schema and query recognition
//! - Walking the lowered tree with a [`Visitor`]
//! - Source positions and text slices for extracted nodes

pub mod ast;
pub mod parser;
pub mod visit;

pub use ast::{
    Call, Function, FunctionKind, Member, Node, NodeKind, Property, SourceFile, Span,
    TaggedTemplate, Template, VarDecl,
};
pub use parser::{parse_source, SourceLanguage, SourceParser, SyntaxError};
pub use visit::Visitor;
