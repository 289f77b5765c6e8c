//! Lowered syntax tree
//!
//! Only the node kinds the analyzers dispatch on get their own variant.
//! Everything else becomes [`NodeKind::Other`], which keeps its children so
//! traversal still reaches nested calls.

/// Byte range plus 1-based start position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program(Vec<Node>),
    /// `export ...` wrapper around a declaration or expression
    Export(Vec<Node>),
    /// `const`/`let`/`var` statement
    Declaration(Vec<VarDecl>),
    Function(Function),
    Call(Call),
    Member(Member),
    TaggedTemplate(TaggedTemplate),
    Template(Template),
    Object(Vec<Property>),
    Array(Vec<Node>),
    Ident(String),
    /// String literal, escapes already decoded
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Other(Vec<Node>),
}

/// One declarator of a variable statement
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// Binding name or pattern source text
    pub name: String,
    /// Annotation text without the leading colon
    pub type_annotation: Option<String>,
    pub init: Option<Box<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub kind: FunctionKind,
    pub name: Option<String>,
    /// Return annotation text without the leading colon
    pub return_type: Option<String>,
    pub params: Vec<Node>,
    /// Statement block or, for concise arrows, the expression
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Box<Node>,
    /// Generic arguments without angle brackets (`User[]` for `f<User[]>()`)
    pub type_arguments: Option<String>,
    pub arguments: Vec<Node>,
}

impl Call {
    /// Name of the invoked function: the identifier, or the accessed property
    pub fn callee_name(&self) -> Option<&str> {
        match &self.callee.kind {
            NodeKind::Ident(name) => Some(name),
            NodeKind::Member(member) => Some(&member.property),
            _ => None,
        }
    }

    pub fn argument(&self, index: usize) -> Option<&Node> {
        self.arguments.get(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub object: Box<Node>,
    pub property: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTemplate {
    pub tag: Box<Node>,
    pub type_arguments: Option<String>,
    pub template: Template,
}

/// Template literal split at its interpolation sites
///
/// `quasis` always holds one more segment than `expressions`: the head,
/// one segment after each interpolation, the last being the tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub quasis: Vec<String>,
    pub expressions: Vec<Node>,
}

impl Template {
    /// The literal text when there are no interpolations
    pub fn as_plain(&self) -> Option<&str> {
        match (self.expressions.is_empty(), self.quasis.first()) {
            (true, Some(text)) => Some(text),
            _ => None,
        }
    }
}

/// Object literal member; `key` is `None` for spreads
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: Option<String>,
    pub value: Node,
}

impl Node {
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            NodeKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match &self.kind {
            NodeKind::Member(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[Property]> {
        match &self.kind {
            NodeKind::Object(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Look up a keyed property of an object literal
    pub fn property(&self, key: &str) -> Option<&Node> {
        self.as_object()?
            .iter()
            .find(|p| p.key.as_deref() == Some(key))
            .map(|p| &p.value)
    }
}

/// A parsed file: path, text and lowered program
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
    pub program: Node,
}

impl SourceFile {
    /// Source text covered by a span
    pub fn text_of(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    /// Statements of the program, looking through `export` wrappers
    pub fn top_level(&self) -> Vec<&Node> {
        let NodeKind::Program(statements) = &self.program.kind else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            match &statement.kind {
                NodeKind::Export(inner) => out.extend(inner.iter()),
                _ => out.push(statement),
            }
        }
        out
    }
}
