//! Method chain unwinding
//!
//! A column initializer such as `text('email').notNull().unique()` is a
//! nest of call and property-access nodes with the root type call innermost.
//! [`MethodChain::unwind`] folds that nest into one record per call, in
//! source order.

use intentsql_syntax::{Node, NodeKind};

/// One call in a chain
#[derive(Debug, Clone, Copy)]
pub struct ChainCall<'a> {
    pub name: &'a str,
    pub arguments: &'a [Node],
}

impl<'a> ChainCall<'a> {
    pub fn argument(&self, index: usize) -> Option<&'a Node> {
        self.arguments.get(index)
    }
}

/// Root type call plus modifiers in source order
#[derive(Debug, Clone)]
pub struct MethodChain<'a> {
    pub root: ChainCall<'a>,
    pub modifiers: Vec<ChainCall<'a>>,
}

impl<'a> MethodChain<'a> {
    /// Unwind a call expression from the outermost call inward.
    ///
    /// The root is the innermost call whose callee is an identifier
    /// (`uuid(...)`) or a property of a non-call receiver (`t.uuid(...)`).
    /// Returns `None` when the nest bottoms out in anything else.
    pub fn unwind(node: &'a Node) -> Option<Self> {
        let mut modifiers = Vec::new();
        let mut current = node;

        let root = loop {
            let NodeKind::Call(call) = &current.kind else {
                return None;
            };

            match &call.callee.kind {
                NodeKind::Ident(name) => {
                    break ChainCall {
                        name,
                        arguments: &call.arguments,
                    };
                }
                NodeKind::Member(member) if matches!(member.object.kind, NodeKind::Call(_)) => {
                    modifiers.push(ChainCall {
                        name: &member.property,
                        arguments: &call.arguments,
                    });
                    current = &member.object;
                }
                NodeKind::Member(member) => {
                    break ChainCall {
                        name: &member.property,
                        arguments: &call.arguments,
                    };
                }
                _ => return None,
            }
        };

        modifiers.reverse();
        Some(Self { root, modifiers })
    }

    /// Modifier names in source order
    pub fn modifier_names(&self) -> Vec<&'a str> {
        self.modifiers.iter().map(|m| m.name).collect()
    }

    /// Last occurrence of a modifier, which wins over earlier ones
    pub fn last(&self, name: &str) -> Option<&ChainCall<'a>> {
        self.modifiers.iter().rev().find(|m| m.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.name == name)
    }
}
