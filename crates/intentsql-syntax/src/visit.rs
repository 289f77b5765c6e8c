//! Visitor over the lowered syntax tree
//!
//! Each `visit_*` method defaults to the matching `walk_*` function, so an
//! implementation overrides only the variants it cares about and calls the
//! walker to continue into children.

use crate::ast::*;

pub trait Visitor {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        walk_var_decl(self, decl);
    }

    fn visit_function(&mut self, function: &Function, _node: &Node) {
        walk_function(self, function);
    }

    fn visit_call(&mut self, call: &Call, _node: &Node) {
        walk_call(self, call);
    }

    fn visit_tagged_template(&mut self, tagged: &TaggedTemplate, _node: &Node) {
        walk_tagged_template(self, tagged);
    }
}

pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match &node.kind {
        NodeKind::Program(children)
        | NodeKind::Export(children)
        | NodeKind::Array(children)
        | NodeKind::Other(children) => {
            for child in children {
                visitor.visit_node(child);
            }
        }
        NodeKind::Declaration(decls) => {
            for decl in decls {
                visitor.visit_var_decl(decl);
            }
        }
        NodeKind::Function(function) => visitor.visit_function(function, node),
        NodeKind::Call(call) => visitor.visit_call(call, node),
        NodeKind::TaggedTemplate(tagged) => visitor.visit_tagged_template(tagged, node),
        NodeKind::Member(member) => visitor.visit_node(&member.object),
        NodeKind::Template(template) => {
            for expression in &template.expressions {
                visitor.visit_node(expression);
            }
        }
        NodeKind::Object(props) => {
            for prop in props {
                visitor.visit_node(&prop.value);
            }
        }
        NodeKind::Ident(_)
        | NodeKind::Str(_)
        | NodeKind::Num(_)
        | NodeKind::Bool(_)
        | NodeKind::Null => {}
    }
}

pub fn walk_var_decl<V: Visitor + ?Sized>(visitor: &mut V, decl: &VarDecl) {
    if let Some(init) = &decl.init {
        visitor.visit_node(init);
    }
}

pub fn walk_function<V: Visitor + ?Sized>(visitor: &mut V, function: &Function) {
    for param in &function.params {
        visitor.visit_node(param);
    }
    visitor.visit_node(&function.body);
}

pub fn walk_call<V: Visitor + ?Sized>(visitor: &mut V, call: &Call) {
    visitor.visit_node(&call.callee);
    for argument in &call.arguments {
        visitor.visit_node(argument);
    }
}

pub fn walk_tagged_template<V: Visitor + ?Sized>(visitor: &mut V, tagged: &TaggedTemplate) {
    visitor.visit_node(&tagged.tag);
    for expression in &tagged.template.expressions {
        visitor.visit_node(expression);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    #[derive(Default)]
    struct CallNames(Vec<String>);

    impl Visitor for CallNames {
        fn visit_call(&mut self, call: &Call, _node: &Node) {
            if let Some(name) = call.callee_name() {
                self.0.push(name.to_string());
            }
            walk_call(self, call);
        }
    }

    #[test]
    fn visits_calls_in_source_order() {
        let file = parse_source(
            "test.ts",
            r#"
            export async function load() {
                const rows = await fetchRows(build({ limit: max(1, 2) }));
                return rows.map((r) => format(r));
            }
            "#,
        )
        .unwrap();

        let mut names = CallNames::default();
        names.visit_node(&file.program);

        assert_eq!(names.0, vec!["fetchRows", "build", "max", "map", "format"]);
    }
}
