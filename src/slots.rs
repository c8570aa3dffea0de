//! Slot resolution for component invocations

use crate::ast::{NamedSlot, Node};
use crate::error::{CompilerError, Result};

/// Children of one invocation split into named slots and default content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedSlots {
    pub named: Vec<NamedSlot>,
    pub default_content: Vec<Node>,
}

/// Partition an invocation's children. Every `<c-slot>` child becomes a
/// named slot; everything else, whitespace included, is default content.
/// A repeated slot name replaces the earlier one.
pub fn resolve_slots(children: Vec<Node>, component: &str, file: &str) -> Result<ResolvedSlots> {
    let mut resolved = ResolvedSlots::default();

    for child in children {
        match child {
            Node::Slot(slot) => {
                ensure_no_orphans(&slot.content, file)?;
                if let Some(index) = resolved.named.iter().position(|s| s.name == slot.name) {
                    log::warn!(
                        "{}:{}: slot '{}' of <c-{}> filled more than once, keeping the last one",
                        file, slot.line, slot.name, component
                    );
                    resolved.named.remove(index);
                }
                resolved.named.push(slot);
            }
            Node::Vars(vars) => {
                return Err(CompilerError::vars(
                    file,
                    vars.line,
                    format!("<c-vars> inside <c-{}> must be declared at the top level of a template", component),
                ));
            }
            other => resolved.default_content.push(other),
        }
    }

    Ok(resolved)
}

/// Fail if `nodes` contains a `<c-slot>` that no component owns
pub fn ensure_no_orphans(nodes: &[Node], file: &str) -> Result<()> {
    for node in nodes {
        if let Node::Slot(slot) = node {
            return Err(CompilerError::slot(
                file,
                slot.line,
                format!("<c-slot name=\"{}\"> must be a direct child of a component", slot.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VarsDeclaration;

    fn slot(name: &str, text: &str) -> Node {
        Node::Slot(NamedSlot {
            name: name.to_string(),
            content: vec![Node::text(text)],
            line: 1,
        })
    }

    #[test]
    fn test_partition_named_and_default() {
        let children = vec![Node::text("\n component1 \n"), slot("named_slot", "named slot 1"), Node::text("\n")];
        let resolved = resolve_slots(children, "test-component", "view.html").unwrap();
        assert_eq!(resolved.named.len(), 1);
        assert_eq!(resolved.named[0].name, "named_slot");
        assert_eq!(resolved.default_content, vec![Node::text("\n component1 \n"), Node::text("\n")]);
    }

    #[test]
    fn test_no_slots_means_empty_named() {
        let resolved = resolve_slots(vec![Node::text("only default")], "c", "v.html").unwrap();
        assert!(resolved.named.is_empty());
        assert_eq!(resolved.default_content.len(), 1);
    }

    #[test]
    fn test_duplicate_slot_last_wins() {
        let children = vec![slot("a", "first"), slot("b", "other"), slot("a", "second")];
        let resolved = resolve_slots(children, "c", "v.html").unwrap();
        let names: Vec<&str> = resolved.named.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(resolved.named[1].content, vec![Node::text("second")]);
    }

    #[test]
    fn test_nested_slot_in_slot_is_orphan() {
        let inner = slot("inner", "x");
        let outer = Node::Slot(NamedSlot {
            name: "outer".to_string(),
            content: vec![inner],
            line: 2,
        });
        let err = resolve_slots(vec![outer], "c", "v.html").unwrap_err();
        assert!(matches!(err, CompilerError::Slot { .. }));
    }

    #[test]
    fn test_vars_inside_component_rejected() {
        let vars = Node::Vars(VarsDeclaration { attributes: Vec::new(), line: 3 });
        let err = resolve_slots(vec![vars], "c", "v.html").unwrap_err();
        assert!(matches!(err, CompilerError::Vars { line: 3, .. }));
    }
}
