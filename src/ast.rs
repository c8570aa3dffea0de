//! Syntax tree for templates containing component tags

use crate::attributes::AttributeBinding;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Text copied through unchanged, host syntax included
    Text { text: String },
    /// A `<c-name>` invocation
    Component(ComponentInvocation),
    /// A `<c-slot name="...">` not yet claimed by its component
    Slot(NamedSlot),
    /// A `<c-vars ... />` declaration not yet lifted into the document frame
    Vars(VarsDeclaration),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text { text } if text.trim().is_empty())
    }
}

/// One `<c-name ...>` occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentInvocation {
    /// Name as written after the prefix (`forms.input`)
    pub name: String,
    /// Fragment template the invocation renders (`cotton/forms/input.html`)
    pub template: String,
    pub attributes: Vec<AttributeBinding>,
    /// Named slots in source order
    pub slots: Vec<NamedSlot>,
    /// Everything that is not a named slot
    pub default_content: Vec<Node>,
    pub self_closing: bool,
    pub offset: usize,
    pub line: usize,
}

impl ComponentInvocation {
    pub fn slot(&self, name: &str) -> Option<&NamedSlot> {
        self.slots.iter().rev().find(|slot| slot.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSlot {
    pub name: String,
    pub content: Vec<Node>,
    pub line: usize,
}

/// A `<c-vars>` declaration as found in the source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarsDeclaration {
    pub attributes: Vec<AttributeBinding>,
    pub line: usize,
}

/// Root of a parsed template
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    /// Every component invocation in the tree, depth first in source order
    pub fn components(&self) -> Vec<&ComponentInvocation> {
        let mut found = Vec::new();
        collect_components(&self.nodes, &mut found);
        found
    }
}

fn collect_components<'a>(nodes: &'a [Node], found: &mut Vec<&'a ComponentInvocation>) {
    for node in nodes {
        match node {
            Node::Component(invocation) => {
                found.push(invocation);
                for slot in &invocation.slots {
                    collect_components(&slot.content, found);
                }
                collect_components(&invocation.default_content, found);
            }
            Node::Slot(slot) => collect_components(&slot.content, found),
            Node::Text { .. } | Node::Vars(_) => {}
        }
    }
}
