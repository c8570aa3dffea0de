//! Render-time binding of the emitted directives
//!
//! The host engine renders compiled templates itself. When it reaches a
//! `cotton_component` block it builds a [`ComponentCall`] from the directive
//! arguments, feeds it the rendered attribute and slot blocks, and renders the
//! fragment against the [`Scope`] returned by [`ComponentCall::bind`]. Scopes
//! are plain values nested by reference, so sibling invocations never share
//! slot or attribute bindings.

use crate::attributes::{parse_attributes, AttributeBinding};
use crate::error::{CompilerError, Result};
use crate::literal::parse_literal;
use crate::types::{
    AttributeKind, Value, ATTRS_VARIABLE, COMPONENT_DIRECTIVE, DEFAULT_SLOT_VARIABLE, SLOTS_VARIABLE,
};
use crate::utils::normalize_identifier;
use std::collections::HashMap;
use std::fmt;

/// Variable lookup as seen by a template being rendered
pub trait Context {
    /// Resolve a dotted path (`user.name`, `items.0`)
    fn lookup(&self, path: &str) -> Option<Value>;

    /// A value bound directly in this context, without falling through
    fn local(&self, _key: &str) -> Option<Value> {
        None
    }

    /// Attrs passthrough visible from this context, if any
    fn attributes(&self) -> Option<&[Attribute]> {
        None
    }

    /// Outermost context of the chain, normally the host's own globals
    fn root(&self) -> &dyn Context;
}

impl Context for HashMap<String, Value> {
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        self.get(first)?.lookup_path(segments).cloned()
    }

    fn local(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }

    fn root(&self) -> &dyn Context {
        self
    }
}

/// Evaluate an attribute expression: a context lookup first, then literal
/// conversion, and finally the raw text itself
pub fn evaluate_expression(expression: &str, context: &dyn Context) -> Value {
    let trimmed = expression.trim();
    context
        .lookup(trimmed)
        .or_else(|| parse_literal(trimmed))
        .unwrap_or_else(|| Value::Str(expression.to_string()))
}

/// One entry of the attrs passthrough
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// HTML-facing name, hyphens kept
    pub name: String,
    pub key: String,
    pub value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        Self {
            key: normalize_identifier(&name),
            name,
            value,
        }
    }
}

/// Passthrough string: `name="value"` pairs separated by a space,
/// boolean true rendered as the bare name
pub struct AttrsString<'a>(pub &'a [Attribute]);

impl fmt::Display for AttrsString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attribute) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match &attribute.value {
                Value::Bool(true) => write!(f, "{}", attribute.name)?,
                value => {
                    let text = value.to_string();
                    let quote = if text.contains('"') { '\'' } else { '"' };
                    write!(f, "{}={}{}{}", attribute.name, quote, text, quote)?;
                }
            }
        }
        Ok(())
    }
}

/// A layer of bindings over an optional parent context
#[derive(Default)]
pub struct Scope<'a> {
    parent: Option<&'a dyn Context>,
    bindings: HashMap<String, Value>,
    attributes: Option<Vec<Attribute>>,
}

impl<'a> Scope<'a> {
    /// Empty scope with no parent
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope that falls through to `parent` for anything it does not bind
    pub fn child(parent: &'a dyn Context) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Fragment scope: falls through only to the root of the caller's chain,
    /// so bindings local to enclosing components are never visible
    pub fn isolated(caller: &'a dyn Context) -> Self {
        Self::child(caller.root())
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.bindings.insert(key.into(), value);
    }

    pub fn set_attributes(&mut self, attributes: Vec<Attribute>) {
        self.attributes = Some(attributes);
    }

    /// Rendered attrs passthrough of this scope
    pub fn attrs_string(&self) -> Option<String> {
        self.attributes().map(|attrs| AttrsString(attrs).to_string())
    }
}

impl Context for Scope<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        if let Some(value) = self.bindings.get(first) {
            return value.lookup_path(segments).cloned();
        }
        if first == ATTRS_VARIABLE && segments.next().is_none() {
            if let Some(attributes) = &self.attributes {
                return Some(Value::Str(AttrsString(attributes).to_string()));
            }
        }
        self.parent.and_then(|parent| parent.lookup(path))
    }

    fn local(&self, key: &str) -> Option<Value> {
        self.bindings.get(key).cloned()
    }

    fn attributes(&self) -> Option<&[Attribute]> {
        match &self.attributes {
            Some(attributes) => Some(attributes),
            None => self.parent.and_then(|parent| parent.attributes()),
        }
    }

    fn root(&self) -> &dyn Context {
        match self.parent {
            Some(parent) => parent.root(),
            None => self,
        }
    }
}

/// Render-time state of one `cotton_component` block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentCall {
    template: String,
    attributes: Vec<AttributeBinding>,
    slots: Vec<(String, String)>,
    default_slot: String,
}

impl ComponentCall {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    /// Parse `"cotton/card.html" title="x" :count="n" flag`
    pub fn from_directive(args: &str) -> Result<Self> {
        let args = args.trim_start();
        let quote = match args.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                return Err(CompilerError::directive(
                    COMPONENT_DIRECTIVE,
                    "expected a quoted template path as first argument",
                ))
            }
        };
        let close = args[1..]
            .find(quote)
            .ok_or_else(|| CompilerError::directive(COMPONENT_DIRECTIVE, "unterminated template path"))?;

        let mut call = Self::new(&args[1..1 + close]);
        call.attributes = parse_attributes(&args[close + 2..])?;
        Ok(call)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn attributes(&self) -> &[AttributeBinding] {
        &self.attributes
    }

    /// Add an attribute whose value came from a `cotton_attr` block
    pub fn set_attribute(&mut self, raw_name: &str, rendered: impl Into<String>) {
        self.attributes.push(AttributeBinding::from_raw_name(raw_name, rendered));
    }

    pub fn fill_slot(&mut self, name: &str, rendered: impl Into<String>) {
        let rendered = rendered.into();
        match self.slots.iter_mut().find(|(slot, _)| slot == name) {
            Some(entry) => entry.1 = rendered,
            None => self.slots.push((name.to_string(), rendered)),
        }
    }

    pub fn set_default_slot(&mut self, rendered: impl Into<String>) {
        self.default_slot = rendered.into();
    }

    /// Build the fragment scope for this call.
    ///
    /// Attributes are evaluated against the caller in source order; a later
    /// attribute normalizing to the same key overwrites the earlier binding.
    /// Slots not filled by this call are simply absent.
    pub fn bind<'a>(&self, caller: &'a dyn Context) -> Scope<'a> {
        let mut scope = Scope::isolated(caller);
        let mut passthrough = Vec::with_capacity(self.attributes.len());

        for binding in &self.attributes {
            let value = match binding.kind {
                AttributeKind::Static => Value::Str(binding.value.clone()),
                AttributeKind::ValuelessBoolean => Value::Bool(true),
                AttributeKind::Dynamic => evaluate_expression(&binding.value, caller),
            };
            if scope.local(&binding.key).is_some() {
                log::warn!(
                    "{}: attribute '{}' overwrites an earlier binding of '{}'",
                    self.template, binding.name, binding.key
                );
            }
            scope.set(binding.key.clone(), value.clone());
            passthrough.push(Attribute {
                name: binding.name.clone(),
                key: binding.key.clone(),
                value,
            });
        }

        let mut named = Vec::with_capacity(self.slots.len());
        for (name, content) in &self.slots {
            let key = normalize_identifier(name);
            scope.set(key.clone(), Value::Str(content.clone()));
            named.push((key, Value::Str(content.clone())));
        }
        scope.set(SLOTS_VARIABLE, Value::Dict(named));
        scope.set(DEFAULT_SLOT_VARIABLE, Value::Str(self.default_slot.clone()));
        scope.set_attributes(passthrough);
        scope
    }
}
