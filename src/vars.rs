//! `<c-vars>` declarations and the vars frame they produce
//!
//! At compile time a template's single `<c-vars>` tag is lifted out of the
//! node list into a [`VarsFrame`]. At render time the host rebuilds the same
//! frame from the `cotton_vars_frame` directive arguments and applies it to
//! the fragment scope.

use crate::ast::{Node, VarsDeclaration};
use crate::attributes::{classify_name, AttributeBinding};
use crate::error::{CompilerError, Result};
use crate::runtime::{evaluate_expression, Context, Scope};
use crate::types::{AttributeKind, Value, VARS_FRAME_DIRECTIVE};
use crate::utils::{is_valid_identifier, normalize_identifier};
use std::collections::HashSet;

/// Component-local default variables
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarsFrame {
    pub declarations: Vec<AttributeBinding>,
    pub line: usize,
}

impl VarsFrame {
    pub fn new(declarations: Vec<AttributeBinding>) -> Self {
        Self { declarations, line: 0 }
    }

    /// Normalized keys of every declared variable
    pub fn keys(&self) -> HashSet<&str> {
        self.declarations.iter().map(|d| d.key.as_str()).collect()
    }

    /// True if an attribute with this name is shadowed by a declared var
    /// and therefore excluded from the attrs passthrough
    pub fn excludes(&self, attribute_name: &str) -> bool {
        let key = normalize_identifier(attribute_name);
        self.declarations.iter().any(|d| d.key == key)
    }

    /// Rebuild a frame from `cotton_vars_frame` directive arguments, e.g.
    /// `var1=var1|default:"text" count=count|default:1 flag=flag|default:True`
    pub fn from_directive(args: &str) -> Result<Self> {
        let mut declarations = Vec::new();
        for token in split_directive_args(args)? {
            declarations.push(parse_declaration(&token)?);
        }
        Ok(Self::new(declarations))
    }

    /// Add a default supplied in block form (`{% cotton_var NAME %}...`)
    pub fn set_default(&mut self, raw_name: &str, rendered: impl Into<String>) {
        self.declarations.push(AttributeBinding::from_raw_name(raw_name, rendered));
    }

    /// Apply the frame on top of a fragment scope.
    ///
    /// A declared key keeps the value the caller supplied for it when the
    /// scope holds one locally, otherwise it gets the default. The attrs
    /// passthrough of the returned scope no longer contains declared names.
    pub fn apply<'a>(&self, scope: &'a dyn Context) -> Scope<'a> {
        let mut frame = Scope::child(scope);
        for declaration in &self.declarations {
            let value = scope
                .local(&declaration.key)
                .unwrap_or_else(|| default_value(declaration, scope));
            frame.set(declaration.key.clone(), value);
        }

        if let Some(attributes) = scope.attributes() {
            let keys = self.keys();
            let remaining = attributes
                .iter()
                .filter(|attribute| !keys.contains(attribute.key.as_str()))
                .cloned()
                .collect();
            frame.set_attributes(remaining);
        }
        frame
    }
}

fn default_value(declaration: &AttributeBinding, scope: &dyn Context) -> Value {
    match declaration.kind {
        AttributeKind::Static => Value::Str(declaration.value.clone()),
        AttributeKind::ValuelessBoolean => Value::Bool(true),
        AttributeKind::Dynamic => evaluate_expression(&declaration.value, scope),
    }
}

/// Lift the template's `<c-vars>` declaration out of its top-level nodes.
/// Declarations nested in components are rejected by the slot resolver.
pub fn extract_vars_frame(nodes: Vec<Node>, file: &str) -> Result<(Option<VarsFrame>, Vec<Node>)> {
    let mut frame: Option<VarsFrame> = None;
    let mut remaining = Vec::with_capacity(nodes.len());

    for node in nodes {
        match node {
            Node::Vars(VarsDeclaration { attributes, line }) => {
                if let Some(existing) = &frame {
                    return Err(CompilerError::vars(
                        file,
                        line,
                        format!("only one <c-vars> is allowed per template (first declared at line {})", existing.line),
                    ));
                }
                log::debug!("{}: <c-vars> declares {} variable(s)", file, attributes.len());
                frame = Some(VarsFrame { declarations: attributes, line });
            }
            other => remaining.push(other),
        }
    }

    Ok((frame, remaining))
}

/// Split on whitespace outside quotes
fn split_directive_args(args: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in args.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                current.push(ch);
                quote = Some(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err(CompilerError::directive(VARS_FRAME_DIRECTIVE, format!("unterminated quote in '{}'", args)));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse one `key=key|default:VALUE` declaration
fn parse_declaration(token: &str) -> Result<AttributeBinding> {
    let malformed = || CompilerError::directive(VARS_FRAME_DIRECTIVE, format!("malformed declaration '{}'", token));

    let (raw_key, rest) = token.split_once('=').ok_or_else(malformed)?;
    let (key, _) = classify_name(raw_key);
    if !is_valid_identifier(&key) {
        return Err(malformed());
    }
    let default = rest
        .strip_prefix(key.as_str())
        .and_then(|r| r.strip_prefix("|default:"))
        .ok_or_else(malformed)?;

    let binding = match default.chars().next() {
        Some(q @ ('"' | '\'')) if default.len() >= 2 && default.ends_with(q) => {
            let mut binding = AttributeBinding::new(key, &default[1..default.len() - 1], AttributeKind::Static);
            binding.quote = Some(q);
            binding
        }
        Some(_) if default == "True" => {
            let mut binding = AttributeBinding::new(key, "", AttributeKind::ValuelessBoolean);
            binding.quote = None;
            binding
        }
        Some(_) => AttributeBinding::new(key, default, AttributeKind::Dynamic),
        None => return Err(malformed()),
    };
    Ok(binding)
}
