//! Core types and constants for the cotton compiler

use serde::Serialize;
use std::fmt;

// Tag dialect
pub const TAG_PREFIX: &str = "c-";
pub const VARS_TAG: &str = "vars";
pub const SLOT_TAG: &str = "slot";
pub const DYNAMIC_SIGIL: char = ':';

// Emitted directive surface
pub const COMPONENT_DIRECTIVE: &str = "cotton_component";
pub const COMPONENT_END_DIRECTIVE: &str = "endcotton_component";
pub const ATTR_DIRECTIVE: &str = "cotton_attr";
pub const ATTR_END_DIRECTIVE: &str = "endcotton_attr";
pub const SLOT_DIRECTIVE: &str = "cotton_slot";
pub const SLOT_END_DIRECTIVE: &str = "endcotton_slot";
pub const VARS_FRAME_DIRECTIVE: &str = "cotton_vars_frame";
pub const VARS_FRAME_END_DIRECTIVE: &str = "endcotton_vars_frame";
pub const VAR_DIRECTIVE: &str = "cotton_var";
pub const VAR_END_DIRECTIVE: &str = "endcotton_var";

// Names bound into every fragment scope
pub const ATTRS_VARIABLE: &str = "attrs";
pub const DEFAULT_SLOT_VARIABLE: &str = "slot";
pub const SLOTS_VARIABLE: &str = "slots";

// Defaults
pub const DEFAULT_COMPONENT_ROOT: &str = "cotton";
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "html";

// Limits
pub const MAX_NESTING_DEPTH: usize = 64;
pub const MAX_LITERAL_DEPTH: usize = 32;

/// Classification of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttributeKind {
    /// Literal string
    Static,
    /// Host-engine expression, evaluated at render time
    Dynamic,
    /// Attribute present without a value, bound as `true`
    ValuelessBoolean,
}

/// A typed value, either converted from a literal or produced at bind time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Vec<(String, Value)>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Look up a single path segment: a key for mappings, an index for lists
    pub fn get(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries
                .iter()
                .rev()
                .find(|(key, _)| key == segment)
                .map(|(_, value)| value),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Walk a dotted path (`a.0.key`) starting at this value
    pub fn lookup_path<'a, I>(&self, segments: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => {
                if s.contains('\'') && !s.contains('"') {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "'{}'", s.replace('\'', "\\'"))
                }
            }
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_repr(f)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': ", key)?;
                    value.fmt_repr(f)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
