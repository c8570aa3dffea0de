//! Attribute parsing for component tags
//!
//! The scanner is a small explicit state machine: it walks the attribute
//! list of one tag, tracking the opening quote character of every value and
//! treating host constructs (`{{ ... }}`, `{% ... %}`) inside quoted values as
//! opaque, so neither a nested quote nor a `}` or `>` in them ends the value.

use crate::error::{CompilerError, Position, Result};
use crate::literal::parse_literal;
use crate::types::{AttributeKind, Value, DYNAMIC_SIGIL};
use crate::utils::{needs_block_form, normalize_identifier};
use serde::Serialize;

/// One attribute of a component tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeBinding {
    /// Name as written, sigil stripped, hyphens kept (`x-data`)
    pub name: String,
    /// Host-engine identifier the value is bound under (`x_data`)
    pub key: String,
    /// Raw value text, byte-for-byte
    pub value: String,
    /// Quote character the value was written with, if any
    pub quote: Option<char>,
    pub kind: AttributeKind,
    /// Byte offset of the attribute name in the scanned source
    pub offset: usize,
}

impl AttributeBinding {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: AttributeKind) -> Self {
        let name = name.into();
        Self {
            key: normalize_identifier(&name),
            name,
            value: value.into(),
            quote: Some('"'),
            kind,
            offset: 0,
        }
    }

    /// Build a binding from a raw name that may carry the dynamic sigil
    pub fn from_raw_name(raw_name: &str, value: impl Into<String>) -> Self {
        let (name, kind) = classify_name(raw_name);
        Self::new(name, value, kind)
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == AttributeKind::Dynamic
    }

    /// The name as it has to be written to round-trip through the parser:
    /// dynamic attributes get their sigil back, a static name that itself
    /// starts with the sigil is escaped by doubling it.
    pub fn written_name(&self) -> String {
        let sigil_needed = match self.kind {
            AttributeKind::Dynamic => true,
            AttributeKind::Static | AttributeKind::ValuelessBoolean => {
                self.name.starts_with(DYNAMIC_SIGIL)
            }
        };
        if sigil_needed {
            format!("{}{}", DYNAMIC_SIGIL, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Render the attribute back into tag/directive argument form
    pub fn source_form(&self) -> String {
        match self.kind {
            AttributeKind::ValuelessBoolean => self.written_name(),
            AttributeKind::Static | AttributeKind::Dynamic => {
                let quote = self.emit_quote();
                format!("{}={}{}{}", self.written_name(), quote, self.value, quote)
            }
        }
    }

    /// Quote character used when emitting the value inline
    pub fn emit_quote(&self) -> char {
        match self.quote {
            Some(q) if !self.value.contains(q) => q,
            _ if self.value.contains('"') => '\'',
            _ => '"',
        }
    }

    /// True when the value cannot be emitted inline inside a host tag
    pub fn needs_block_form(&self) -> bool {
        match self.kind {
            AttributeKind::ValuelessBoolean => false,
            AttributeKind::Static | AttributeKind::Dynamic => {
                needs_block_form(&self.value)
                    || (self.value.contains('"') && self.value.contains('\''))
            }
        }
    }

    /// Typed view of the value: literal conversion for dynamic values,
    /// `true` for valueless attributes, a plain string otherwise
    pub fn literal(&self) -> Option<Value> {
        match self.kind {
            AttributeKind::ValuelessBoolean => Some(Value::Bool(true)),
            AttributeKind::Static => Some(Value::Str(self.value.clone())),
            AttributeKind::Dynamic => parse_literal(&self.value),
        }
    }
}

/// Split the dynamic sigil off a raw attribute name.
///
/// `:name` is dynamic, `::name` is a static attribute literally named `:name`.
pub fn classify_name(raw: &str) -> (String, AttributeKind) {
    if let Some(rest) = raw.strip_prefix("::") {
        (format!("{}{}", DYNAMIC_SIGIL, rest), AttributeKind::Static)
    } else if let Some(rest) = raw.strip_prefix(DYNAMIC_SIGIL) {
        (rest.to_string(), AttributeKind::Dynamic)
    } else {
        (raw.to_string(), AttributeKind::Static)
    }
}

/// Result of scanning a tag's attribute list
#[derive(Debug, Clone)]
pub struct ParsedTag {
    pub attributes: Vec<AttributeBinding>,
    /// Byte offset just past the closing `>`
    pub end: usize,
    pub self_closing: bool,
}

/// Parse the attribute list of a tag starting at `start` and running up to
/// its terminating `>` or `/>`.
pub fn parse_tag_attributes(
    source: &str,
    start: usize,
    tag: &str,
    tag_offset: usize,
    file: &str,
) -> Result<ParsedTag> {
    let mut scanner = AttributeScanner::new(source, start, tag, file, true);
    let attributes = scanner.scan()?;
    match scanner.terminator {
        Some(self_closing) => Ok(ParsedTag {
            attributes,
            end: scanner.position,
            self_closing,
        }),
        None => Err(CompilerError::unterminated_tag(
            file,
            tag,
            Position::locate(source, tag_offset),
        )),
    }
}

/// Parse a raw attribute substring that has no tag terminator, such as the
/// argument list of an emitted directive.
pub fn parse_attributes(raw: &str) -> Result<Vec<AttributeBinding>> {
    AttributeScanner::new(raw, 0, "attributes", "<attributes>", false).scan()
}

struct AttributeScanner<'a> {
    source: &'a str,
    position: usize,
    tag: &'a str,
    file: &'a str,
    terminated: bool,
    /// Set once the closing `>` (false) or `/>` (true) has been consumed
    terminator: Option<bool>,
}

impl<'a> AttributeScanner<'a> {
    fn new(source: &'a str, start: usize, tag: &'a str, file: &'a str, terminated: bool) -> Self {
        Self {
            source,
            position: start,
            tag,
            file,
            terminated,
            terminator: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> CompilerError {
        CompilerError::malformed_attribute(
            self.file,
            self.tag,
            Position::locate(self.source, offset),
            message,
        )
    }

    fn scan(&mut self) -> Result<Vec<AttributeBinding>> {
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.position >= self.source.len() {
                return Ok(attributes);
            }
            if self.terminated {
                if self.rest().starts_with("/>") {
                    self.position += 2;
                    self.terminator = Some(true);
                    return Ok(attributes);
                }
                if self.rest().starts_with('>') {
                    self.position += 1;
                    self.terminator = Some(false);
                    return Ok(attributes);
                }
            }
            attributes.push(self.scan_attribute()?);
        }
    }

    fn at_name_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(c) if c.is_whitespace() => true,
            Some('=' | '>' | '"' | '\'') => true,
            Some('/') => self.rest().starts_with("/>"),
            Some(_) => false,
        }
    }

    fn scan_attribute(&mut self) -> Result<AttributeBinding> {
        let name_offset = self.position;
        if self.rest().starts_with("{{") || self.rest().starts_with("{%") {
            return Err(self.error(
                name_offset,
                "template syntax is only allowed inside quoted attribute values",
            ));
        }

        while !self.at_name_end() {
            self.advance();
        }
        let raw_name = &self.source[name_offset..self.position];
        if raw_name.is_empty() {
            let found = self.peek().map(String::from).unwrap_or_default();
            return Err(self.error(name_offset, format!("unexpected '{}'", found)));
        }
        if let Some(brace) = raw_name.find(['{', '}']) {
            return Err(self.error(
                name_offset + brace,
                format!("'{}' is not allowed in attribute name '{}'", &raw_name[brace..brace + 1], raw_name),
            ));
        }

        let (name, kind) = classify_name(raw_name);
        if name.is_empty() || name == DYNAMIC_SIGIL.to_string() {
            return Err(self.error(name_offset, "empty attribute name"));
        }

        // Look past optional whitespace for `=`; without it the attribute is valueless
        let after_name = self.position;
        self.skip_whitespace();
        if self.peek() != Some('=') {
            self.position = after_name;
            return Ok(AttributeBinding {
                key: normalize_identifier(&name),
                name,
                value: String::new(),
                quote: None,
                kind: AttributeKind::ValuelessBoolean,
                offset: name_offset,
            });
        }
        self.advance();
        self.skip_whitespace();

        let (value, quote) = match self.peek() {
            None => return Err(self.error(name_offset, format!("missing value for '{}'", raw_name))),
            Some(q @ ('"' | '\'')) => (self.scan_quoted_value(q)?, Some(q)),
            Some(_) => (self.scan_unquoted_value(name_offset, raw_name)?, None),
        };

        Ok(AttributeBinding {
            key: normalize_identifier(&name),
            name,
            value,
            quote,
            kind,
            offset: name_offset,
        })
    }

    fn scan_quoted_value(&mut self, quote: char) -> Result<String> {
        let quote_offset = self.position;
        self.advance();
        let value_start = self.position;
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(quote_offset, format!("unterminated {} quoted value", quote)));
            }
            if self.skip_host_construct()? {
                continue;
            }
            if self.peek() == Some(quote) {
                let value = self.source[value_start..self.position].to_string();
                self.advance();
                return Ok(value);
            }
            self.advance();
        }
    }

    fn scan_unquoted_value(&mut self, name_offset: usize, raw_name: &str) -> Result<String> {
        let value_start = self.position;
        while let Some(c) = self.peek() {
            if self.skip_host_construct()? {
                continue;
            }
            if c.is_whitespace() || c == '>' || self.rest().starts_with("/>") {
                break;
            }
            self.advance();
        }
        if self.position == value_start {
            return Err(self.error(name_offset, format!("missing value for '{}'", raw_name)));
        }
        Ok(self.source[value_start..self.position].to_string())
    }

    /// Step over a `{{ }}` or `{% %}` construct at the current position
    fn skip_host_construct(&mut self) -> Result<bool> {
        let rest = self.rest();
        let Some(closer) = host_construct_closer(rest) else {
            return Ok(false);
        };
        match rest[2..].find(closer) {
            Some(end) => {
                self.position += 2 + end + closer.len();
                Ok(true)
            }
            None => Err(self.error(
                self.position,
                format!("unterminated template construct, expected '{}'", closer),
            )),
        }
    }
}

/// Closing delimiter for a host construct starting at the head of `text`
pub(crate) fn host_construct_closer(text: &str) -> Option<&'static str> {
    if text.starts_with("{{") {
        Some("}}")
    } else if text.starts_with("{%") {
        Some("%}")
    } else {
        None
    }
}
