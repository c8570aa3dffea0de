//! Lexical analysis of template source
//!
//! Splits arbitrary template text into plain text runs and component tag
//! tokens. Only `<c-...>` and `</c-...>` are recognised; everything else,
//! including malformed HTML, is text. Host constructs (`{{ }}`, `{% %}`,
//! `{# #}`) and whole `verbatim`/`comment` blocks are copied through without
//! being scanned for tags.

use crate::attributes::{parse_tag_attributes, AttributeBinding};
use crate::error::{CompilerError, Position, Result};
use crate::types::TAG_PREFIX;
use crate::utils::is_valid_component_name;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text {
        text: String,
        offset: usize,
    },
    OpenTag {
        name: String,
        attributes: Vec<AttributeBinding>,
        self_closing: bool,
        offset: usize,
    },
    CloseTag {
        name: String,
        offset: usize,
    },
}

impl Token {
    pub fn offset(&self) -> usize {
        match self {
            Token::Text { offset, .. } | Token::OpenTag { offset, .. } | Token::CloseTag { offset, .. } => {
                *offset
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text { text, .. } => write!(f, "text({} bytes)", text.len()),
            Token::OpenTag { name, self_closing: true, .. } => write!(f, "<{}{} />", TAG_PREFIX, name),
            Token::OpenTag { name, .. } => write!(f, "<{}{}>", TAG_PREFIX, name),
            Token::CloseTag { name, .. } => write!(f, "</{}{}>", TAG_PREFIX, name),
        }
    }
}

/// Host blocks whose whole body is copied verbatim
const RAW_BLOCKS: &[(&str, &str)] = &[("verbatim", "endverbatim"), ("comment", "endcomment")];

pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
    text_start: usize,
    filename: String,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, filename: impl Into<String>) -> Self {
        Self {
            source,
            position: 0,
            text_start: 0,
            filename: filename.into(),
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        while self.position < self.source.len() {
            let rest = &self.source[self.position..];

            if let Some(skip) = raw_block_length(rest).or_else(|| host_construct_length(rest)) {
                self.position += skip;
            } else if rest.starts_with("</") && rest[2..].starts_with(TAG_PREFIX) {
                if !self.lex_close_tag()? {
                    self.position += 1;
                }
            } else if rest.starts_with('<') && rest[1..].starts_with(TAG_PREFIX) {
                if !self.lex_open_tag()? {
                    self.position += 1;
                }
            } else {
                self.position += rest.chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
        self.flush_text(self.source.len());
        log::trace!("Tokenized {} into {} tokens", self.filename, self.tokens.len());
        Ok(self.tokens)
    }

    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            self.tokens.push(Token::Text {
                text: self.source[self.text_start..end].to_string(),
                offset: self.text_start,
            });
        }
    }

    /// Lex `<c-name ...>` at the current position. Returns false when the
    /// text only looks like a tag start and should stay text.
    fn lex_open_tag(&mut self) -> Result<bool> {
        let tag_offset = self.position;
        let name_start = tag_offset + 1 + TAG_PREFIX.len();
        let name_end = scan_name(self.source, name_start);
        if name_end == name_start {
            return Ok(false);
        }
        match self.source[name_end..].chars().next() {
            None => {
                let name = &self.source[name_start..name_end];
                return Err(CompilerError::unterminated_tag(
                    &self.filename,
                    name,
                    Position::locate(self.source, tag_offset),
                ));
            }
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => {}
            Some(c) => {
                let name = &self.source[name_start..name_end];
                return Err(CompilerError::malformed_attribute(
                    &self.filename,
                    name,
                    Position::locate(self.source, name_end),
                    format!("unexpected '{}' after component name", c),
                ));
            }
        }

        let name = self.source[name_start..name_end].to_string();
        self.check_name(&name, tag_offset)?;

        let parsed = parse_tag_attributes(self.source, name_end, &name, tag_offset, &self.filename)?;
        self.flush_text(tag_offset);
        self.tokens.push(Token::OpenTag {
            name,
            attributes: parsed.attributes,
            self_closing: parsed.self_closing,
            offset: tag_offset,
        });
        self.position = parsed.end;
        self.text_start = parsed.end;
        Ok(true)
    }

    fn lex_close_tag(&mut self) -> Result<bool> {
        let tag_offset = self.position;
        let name_start = tag_offset + 2 + TAG_PREFIX.len();
        let name_end = scan_name(self.source, name_start);
        if name_end == name_start {
            return Ok(false);
        }
        let name = self.source[name_start..name_end].to_string();

        let after_name = &self.source[name_end..];
        let trimmed = after_name.trim_start();
        if !trimmed.starts_with('>') {
            return Err(CompilerError::unterminated_tag(
                &self.filename,
                name,
                Position::locate(self.source, tag_offset),
            ));
        }
        self.check_name(&name, tag_offset)?;

        let end = name_end + (after_name.len() - trimmed.len()) + 1;
        self.flush_text(tag_offset);
        self.tokens.push(Token::CloseTag { name, offset: tag_offset });
        self.position = end;
        self.text_start = end;
        Ok(true)
    }

    fn check_name(&self, name: &str, tag_offset: usize) -> Result<()> {
        if is_valid_component_name(name) {
            Ok(())
        } else {
            Err(CompilerError::malformed_attribute(
                &self.filename,
                name,
                Position::locate(self.source, tag_offset),
                format!("invalid component name '{}'", name),
            ))
        }
    }
}

/// End of a component name starting at `start`
fn scan_name(source: &str, start: usize) -> usize {
    let len = source[start..]
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'))
        .unwrap_or(source.len() - start);
    start + len
}

/// Length of a `{{ }}`, `{% %}` or `{# #}` construct at the head of `text`.
/// An unclosed construct is not special: it is left to be scanned as text.
fn host_construct_length(text: &str) -> Option<usize> {
    let closer = if text.starts_with("{{") {
        "}}"
    } else if text.starts_with("{%") {
        "%}"
    } else if text.starts_with("{#") {
        "#}"
    } else {
        return None;
    };
    text[2..].find(closer).map(|end| 2 + end + closer.len())
}

/// Length of a whole `{% verbatim %}...{% endverbatim %}` style block at the
/// head of `text`, including its closing tag
fn raw_block_length(text: &str) -> Option<usize> {
    let opener_len = host_construct_length(text)?;
    if !text.starts_with("{%") {
        return None;
    }
    let opener = text[2..opener_len - 2].trim();
    let keyword = opener.split_whitespace().next()?;
    let (_, end_keyword) = RAW_BLOCKS.iter().find(|(start, _)| *start == keyword)?;

    let mut search = opener_len;
    while let Some(found) = text[search..].find("{%") {
        let tag_start = search + found;
        let tag_len = host_construct_length(&text[tag_start..])?;
        let inner = text[tag_start + 2..tag_start + tag_len - 2].trim();
        if inner.split_whitespace().next() == Some(end_keyword) {
            return Some(tag_start + tag_len);
        }
        search = tag_start + tag_len;
    }
    None
}
