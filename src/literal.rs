//! Conversion of foreign-language literals into typed values
//!
//! Accepts integers, floats, booleans (`True`/`False`/`true`/`false`),
//! null (`None`/`null`), single or double quoted strings, lists and
//! key/value mappings, nested arbitrarily up to `MAX_LITERAL_DEPTH`.

use crate::types::{Value, MAX_LITERAL_DEPTH};

/// Parse `text` as a literal. Returns `None` when the text is not a
/// complete literal, in which case callers keep it as an expression or string.
pub fn parse_literal(text: &str) -> Option<Value> {
    let mut parser = LiteralParser::new(text);
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.is_at_end() {
        Some(value)
    } else {
        None
    }
}

struct LiteralParser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
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

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self, depth: usize) -> Option<Value> {
        if depth > MAX_LITERAL_DEPTH {
            return None;
        }
        self.skip_whitespace();
        match self.peek()? {
            '[' => self.parse_list(depth),
            '{' => self.parse_dict(depth),
            '"' | '\'' => self.parse_string().map(Value::Str),
            c if c == '-' || c == '+' || c.is_ascii_digit() => self.parse_number(),
            _ => self.parse_keyword(),
        }
    }

    fn parse_list(&mut self, depth: usize) -> Option<Value> {
        self.advance(); // [
        let mut items = Vec::new();
        loop {
            if self.eat(']') {
                return Some(Value::List(items));
            }
            items.push(self.parse_value(depth + 1)?);
            if self.eat(',') {
                continue;
            }
            return if self.eat(']') { Some(Value::List(items)) } else { None };
        }
    }

    fn parse_dict(&mut self, depth: usize) -> Option<Value> {
        self.advance(); // {
        let mut entries = Vec::new();
        loop {
            if self.eat('}') {
                return Some(Value::Dict(entries));
            }
            let key = match self.parse_value(depth + 1)? {
                Value::Str(s) => s,
                Value::List(_) | Value::Dict(_) => return None,
                other => other.to_string(),
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value(depth + 1)?;
            entries.push((key, value));
            if self.eat(',') {
                continue;
            }
            return if self.eat('}') { Some(Value::Dict(entries)) } else { None };
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.advance()?;
        let mut result = String::new();
        loop {
            match self.advance()? {
                '\\' => match self.advance()? {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '0' => result.push('\0'),
                    other => result.push(other),
                },
                c if c == quote => return Some(result),
                c => result.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let start = self.position;
        if matches!(self.peek(), Some('-' | '+')) {
            self.advance();
        }
        let mut previous = None;
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '-' | '+') && matches!(previous, Some('e' | 'E'));
            if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign) {
                break;
            }
            previous = self.advance();
        }
        let text = self.input[start..self.position].replace('_', "");
        if let Ok(int) = text.parse::<i64>() {
            return Some(Value::Int(int));
        }
        // Rust accepts "inf"/"nan", which are not numeric literals here
        if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
            return None;
        }
        text.parse::<f64>().ok().map(Value::Float)
    }

    fn parse_keyword(&mut self) -> Option<Value> {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.advance();
        }
        match &self.input[start..self.position] {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "null" => Some(Value::None),
            _ => None,
        }
    }
}
