//! Error types for the cotton compiler

use crate::loader::LoaderError;
use thiserror::Error;

/// A resolved position inside a template source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the source
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
}

impl Position {
    /// Resolve a byte offset into line/column information
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self { offset, line, column }
    }
}

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed attribute on <c-{tag}> in {file} at line {line}, column {column} (offset {offset}): {message}")]
    MalformedAttribute {
        file: String,
        tag: String,
        offset: usize,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unterminated tag <c-{tag}> in {file} at line {line}, column {column} (offset {offset})")]
    UnterminatedTag {
        file: String,
        tag: String,
        offset: usize,
        line: usize,
        column: usize,
    },

    #[error("Mismatched closing tag in {file} at line {line}: expected </c-{expected}>, found </c-{found}>")]
    MismatchedTag {
        file: String,
        line: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected closing tag </c-{tag}> in {file} at line {line}")]
    UnexpectedClosingTag { file: String, line: usize, tag: String },

    #[error("Slot error in {file} at line {line}: {message}")]
    Slot { file: String, line: usize, message: String },

    #[error("Vars error in {file} at line {line}: {message}")]
    Vars { file: String, line: usize, message: String },

    #[error("Unresolved component <c-{component}> ({template}): {source}")]
    UnresolvedComponent {
        component: String,
        template: String,
        #[source]
        source: LoaderError,
    },

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Invalid {directive} directive: {message}")]
    Directive { directive: String, message: String },

    #[error("Maximum limit exceeded: {limit_type} (limit: {limit})")]
    LimitExceeded { limit_type: String, limit: usize },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("{failed} of {total} templates failed to compile")]
    CheckFailed { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn malformed_attribute(
        file: impl Into<String>,
        tag: impl Into<String>,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedAttribute {
            file: file.into(),
            tag: tag.into(),
            offset: position.offset,
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    pub fn unterminated_tag(file: impl Into<String>, tag: impl Into<String>, position: Position) -> Self {
        Self::UnterminatedTag {
            file: file.into(),
            tag: tag.into(),
            offset: position.offset,
            line: position.line,
            column: position.column,
        }
    }

    pub fn slot(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Slot {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn vars(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Vars {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn directive(directive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Directive {
            directive: directive.into(),
            message: message.into(),
        }
    }

    /// True for errors that point at a location inside the template source
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedAttribute { .. }
                | Self::UnterminatedTag { .. }
                | Self::MismatchedTag { .. }
                | Self::UnexpectedClosingTag { .. }
                | Self::Slot { .. }
                | Self::Vars { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_locate() {
        let source = "ab\ncd\nef";
        assert_eq!(Position::locate(source, 0), Position { offset: 0, line: 1, column: 1 });
        assert_eq!(Position::locate(source, 4), Position { offset: 4, line: 2, column: 2 });
        assert_eq!(Position::locate(source, 6), Position { offset: 6, line: 3, column: 1 });
    }

    #[test]
    fn test_position_clamps_past_end() {
        let pos = Position::locate("abc", 99);
        assert_eq!(pos.offset, 3);
        assert_eq!(pos.column, 4);
    }

    #[test]
    fn test_malformed_attribute_message() {
        let err = CompilerError::malformed_attribute(
            "view.html",
            "button",
            Position { offset: 12, line: 1, column: 13 },
            "unterminated quoted value",
        );
        let message = err.to_string();
        assert!(message.contains("<c-button>"));
        assert!(message.contains("offset 12"));
        assert!(err.is_syntax_error());
    }
}
