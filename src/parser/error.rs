use crate::lexer::Span;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// An error produced while parsing a token stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("Invalid number literal '{lexeme}'")]
    InvalidNumber { lexeme: String, span: Span },

    #[error("Invalid escape sequence '\\{escape}'")]
    InvalidEscape { escape: char, span: Span },

    #[error("A unit must declare exactly one class")]
    TrailingInput { span: Span },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::InvalidEscape { span, .. }
            | ParseError::TrailingInput { span } => span,
        }
    }
}
