use thiserror::Error;

/// An error produced while tokenizing source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unterminated string literal")]
    UnterminatedString { line: u32, column: u32 },

    #[error("Unterminated block comment")]
    UnterminatedComment { line: u32, column: u32 },

    #[error("Invalid number literal '{lexeme}'")]
    InvalidNumber {
        lexeme: String,
        line: u32,
        column: u32,
    },

    #[error("Unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: u32, column: u32 },
}

impl LexError {
    /// The 1-based line the error was reported on.
    pub fn line(&self) -> u32 {
        match self {
            LexError::UnterminatedString { line, .. }
            | LexError::UnterminatedComment { line, .. }
            | LexError::InvalidNumber { line, .. }
            | LexError::UnexpectedChar { line, .. } => *line,
        }
    }
}
