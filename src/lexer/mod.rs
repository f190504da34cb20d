pub mod cursor;
pub mod error;
pub mod span;
pub mod token;

mod lexer;

pub use error::LexError;
pub use lexer::{Lexer, tokenize};
pub use span::Span;
pub use token::{Token, TokenKind};
