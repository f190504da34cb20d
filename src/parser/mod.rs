pub mod ast;
pub mod error;

mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::{Parser, parse_unit};
