//! Token types for the memscript lexer.

use super::span::Span;
use std::fmt;

/// A token from the source code.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'src> {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token.
    pub lexeme: &'src str,
    /// Location in source.
    pub span: Span,
}

impl<'src> Token<'src> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'src str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {})", self.kind, self.lexeme, self.span)
    }
}

/// All token types in memscript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Integer literal: `42`
    IntLiteral,
    /// Float literal: `3.14`, `.5`
    FloatLiteral,
    /// String literal: `"hello"`
    StringLiteral,

    /// User-defined identifier
    Identifier,

    // =========================================
    // Keywords
    // =========================================
    /// `class`
    Class,
    /// `var`
    Var,
    /// `return`
    Return,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `true`
    True,
    /// `false`
    False,
    /// `void`
    Void,
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `string`
    String,
    /// `any`
    Any,

    // =========================================
    // Punctuation
    // =========================================
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `=`
    Assign,

    // =========================================
    // Operators
    // =========================================
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,

    /// End of input
    Eof,
}

/// Map an identifier lexeme to its keyword kind, if it is one.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "class" => TokenKind::Class,
        "var" => TokenKind::Var,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "void" => TokenKind::Void,
        "bool" => TokenKind::Bool,
        "int" => TokenKind::Int,
        "float" => TokenKind::Float,
        "string" => TokenKind::String,
        "any" => TokenKind::Any,
        _ => return None,
    };
    Some(kind)
}
