//! Main lexer implementation for memscript.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s using
//! direct dispatch on the first character of each token.

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::error::LexError;
use super::span::Span;
use super::token::{Token, TokenKind, lookup_keyword};

/// Lexer for memscript source code.
///
/// Errors do not stop the scan: the offending input is skipped, the error
/// is accumulated, and scanning continues so the parser still sees the
/// rest of the unit.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    errors: Vec<LexError>,
}

/// Tokenize a whole source text, returning the tokens (always terminated
/// by an `Eof` token) together with any lexical errors.
pub fn tokenize(source: &str) -> (Vec<Token<'_>>, Vec<LexError>) {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    (tokens, lexer.take_errors())
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            errors: Vec::new(),
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        loop {
            self.skip_whitespace_and_comments();

            if self.cursor.is_eof() {
                return self.make_eof();
            }

            let line = self.cursor.line();
            let column = self.cursor.column();
            let start = self.cursor.offset();

            match self.cursor.peek().unwrap() {
                '"' => return self.scan_string(line, column, start),
                c if c.is_ascii_digit() => return self.scan_number(line, column, start),
                '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                    return self.scan_number(line, column, start);
                }
                c if is_ident_start(c) => return self.scan_identifier(line, column, start),
                _ => {
                    if let Some(token) = self.scan_operator(line, column, start) {
                        return token;
                    }
                    // scan_operator recorded the error and skipped a char
                }
            }
        }
    }

    // =========================================
    // Internal: token scanning
    // =========================================

    fn make_eof(&self) -> Token<'src> {
        let offset = self.cursor.offset();
        Token::new(
            TokenKind::Eof,
            "",
            Span::new(offset, offset, self.cursor.line(), self.cursor.column()),
        )
    }

    fn make_token(&self, kind: TokenKind, line: u32, column: u32, start: usize) -> Token<'src> {
        let end = self.cursor.offset();
        Token::new(
            kind,
            self.cursor.slice(start, end),
            Span::new(start, end, line, column),
        )
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.cursor.bump_while(|c| c.is_whitespace());

            match (self.cursor.peek(), self.cursor.peek_nth(1)) {
                (Some('/'), Some('/')) => {
                    self.cursor.bump_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => {
                    let line = self.cursor.line();
                    let column = self.cursor.column();
                    self.cursor.bump();
                    self.cursor.bump();
                    let mut closed = false;
                    while let Some(c) = self.cursor.bump() {
                        if c == '*' && self.cursor.peek() == Some('/') {
                            self.cursor.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.errors
                            .push(LexError::UnterminatedComment { line, column });
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_string(&mut self, line: u32, column: u32, start: usize) -> Token<'src> {
        self.cursor.bump(); // opening quote

        loop {
            match self.cursor.bump() {
                Some('"') => break,
                Some('\\') => {
                    // Escape: consume the escaped character blindly, the
                    // parser interprets the sequence.
                    self.cursor.bump();
                }
                Some('\n') | None => {
                    self.errors
                        .push(LexError::UnterminatedString { line, column });
                    break;
                }
                Some(_) => {}
            }
        }

        self.make_token(TokenKind::StringLiteral, line, column, start)
    }

    fn scan_number(&mut self, line: u32, column: u32, start: usize) -> Token<'src> {
        self.cursor.bump_while(|c| c.is_ascii_digit());

        let mut is_float = false;
        if self.cursor.peek() == Some('.')
            && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.cursor.bump();
            self.cursor.bump_while(|c| c.is_ascii_digit());
        }

        // A digit run immediately followed by identifier characters is
        // malformed, e.g. `12abc`.
        if self.cursor.peek().is_some_and(is_ident_start) {
            self.cursor.bump_while(is_ident_continue);
            let token = self.make_token(TokenKind::IntLiteral, line, column, start);
            self.errors.push(LexError::InvalidNumber {
                lexeme: token.lexeme.to_string(),
                line,
                column,
            });
            return token;
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.make_token(kind, line, column, start)
    }

    fn scan_identifier(&mut self, line: u32, column: u32, start: usize) -> Token<'src> {
        self.cursor.bump_while(is_ident_continue);
        let end = self.cursor.offset();
        let lexeme = self.cursor.slice(start, end);
        let kind = lookup_keyword(lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, lexeme, Span::new(start, end, line, column))
    }

    fn scan_operator(&mut self, line: u32, column: u32, start: usize) -> Option<Token<'src>> {
        let first = self.cursor.bump().unwrap();
        let second = self.cursor.peek();

        let kind = match (first, second) {
            ('=', Some('=')) => {
                self.cursor.bump();
                TokenKind::EqEq
            }
            ('!', Some('=')) => {
                self.cursor.bump();
                TokenKind::NotEq
            }
            ('<', Some('=')) => {
                self.cursor.bump();
                TokenKind::Le
            }
            ('>', Some('=')) => {
                self.cursor.bump();
                TokenKind::Ge
            }
            ('&', Some('&')) => {
                self.cursor.bump();
                TokenKind::AndAnd
            }
            ('|', Some('|')) => {
                self.cursor.bump();
                TokenKind::OrOr
            }
            ('=', _) => TokenKind::Assign,
            ('!', _) => TokenKind::Bang,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('(', _) => TokenKind::LParen,
            (')', _) => TokenKind::RParen,
            ('{', _) => TokenKind::LBrace,
            ('}', _) => TokenKind::RBrace,
            ('[', _) => TokenKind::LBracket,
            (']', _) => TokenKind::RBracket,
            (',', _) => TokenKind::Comma,
            (';', _) => TokenKind::Semicolon,
            (ch, _) => {
                self.errors.push(LexError::UnexpectedChar { ch, line, column });
                return None;
            }
        };

        Some(self.make_token(kind, line, column, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_class_skeleton() {
        let k = kinds("class Foo { }");
        assert_eq!(
            k,
            vec![
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_two_char_operators() {
        let k = kinds("== != <= >= && ||");
        assert_eq!(
            k,
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_unterminated_string_with_line() {
        let (_, errors) = tokenize("class A {\n  string f() { return \"oops; } }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 2);
    }

    #[test]
    fn comments_do_not_produce_tokens() {
        let k = kinds("// line\n/* block */ 1");
        assert_eq!(k, vec![TokenKind::IntLiteral, TokenKind::Eof]);
    }

    #[test]
    fn float_and_int_literals() {
        let k = kinds("1 2.5 .5");
        assert_eq!(
            k,
            vec![
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
    }
}
