//! Recursive-descent parser for memscript.
//!
//! Consumes the token vector produced by the lexer and builds a
//! [`ClassDecl`]. Expressions are parsed with precedence climbing.

use crate::core::value::TypeTag;
use crate::lexer::{Span, Token, TokenKind};
use crate::parser::ast::*;
use crate::parser::error::{ParseError, ParseResult};

pub struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
}

/// Parse a token stream into a single class declaration.
pub fn parse_unit<'src>(tokens: Vec<Token<'src>>) -> ParseResult<ClassDecl> {
    Parser::new(tokens).parse()
}

impl<'src> Parser<'src> {
    pub fn new(mut tokens: Vec<Token<'src>>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, "", Span::empty()));
        }
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> ParseResult<ClassDecl> {
        let class = self.parse_class()?;
        if !self.check(TokenKind::Eof) {
            return Err(ParseError::TrailingInput {
                span: self.current().span,
            });
        }
        Ok(class)
    }

    // =========================================
    // Declarations
    // =========================================

    fn parse_class(&mut self) -> ParseResult<ClassDecl> {
        let start = self.expect(TokenKind::Class, "'class'")?.span;
        let name = self.expect_identifier("class name")?;
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                return Err(ParseError::UnexpectedEof {
                    expected: "'}' closing class body".to_string(),
                    span: self.current().span,
                });
            }
            self.parse_member(&mut fields, &mut methods)?;
        }

        let end = self.expect(TokenKind::RBrace, "'}'")?.span;

        Ok(ClassDecl {
            name,
            fields,
            methods,
            span: start.merge(&end),
        })
    }

    /// A member is `type name(...) {...}` or `type name [= expr];`.
    fn parse_member(
        &mut self,
        fields: &mut Vec<FieldDecl>,
        methods: &mut Vec<MethodDecl>,
    ) -> ParseResult<()> {
        let start = self.current().span;
        let ty = self.parse_type()?;
        let name = self.expect_identifier("member name")?;

        if self.check(TokenKind::LParen) {
            methods.push(self.parse_method_rest(ty, name, start)?);
        } else {
            let init = if self.matches(TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let end = self.expect(TokenKind::Semicolon, "';' after field")?.span;
            fields.push(FieldDecl {
                ty,
                name,
                init,
                span: start.merge(&end),
            });
        }
        Ok(())
    }

    fn parse_method_rest(
        &mut self,
        return_ty: TypeTag,
        name: String,
        start: Span,
    ) -> ParseResult<MethodDecl> {
        self.expect(TokenKind::LParen, "'('")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let param_name = self.expect_identifier("parameter name")?;
                params.push(Param {
                    ty,
                    name: param_name,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;

        let body = self.parse_block()?;
        let end = self.previous_span();

        Ok(MethodDecl {
            return_ty,
            name,
            params,
            body,
            span: start.merge(&end),
        })
    }

    fn parse_type(&mut self) -> ParseResult<TypeTag> {
        let token = self.current();
        let base = match token.kind {
            TokenKind::Void => TypeTag::Void,
            TokenKind::Bool => TypeTag::Bool,
            TokenKind::Int => TypeTag::Int,
            TokenKind::Float => TypeTag::Float,
            TokenKind::String => TypeTag::Str,
            TokenKind::Any => TypeTag::Any,
            _ => {
                return Err(self.unexpected("a type"));
            }
        };
        self.advance();

        // `string[]` is the only array type.
        if base == TypeTag::Str && self.check(TokenKind::LBracket) {
            self.advance();
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(TypeTag::StrList);
        }

        Ok(base)
    }

    // =========================================
    // Statements
    // =========================================

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                return Err(ParseError::UnexpectedEof {
                    expected: "'}' closing block".to_string(),
                    span: self.current().span,
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.current().kind {
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Identifier if self.peek_kind(1) == TokenKind::Assign => self.parse_assign(),
            _ => {
                let start = self.current().span;
                let expr = self.parse_expr()?;
                let end = self
                    .expect(TokenKind::Semicolon, "';' after expression")?
                    .span;
                Ok(Stmt::Expr {
                    expr,
                    span: start.merge(&end),
                })
            }
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Var, "'var'")?.span;
        let name = self.expect_identifier("variable name")?;
        self.expect(TokenKind::Assign, "'=' in variable declaration")?;
        let init = self.parse_expr()?;
        let end = self
            .expect(TokenKind::Semicolon, "';' after declaration")?
            .span;
        Ok(Stmt::VarDecl {
            name,
            init,
            span: start.merge(&end),
        })
    }

    fn parse_assign(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;
        let name = self.expect_identifier("assignment target")?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expr()?;
        let end = self
            .expect(TokenKind::Semicolon, "';' after assignment")?
            .span;
        Ok(Stmt::Assign {
            name,
            value,
            span: start.merge(&end),
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Return, "'return'")?.span;
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(TokenKind::Semicolon, "';' after return")?.span;
        Ok(Stmt::Return {
            value,
            span: start.merge(&end),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::If, "'if'")?.span;
        self.expect(TokenKind::LParen, "'(' after 'if'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_body = self.parse_block()?;
        let else_body = if self.matches(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let span = start.merge(&self.previous_span());
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
            span,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::While, "'while'")?.span;
        self.expect(TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::While { cond, body, span })
    }

    // =========================================
    // Expressions, by descending precedence
    // =========================================

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.matches(TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.matches(TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current().span;
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span());
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check(TokenKind::LBracket) {
            let start = *expr.span();
            self.advance();
            let index = self.parse_expr()?;
            let end = self.expect(TokenKind::RBracket, "']'")?.span;
            expr = Expr::Index {
                base: Box::new(expr),
                index: Box::new(index),
                span: start.merge(&end),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = *self.current();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = token
                    .lexeme
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        lexeme: token.lexeme.to_string(),
                        span: token.span,
                    })?;
                Ok(Expr::IntLit(value, token.span))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        lexeme: token.lexeme.to_string(),
                        span: token.span,
                    })?;
                Ok(Expr::FloatLit(value, token.span))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let value = unescape_string(token.lexeme, token.span)?;
                Ok(Expr::StrLit(value, token.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::BoolLit(true, token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::BoolLit(false, token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check(TokenKind::LParen) {
                    return self.parse_call_rest(token.lexeme.to_string(), token.span);
                }
                Ok(Expr::Ident(token.lexeme.to_string(), token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof {
                expected: "an expression".to_string(),
                span: token.span,
            }),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call_rest(&mut self, name: String, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen, "')'")?.span;
        Ok(Expr::Call {
            name,
            args,
            span: start.merge(&end),
        })
    }

    // =========================================
    // Token-stream helpers
    // =========================================

    fn current(&self) -> &Token<'src> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token<'src> {
        let token = *self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token<'src>> {
        if self.check(kind) {
            Ok(self.advance())
        } else if self.check(TokenKind::Eof) {
            Err(ParseError::UnexpectedEof {
                expected: expected.to_string(),
                span: self.current().span,
            })
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<String> {
        let token = self.expect(TokenKind::Identifier, expected)?;
        Ok(token.lexeme.to_string())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current().lexeme.to_string(),
            span: self.current().span,
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span().merge(rhs.span());
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span,
    }
}

/// Interpret the raw lexeme of a string literal, including surrounding
/// quotes and escape sequences.
fn unescape_string(lexeme: &str, span: Span) -> ParseResult<String> {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some(escape) => {
                return Err(ParseError::InvalidEscape { escape, span });
            }
            None => {
                return Err(ParseError::InvalidEscape { escape: ' ', span });
            }
        }
    }
    Ok(out)
}
