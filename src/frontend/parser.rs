use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::str_pool::{StrPool, Symbol};
use crate::frontend::token::Token;
use crate::lang::expr::{Cond, DeclIdx, Expr, Operand};
use crate::lang::program::{Program, VarDecl, VarKind};
use crate::lang::stmt::Stmt;

/// Recursive-descent parser for CYaRon.
///
/// The parser consumes lexed `Spanned` tokens and produces a `Program`:
/// - `decls`: the declaration table built from `vars` blocks
/// - `stmts`: top-level statements in source order
///
/// Every expression comes out flattened and normalized, and every variable
/// reference is resolved to its declaration index. Names resolve by
/// `Symbol` identity against the declarations seen so far, so a variable must
/// be declared before its first use.
pub struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    pool: &'a StrPool,
    decls: Vec<VarDecl>,
    /// `symbols[i]` is the interned name of `decls[i]`.
    symbols: Vec<Symbol>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over lexer output. `pool` must be the pool the
    /// tokens were interned into.
    pub fn new(tokens: Vec<Spanned>, pool: &'a StrPool) -> Self {
        Parser {
            tokens,
            pos: 0,
            pool,
            decls: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Current token kind. The stream always ends with `Eof`, which is never
    /// consumed, so running past the end keeps yielding it.
    fn peek(&self) -> Token {
        self.tokens.get(self.pos).map(|s| s.token).unwrap_or(Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.span)
            .unwrap_or(Span { line: 1, col: 1 })
    }

    /// Constructs a `ParserError` at the current token.
    fn error(&self, message: impl Into<String>) -> ParserError {
        let span = self.span();
        ParserError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn unexpected(&self, expected: &str) -> ParserError {
        match self.peek() {
            Token::Eof => self.error(format!("unexpected EOF, expected {}", expected)),
            token => self.error(format!("unexpected token '{}', expected {}", token, expected)),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), ParserError> {
        if self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Parses a complete program.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut stmts = Vec::new();

        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Vars => {
                    self.advance(); // consume 'vars'
                    self.expect(Token::LBrace, "'{' after 'vars'")?;
                    self.parse_vars_body()?;
                }
                _ => stmts.extend(self.parse_stmt()?),
            }
        }

        Ok(Program {
            decls: std::mem::take(&mut self.decls),
            stmts,
        })
    }

    /// Parses declarations up to and including the closing `}`.
    ///
    /// ```text
    /// name:int  name:array[int, A..B]  ...
    /// ```
    fn parse_vars_body(&mut self) -> Result<(), ParserError> {
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(());
                }
                Token::Comma => {
                    self.advance();
                }
                Token::Ident(sym) => {
                    if self.symbols.contains(&sym) {
                        return Err(self.error(format!(
                            "variable '{}' is already declared",
                            self.pool.resolve(sym)
                        )));
                    }
                    self.advance();
                    self.expect(Token::Colon, "':' after variable name")?;
                    let kind = self.parse_var_kind()?;

                    self.decls.push(VarDecl {
                        name: self.pool.resolve(sym).to_string(),
                        kind,
                    });
                    self.symbols.push(sym);
                }
                _ => return Err(self.unexpected("variable declaration or '}'")),
            }
        }
    }

    fn parse_var_kind(&mut self) -> Result<VarKind, ParserError> {
        match self.peek() {
            Token::Int => {
                self.advance();
                Ok(VarKind::Scalar)
            }
            Token::Array => {
                self.advance();
                self.expect(Token::LBracket, "'[' after 'array'")?;
                self.expect(Token::Int, "element type 'int'")?;
                self.expect(Token::Comma, "',' after element type")?;

                let range_span = self.span();
                let start = self.parse_signed_int()?;
                self.expect(Token::DotDot, "'..' in array range")?;
                let end = self.parse_signed_int()?;
                self.expect(Token::RBracket, "']' after array range")?;

                if start > end {
                    return Err(ParserError {
                        message: format!("array range {}..{} is empty", start, end),
                        line: range_span.line,
                        col: range_span.col,
                    });
                }
                Ok(VarKind::Array { start, end })
            }
            _ => Err(self.unexpected("'int' or 'array'")),
        }
    }

    /// `[+|-] integer` as used in array bounds.
    fn parse_signed_int(&mut self) -> Result<i32, ParserError> {
        let negative = match self.peek() {
            Token::Minus => {
                self.advance();
                true
            }
            Token::Plus => {
                self.advance();
                false
            }
            _ => false,
        };

        match self.peek() {
            Token::Integer(sym) => {
                let value = self.integer_value(sym, negative)?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    /// Value of an integer literal with its sign applied, checked against `i32`.
    fn integer_value(&self, sym: Symbol, negative: bool) -> Result<i32, ParserError> {
        let text = self.pool.resolve(sym);
        let magnitude: i64 = text
            .parse()
            .map_err(|_| self.error(format!("integer literal {} is out of range", text)))?;
        let value = if negative { -magnitude } else { magnitude };

        i32::try_from(value)
            .map_err(|_| self.error(format!("integer literal {} is out of range", value)))
    }

    /// Parses one statement: a `{...}` block or a `:command`.
    ///
    /// A `{vars ...}` block may appear at any depth. Its declarations join the
    /// single program-wide table and it yields no statement.
    fn parse_stmt(&mut self) -> Result<Option<Stmt>, ParserError> {
        match self.peek() {
            Token::LBrace => {
                self.advance(); // consume '{'
                match self.peek() {
                    Token::Ihu => {
                        self.advance();
                        let cond = self.parse_cond()?;
                        let body = self.parse_block_body()?;
                        Ok(Some(Stmt::If { cond, body }))
                    }
                    Token::While => {
                        self.advance();
                        let cond = self.parse_cond()?;
                        let body = self.parse_block_body()?;
                        Ok(Some(Stmt::While { cond, body }))
                    }
                    Token::Hor => {
                        self.advance();
                        let var = self.parse_operand()?;
                        self.expect(Token::Comma, "',' after loop variable")?;
                        let start = self.parse_expr()?;
                        self.expect(Token::Comma, "',' after loop start")?;
                        let end = self.parse_expr()?;
                        let body = self.parse_block_body()?;
                        Ok(Some(Stmt::For {
                            var,
                            start,
                            end,
                            body,
                        }))
                    }
                    Token::Vars => {
                        self.advance();
                        self.parse_vars_body()?;
                        Ok(None)
                    }
                    _ => Err(self.unexpected("'vars', 'ihu', 'while' or 'hor' after '{'")),
                }
            }
            Token::Colon => {
                self.advance(); // consume ':'
                match self.peek() {
                    Token::Yosoro => {
                        self.advance();
                        Ok(Some(Stmt::Print(self.parse_expr()?)))
                    }
                    Token::Set => {
                        self.advance();
                        let target = self.parse_operand()?;
                        self.expect(Token::Comma, "',' after assignment target")?;
                        let value = self.parse_expr()?;
                        Ok(Some(Stmt::Assign { target, value }))
                    }
                    _ => Err(self.unexpected("'yosoro' or 'set' after ':'")),
                }
            }
            _ => Err(self.unexpected("statement")),
        }
    }

    /// Statements up to and including the block's closing `}`.
    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParserError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(body);
                }
                Token::Eof => return Err(self.error("unexpected EOF, expected '}'")),
                _ => body.extend(self.parse_stmt()?),
            }
        }
    }

    /// `cmp, left, right`
    fn parse_cond(&mut self) -> Result<Cond, ParserError> {
        let cmp = self
            .peek()
            .as_cmp()
            .ok_or_else(|| self.unexpected("comparison (lt, gt, le, ge, eq, neq)"))?;
        self.advance();

        self.expect(Token::Comma, "',' after comparison")?;
        let left = self.parse_expr()?;
        self.expect(Token::Comma, "',' between compared expressions")?;
        let right = self.parse_expr()?;

        Ok(Cond { cmp, left, right })
    }

    fn resolve(&self, sym: Symbol) -> Result<DeclIdx, ParserError> {
        self.symbols.iter().position(|s| *s == sym).ok_or_else(|| {
            self.error(format!(
                "undeclared variable '{}'",
                self.pool.resolve(sym)
            ))
        })
    }

    /// A scalar name, or an array name followed by `[index]`.
    fn parse_operand(&mut self) -> Result<Operand, ParserError> {
        let sym = match self.peek() {
            Token::Ident(sym) => sym,
            _ => return Err(self.unexpected("variable name")),
        };
        let decl = self.resolve(sym)?;
        self.advance();

        let name = self.pool.resolve(sym);
        match (self.decls[decl].is_array(), self.peek()) {
            (true, Token::LBracket) => {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(Token::RBracket, "']' after array index")?;
                Ok(Operand::Element {
                    decl,
                    index: Box::new(index),
                })
            }
            (true, _) => Err(self.error(format!("array '{}' needs an index", name))),
            (false, Token::LBracket) => {
                Err(self.error(format!("variable '{}' is not an array", name)))
            }
            (false, _) => Ok(Operand::Scalar(decl)),
        }
    }

    /// Parses a flattened linear expression.
    ///
    /// ```text
    /// [sign] term { [sign] term }
    /// ```
    ///
    /// A term is an integer literal or an operand. A missing sign means `+`;
    /// consecutive signs compose. The expression ends at `Eof : , { } [ ]`.
    /// Integer terms fold into the constant, operand terms merge by
    /// structural equality, and the result is normalized.
    fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        let mut expr = Expr::default();
        let mut has_term = false;

        while !self.peek().ends_expr() {
            let mut negative = false;
            let mut signed = false;
            while let Token::Plus | Token::Minus = self.peek() {
                negative ^= self.advance() == Token::Minus;
                signed = true;
            }

            match self.peek() {
                Token::Integer(sym) => {
                    let value = self.integer_value(sym, negative)?;
                    self.advance();
                    expr.add_constant(value);
                }
                Token::Ident(_) => {
                    let operand = self.parse_operand()?;
                    expr.add_term(if negative { -1 } else { 1 }, operand);
                }
                _ if signed => return Err(self.unexpected("integer or variable after sign")),
                _ => return Err(self.unexpected("integer or variable")),
            }
            has_term = true;
        }

        if !has_term {
            return Err(self.unexpected("expression"));
        }

        Ok(expr.normalized())
    }
}
