use log::trace;

use crate::frontend::str_pool::StrPool;
use crate::frontend::token::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// Turns CYaRon source into tokens.
///
/// Lexing never fails: whitespace and characters outside the language are
/// dropped, and the stream always ends with `Token::Eof`. Identifier and
/// integer texts go through the lexer's `StrPool`, which the parser borrows
/// afterwards to resolve them.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    pool: StrPool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            pool: StrPool::new(),
        }
    }

    pub fn pool(&self) -> &StrPool {
        &self.pool
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if !accept(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn read_number(&mut self) -> Token {
        let digits = self.read_while(|c| c.is_ascii_digit());
        Token::Integer(self.pool.intern(&digits))
    }

    /// `[A-Za-z_][A-Za-z0-9]*`. An underscore only starts a word, so `a_b`
    /// is `a` followed by `_b`.
    fn read_identifier(&mut self) -> Token {
        let mut word = String::new();
        if let Some(first) = self.advance() {
            word.push(first);
        }
        word.push_str(&self.read_while(|c| c.is_ascii_alphanumeric()));
        match Token::keyword(&word) {
            Some(keyword) => keyword,
            None => Token::Ident(self.pool.intern(&word)),
        }
    }

    fn read_punct(&mut self) -> Option<Token> {
        let ch = self.current()?;

        let token = match ch {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '.' if self.peek() == Some('.') => {
                self.advance();
                Token::DotDot
            }
            _ => return None,
        };
        self.advance();

        Some(token)
    }

    pub fn tokenize(&mut self) -> Vec<Spanned> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.current() {
            let span = self.span();

            if ch.is_whitespace() {
                self.advance();
                continue;
            }

            let token = if ch.is_ascii_digit() {
                self.read_number()
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                self.read_identifier()
            } else if let Some(token) = self.read_punct() {
                token
            } else {
                trace!("{}:{}: skipping character {:?}", span.line, span.col, ch);
                self.advance();
                continue;
            };

            tokens.push(Spanned { token, span });
        }

        tokens.push(Spanned {
            token: Token::Eof,
            span: self.span(),
        });
        tokens
    }
}
