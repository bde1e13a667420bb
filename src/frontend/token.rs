use crate::frontend::str_pool::Symbol;
use crate::lang::expr::Cmp;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    // Literals
    Integer(Symbol),

    // Keywords
    Vars,
    Set,
    Yosoro,
    Ihu,
    Hor,
    While,
    Int,
    Array,

    // Comparison keywords
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Neq,

    // Punctuation
    Plus,
    Minus,
    Comma,
    Colon,
    DotDot,

    // Delimiters
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }

    // Identifier (variable name)
    Ident(Symbol),

    Eof,
}

impl Token {
    /// Keyword table, matched by exact spelling.
    pub const KEYWORDS: [(&'static str, Token); 14] = [
        ("vars", Token::Vars),
        ("set", Token::Set),
        ("yosoro", Token::Yosoro),
        ("ihu", Token::Ihu),
        ("hor", Token::Hor),
        ("while", Token::While),
        ("int", Token::Int),
        ("array", Token::Array),
        ("lt", Token::Lt),
        ("gt", Token::Gt),
        ("le", Token::Le),
        ("ge", Token::Ge),
        ("eq", Token::Eq),
        ("neq", Token::Neq),
    ];

    pub fn keyword(word: &str) -> Option<Token> {
        Self::KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == word)
            .map(|(_, token)| *token)
    }

    /// The comparison a comparison keyword stands for.
    pub fn as_cmp(&self) -> Option<Cmp> {
        match self {
            Token::Lt => Some(Cmp::Lt),
            Token::Gt => Some(Cmp::Gt),
            Token::Le => Some(Cmp::Le),
            Token::Ge => Some(Cmp::Ge),
            Token::Eq => Some(Cmp::Eq),
            Token::Neq => Some(Cmp::Neq),
            _ => None,
        }
    }

    /// Tokens that end a flattened expression.
    pub fn ends_expr(&self) -> bool {
        matches!(
            self,
            Token::Eof
                | Token::Colon
                | Token::Comma
                | Token::LBrace
                | Token::RBrace
                | Token::LBracket
                | Token::RBracket
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Integer(_) => write!(f, "integer literal"),
            Token::Vars => write!(f, "vars"),
            Token::Set => write!(f, "set"),
            Token::Yosoro => write!(f, "yosoro"),
            Token::Ihu => write!(f, "ihu"),
            Token::Hor => write!(f, "hor"),
            Token::While => write!(f, "while"),
            Token::Int => write!(f, "int"),
            Token::Array => write!(f, "array"),
            Token::Lt => write!(f, "lt"),
            Token::Gt => write!(f, "gt"),
            Token::Le => write!(f, "le"),
            Token::Ge => write!(f, "ge"),
            Token::Eq => write!(f, "eq"),
            Token::Neq => write!(f, "neq"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::DotDot => write!(f, ".."),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Ident(_) => write!(f, "identifier"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
