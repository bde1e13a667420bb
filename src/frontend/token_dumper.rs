use crate::frontend::lexer::Spanned;
use crate::frontend::str_pool::StrPool;
use crate::frontend::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, resolves identifier and integer text
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: false,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    #[allow(dead_code)]
    pub fn debug_repr(mut self) -> Self {
        self.show_debug_repr = true;
        self
    }

    pub fn dump(&self, tokens: &[Spanned], pool: &StrPool) {
        for s in tokens {
            println!("{}", self.format_one(s, pool));
        }
    }

    fn format_one(&self, s: &Spanned, pool: &StrPool) -> String {
        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let text = if self.show_debug_repr {
            format!("{:?}", s.token)
        } else {
            match s.token {
                Token::Integer(sym) | Token::Ident(sym) => pool.resolve(sym).to_string(),
                other => other.to_string(),
            }
        };

        format!(
            "[{:02}:{:02}] {}{:<8} {}{}",
            s.span.line, s.span.col, colr, kind, text, reset
        )
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Eof => "EOF",
            Integer(_) => "INT",
            Ident(_) => "IDENT",

            // structure
            LBracket | RBracket => "BRACKET",
            LBrace | RBrace => "BRACE",
            Comma | Colon | DotDot => "PUNCT",

            Plus | Minus => "OP",
            Lt | Gt | Le | Ge | Eq | Neq => "CMP",

            Vars | Set | Yosoro | Ihu | Hor | While | Int | Array => "KEYWORD",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Eof | Comma | Colon | DotDot => Self::DIM,
            Integer(_) => Self::CYN,
            Ident(_) => Self::YEL,
            Plus | Minus | Lt | Gt | Le | Ge | Eq | Neq => Self::MAG,
            Vars | Set | Yosoro | Ihu | Hor | While | Int | Array => Self::BLU,
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    #[test]
    fn test_plain_dump_resolves_text() {
        let mut lexer = Lexer::new(":yosoro abc+12");
        let tokens = lexer.tokenize();
        let dumper = TokenDumper::new().no_color();

        let lines: Vec<String> = tokens
            .iter()
            .map(|s| dumper.format_one(s, lexer.pool()))
            .collect();

        assert_eq!(lines[0], "[01:01] PUNCT    :");
        assert_eq!(lines[1], "[01:02] KEYWORD  yosoro");
        assert_eq!(lines[2], "[01:09] IDENT    abc");
        assert_eq!(lines[3], "[01:12] OP       +");
        assert_eq!(lines[4], "[01:13] INT      12");
        assert_eq!(lines[5], "[01:15] EOF      EOF");
    }

    #[test]
    fn test_color_wraps_line() {
        let mut lexer = Lexer::new("hor");
        let tokens = lexer.tokenize();
        let line = TokenDumper::new().format_one(&tokens[0], lexer.pool());
        assert!(line.contains("\x1b[34m"));
        assert!(line.ends_with("\x1b[0m"));
    }
}
