pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod str_pool;
pub mod token;
pub mod token_dumper;

use crate::lang::program::Program;
use lexer::Lexer;
use parser::Parser;
use parser_error::ParserError;

/// Lex and parse a whole source text.
#[allow(dead_code)]
pub fn parse_source(source: &str) -> Result<Program, ParserError> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    Parser::new(tokens, lexer.pool()).parse()
}
