//! Lexical analysis for KSP source.

mod cursor;
mod lexer;
mod token;

pub use lexer::{Lexer, tokenize};
pub use token::{Token, TokenKind};
