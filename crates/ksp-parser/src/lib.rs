//! KSP parser crate.
//!
//! - Lexical analysis ([`lexer`])
//! - AST definitions and the parser ([`ast`])
//! - [`LineMap`], the per-line file/namespace table produced by the preprocessor
//!
//! The entry point is [`parse`]:
//!
//! ```
//! let module = ksp_parser::parse("on note\n  play_note(60, 100, 0, -1)\nend on", &Default::default())
//!     .expect("valid script");
//! assert_eq!(module.blocks.len(), 1);
//! ```

pub mod ast;
pub mod lexer;
mod line_map;

pub use ast::Parser;
pub use ast::fold::Fold;
pub use lexer::{Lexer, Token, TokenKind};
pub use line_map::{LineInfo, LineMap};

pub use ksp_core::{ParseError, ParseErrorKind, ParseErrors};

/// Parse a KSP script into a [`ast::Module`].
pub fn parse(source: &str, lines: &LineMap) -> Result<ast::Module, ParseErrors> {
    Parser::parse(source, lines)
}
