//! Abstract Syntax Tree (AST) for KSP.
//!
//! This module provides:
//! - AST node definitions: [`decl`] (blocks), [`stmt`], [`expr`], [`ops`]
//! - The [`Parser`] that builds them from source text
//! - [`fold`], the tree-to-tree rewriting trait the compiler passes implement
//!
//! # Example
//!
//! ```
//! use ksp_parser::{LineMap, Parser};
//!
//! let source = "on init\n  declare $volume := 100\nend on\n";
//! let lines = LineMap::single(Some("main.ksp"));
//!
//! match Parser::parse(source, &lines) {
//!     Ok(module) => println!("parsed {} blocks", module.blocks.len()),
//!     Err(errors) => eprintln!("parse errors: {errors}"),
//! }
//! ```

pub mod ops;

mod parser;

pub mod expr;
mod expr_parser;

pub mod stmt;
mod stmt_parser;

pub mod decl;
mod decl_parser;

pub mod fold;

pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use parser::Parser;
pub use stmt::*;
