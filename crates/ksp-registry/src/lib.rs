//! KSP registry crate.
//!
//! - [`Builtins`]: the read-only tables of engine variables, functions and keywords
//! - [`SymbolTable`]: names declared by the script being compiled
//! - [`CallGraph`]: caller to callee edges between user functions

mod builtins;
mod call_graph;
mod symbols;

pub use builtins::{Builtins, BuiltinsError, Signature};
pub use call_graph::{CallGraph, CallNode};
pub use symbols::SymbolTable;
