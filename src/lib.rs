//! kspc - a lowering compiler for KSP scripts.
//!
//! The workspace is split into focused crates; this one ties them together:
//!
//! - [`ksp_core`]: spans, sigils and the error taxonomy
//! - [`ksp_parser`]: lexer, AST and parser
//! - [`ksp_registry`]: built-in tables, symbol table and call graph
//! - [`ksp_compiler`]: the lowering passes, the emitter and the pipeline
//!
//! ```
//! let source = "on init\n  declare $count\nend on\n\
//!               on note\n  count := count + 1\nend on";
//! let compiled = kspc::compile(source, &kspc::CompileOptions::default()).expect("compiles");
//! assert_eq!(compiled.code, "on init\ndeclare $count\nend on\non note\n$count := $count+1\nend on\n");
//! ```

pub use ksp_compiler::{
    CompactionMap, CompilationContext, Compiled, Compiler, CompileOptions, Emitter, scan_pragmas,
};
pub use ksp_core::{CompileError, ErrorCategory, KspError, Location, ParseError, ParseErrors, Sigil, Span};
pub use ksp_parser::{LineInfo, LineMap, Parser};
pub use ksp_registry::Builtins;

pub mod ast {
    pub use ksp_parser::ast::*;
}

/// Compile a single-file script with the standard built-in tables.
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compiled, KspError> {
    let builtins = Builtins::standard();
    Compiler::new(&builtins, options.clone()).compile_source(source)
}

/// Compile a script assembled from several files, described by `lines`.
pub fn compile_with_lines(source: &str, lines: &LineMap, options: &CompileOptions) -> Result<Compiled, KspError> {
    let builtins = Builtins::standard();
    Compiler::new(&builtins, options.clone()).compile(source, lines)
}
