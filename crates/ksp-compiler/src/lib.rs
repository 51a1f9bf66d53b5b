//! KSP Compiler
//!
//! Lowers a parsed KSP module to the flat dialect the engine accepts: no
//! user functions with parameters, no families, no properties, no nested
//! scopes. The result is printed back as KSP text.
//!
//! ## Modules
//!
//! - [`context`]: state shared by the passes of one compilation
//! - [`resolver`]: namespace and family aware name lookup
//! - [`const_eval`]: compile-time evaluation of constant expressions
//! - [`passes`]: the lowering passes, in pipeline order
//! - [`emit`]: the KSP text emitter
//! - [`pragma`]: `{ #pragma ... }` option overrides
//! - [`pipeline`]: the driver that runs all of the above
//!
//! ## Example
//!
//! ```
//! use ksp_compiler::{CompileOptions, Compiler};
//! use ksp_registry::Builtins;
//!
//! let builtins = Builtins::standard();
//! let source = "on init\n  declare $n\nend on\n\
//!               on note\n  bump(2)\nend on\n\
//!               function bump(amount)\n  n := n + amount\nend function";
//! let compiled = Compiler::new(&builtins, CompileOptions::default())
//!     .compile_source(source)
//!     .expect("valid script");
//! assert!(compiled.code.contains("$n := $n+2"));
//! ```

pub mod const_eval;
pub mod context;
pub mod emit;
pub mod options;
pub mod passes;
pub mod pipeline;
pub mod pragma;
pub mod resolver;

pub use const_eval::{ConstTable, Value};
pub use context::{CompilationContext, FunctionEntry};
pub use emit::Emitter;
pub use options::CompileOptions;
pub use passes::CompactionMap;
pub use pipeline::{Compiled, Compiler};
pub use pragma::scan_pragmas;

pub use ksp_core::{CompileError, ErrorCategory, KspError};
