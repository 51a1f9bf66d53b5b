//! Shared vocabulary of the KSP compiler crates.
//!
//! - [`Span`] / [`Location`]: source positions and inlining traces
//! - [`Sigil`]: the one-character variable type tags
//! - [`QualifiedName`]: namespace-qualified names
//! - [`error`]: the error taxonomy used by every phase

pub mod error;
mod qualified_name;
mod sigil;
mod span;

pub use error::{
    CompileError, ErrorCategory, KspError, LexError, ParseError, ParseErrorKind, ParseErrors,
};
pub use qualified_name::{QualifiedName, first_part, last_part};
pub use sigil::Sigil;
pub use span::{Location, Span};
