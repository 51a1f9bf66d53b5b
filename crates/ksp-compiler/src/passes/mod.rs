//! Lowering passes, in pipeline order.
//!
//! - [`combine`]: merge callbacks declared more than once
//! - [`lower`]: namespaces, families, properties, declarations, loops
//! - [`sigils`]: give every variable reference its type sigil
//! - [`expand`]: property access, function inlining, taskfunc call sites
//! - [`taskfunc`]: stack frames for taskfunc bodies
//! - [`order`]: reachability, recursion check, emission order, hoisting
//! - [`control_pars`]: subscript and control-parameter checks
//! - [`dots`]: `.` to `__` in every name
//! - [`optimize`]: constant folding and dead branches
//! - [`compact`]: short hashed variable names
//!
//! Each pass consumes the tree and returns a new one; shared state lives in
//! the [`CompilationContext`](crate::CompilationContext).

pub mod combine;
pub mod compact;
pub mod control_pars;
pub mod dots;
pub mod expand;
pub mod lower;
pub mod optimize;
pub mod order;
pub mod sigils;
mod substitute;
pub mod taskfunc;

pub use combine::combine_callbacks;
pub use compact::{CompactPass, CompactionMap};
pub use control_pars::ControlParPass;
pub use dots::DotsPass;
pub use expand::ExpandPass;
pub use lower::LowerPass;
pub use optimize::OptimizePass;
pub use order::OrderPass;
pub use sigils::SigilPass;
pub use taskfunc::TaskfuncPass;

use ksp_core::Span;
use ksp_parser::ast::{BinaryOp, Expr, Ident, VarRef};

/// Names of the taskfunc stack: the frame array and its two pointers.
pub(crate) const STACK: &str = "%p";
pub(crate) const FRAME_POINTER: &str = "$fp";
pub(crate) const STACK_POINTER: &str = "$sp";

/// An identifier the resolver must leave alone.
pub(crate) fn fixed_ident(text: &str, span: Span) -> Ident {
    let mut ident = Ident::parse(text, span);
    ident.qualified = true;
    ident
}

pub(crate) fn fixed_var(text: &str, span: Span) -> VarRef {
    VarRef::new(fixed_ident(text, span))
}

/// `%p[<pointer> <op> <offset>]`, or `%p[<pointer>]` for a zero offset.
pub(crate) fn stack_slot(pointer: &str, op: BinaryOp, offset: i32, span: Span) -> VarRef {
    let base = Expr::Var(fixed_var(pointer, span));
    let index = if offset == 0 {
        base
    } else {
        Expr::binary(base, op, Expr::int(offset, span))
    };
    VarRef::with_subscripts(fixed_ident(STACK, span), vec![index])
}
