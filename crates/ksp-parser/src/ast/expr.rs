//! Expression AST nodes.
//!
//! Nodes own their children (`Box`/`Vec`), so `clone()` is a deep copy with
//! no shared mutable state. The inliner relies on this when it copies a
//! function body into each call site.

use ksp_core::{Sigil, Span};
use rust_decimal::Decimal;
use std::fmt;

use super::ops::{BinaryOp, UnaryOp};

/// An identifier occurrence: optional sigil plus a possibly dotted name.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub sigil: Option<Sigil>,
    /// Name without the sigil, e.g. `lib.fam.volume`.
    pub name: String,
    pub span: Span,
    /// Set once the namespace prefix has been applied, so the resolver never prefixes twice.
    pub qualified: bool,
}

impl Ident {
    pub fn new(sigil: Option<Sigil>, name: impl Into<String>, span: Span) -> Self {
        Self {
            sigil,
            name: name.into(),
            span,
            qualified: false,
        }
    }

    /// Split source text such as `$volume` into sigil and name.
    pub fn parse(text: &str, span: Span) -> Self {
        let (sigil, name) = Sigil::split(text);
        Self::new(sigil, name, span)
    }

    /// The name including its sigil.
    pub fn full(&self) -> String {
        match self.sigil {
            Some(sigil) => format!("{sigil}{}", self.name),
            None => self.name.clone(),
        }
    }

    /// The same identifier with another name (keeps the span).
    pub fn renamed(&self, sigil: Option<Sigil>, name: impl Into<String>) -> Self {
        Self {
            sigil,
            name: name.into(),
            span: self.span,
            qualified: self.qualified,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sigil) = self.sigil {
            write!(f, "{sigil}")?;
        }
        f.write_str(&self.name)
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    /// 32-bit integer literal (already wrapped)
    Integer(IntLit),
    /// Decimal real literal
    Real(RealLit),
    /// String literal, quotes included
    String(StrLit),
    /// Boolean value, only produced by constant folding
    Boolean(BoolLit),
    /// Variable reference with optional subscripts
    Var(VarRef),
    /// Function call (builtin or user)
    Call(Box<FunctionCall>),
    /// Opaque comma-separated initializer text
    RawArray(RawArrayInit),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Integer(e) => e.span,
            Expr::Real(e) => e.span,
            Expr::String(e) => e.span,
            Expr::Boolean(e) => e.span,
            Expr::Var(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::RawArray(e) => e.span,
        }
    }

    pub fn int(value: i32, span: Span) -> Self {
        Expr::Integer(IntLit { value, span })
    }

    pub fn boolean(value: bool, span: Span) -> Self {
        Expr::Boolean(BoolLit { value, span })
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        let span = left.span().merge(right.span());
        Expr::Binary(Box::new(BinaryExpr {
            left,
            op,
            right,
            span,
        }))
    }

    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Expr::Unary(Box::new(UnaryExpr { op, operand, span }))
    }

    /// A subscript-free reference to an identifier.
    pub fn var(ident: Ident) -> Self {
        Expr::Var(VarRef::new(ident))
    }

    pub fn call(call: FunctionCall) -> Self {
        Expr::Call(Box::new(call))
    }

    pub fn as_var(&self) -> Option<&VarRef> {
        match self {
            Expr::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_int(&self, value: i32) -> bool {
        matches!(self, Expr::Integer(lit) if lit.value == value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Expr,
    pub op: BinaryOp,
    pub right: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLit {
    pub value: i32,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealLit {
    pub value: Decimal,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    /// Source spelling including the quotes.
    pub raw: String,
    pub span: Span,
}

impl StrLit {
    /// The contents between the quotes, escapes left as written.
    pub fn contents(&self) -> &str {
        let raw = self.raw.as_str();
        if raw.len() >= 2 { &raw[1..raw.len() - 1] } else { raw }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawArrayInit {
    pub text: String,
    pub span: Span,
}

/// `name` or `name[index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub ident: Ident,
    pub subscripts: Vec<Expr>,
    pub span: Span,
}

impl VarRef {
    pub fn new(ident: Ident) -> Self {
        let span = ident.span;
        Self {
            ident,
            subscripts: Vec::new(),
            span,
        }
    }

    pub fn with_subscripts(ident: Ident, subscripts: Vec<Expr>) -> Self {
        let span = ident.span;
        Self {
            ident,
            subscripts,
            span,
        }
    }
}

/// A call. `is_procedure` marks statement position; `using_call` marks the `call` keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub is_procedure: bool,
    pub using_call: bool,
    pub span: Span,
}

impl FunctionCall {
    pub fn new(name: Ident, args: Vec<Expr>, is_procedure: bool) -> Self {
        let span = name.span;
        Self {
            name,
            args,
            is_procedure,
            using_call: false,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_parse_and_display() {
        let ident = Ident::parse("%lib.keys", Span::new(1, 1, 9));
        assert_eq!(ident.sigil, Some(Sigil::IntegerArray));
        assert_eq!(ident.name, "lib.keys");
        assert_eq!(ident.full(), "%lib.keys");
        assert_eq!(ident.to_string(), "%lib.keys");
        assert!(!ident.qualified);
    }

    #[test]
    fn clone_is_deep() {
        let var = Expr::var(Ident::parse("$x", Span::default()));
        let sum = Expr::binary(var, BinaryOp::Add, Expr::int(1, Span::default()));
        let mut copy = sum.clone();
        if let Expr::Binary(bin) = &mut copy {
            bin.right = Expr::int(2, Span::default());
        }
        assert_ne!(sum, copy);
    }

    #[test]
    fn string_contents() {
        let lit = StrLit {
            raw: "\"abc\"".to_string(),
            span: Span::default(),
        };
        assert_eq!(lit.contents(), "abc");
    }

    #[test]
    fn binary_span_covers_operands() {
        let left = Expr::int(1, Span::new(1, 1, 1));
        let right = Expr::int(2, Span::new(1, 5, 1));
        assert_eq!(Expr::binary(left, BinaryOp::Add, right).span(), Span::new(1, 1, 5));
    }
}
