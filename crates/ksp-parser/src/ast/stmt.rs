//! Statement AST nodes.

use ksp_core::Span;

use super::decl::FunctionDef;
use super::expr::{Expr, FunctionCall, Ident, VarRef};

/// A statement with its source position.
///
/// `trace` lists the call sites this statement was inlined through,
/// innermost first. It is empty for statements that were written in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub trace: Vec<Span>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            span,
            trace: Vec::new(),
        }
    }

    /// A statement that inherits position and trace from `origin`.
    pub fn at(kind: StmtKind, origin: &Stmt) -> Self {
        Self {
            kind,
            span: origin.span,
            trace: origin.trace.clone(),
        }
    }

    pub fn assign(target: VarRef, value: Expr, span: Span) -> Self {
        Self::new(StmtKind::Assign(Assignment { target, value }), span)
    }

    pub fn call(call: FunctionCall) -> Self {
        let span = call.span;
        Self::new(StmtKind::Call(call), span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Property(Box<PropertyDecl>),
    Declare(Box<Declaration>),
    Assign(Assignment),
    /// Procedure call in statement position
    Call(FunctionCall),
    While(WhileLoop),
    For(Box<ForLoop>),
    Family(Family),
    If(IfStmt),
    Select(SelectStmt),
}

/// `declare [modifiers] name[size](params) := init`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Ident,
    pub modifiers: Vec<String>,
    pub size: Option<Expr>,
    /// UI-control parameters, e.g. the `(0, 100)` of a `ui_slider`.
    pub params: Vec<Expr>,
    pub init: Option<Initializer>,
}

impl Declaration {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn remove_modifier(&mut self, modifier: &str) {
        self.modifiers.retain(|m| m != modifier);
    }

    pub fn is_const(&self) -> bool {
        self.has_modifier("const")
    }

    /// The `ui_*` modifier, if this declares a UI control.
    pub fn ui_kind(&self) -> Option<&str> {
        self.modifiers
            .iter()
            .map(String::as_str)
            .find(|m| m.starts_with("ui_"))
    }

    /// The first value of the initializer, used for type inference.
    pub fn first_value(&self) -> Option<&Expr> {
        match self.init.as_ref()? {
            Initializer::Single(expr) => Some(expr),
            Initializer::List(values) => values.first(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    /// `:= expr`
    Single(Expr),
    /// `:= (a, b, c)`
    List(Vec<Expr>),
}

/// `target := value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: VarRef,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// `for var := start to|downto end [step s]`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub var: VarRef,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
    pub downto: bool,
    pub body: Vec<Stmt>,
}

/// `family name ... end family`
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    pub name: Ident,
    pub body: Vec<Stmt>,
}

/// `if/else if/else`. After lowering there is exactly one branch.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub branches: Vec<CondBranch>,
    pub else_body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub scrutinee: Expr,
    pub cases: Vec<SelectCase>,
}

/// `case start [to end]`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCase {
    pub start: Expr,
    pub end: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// `property name ... end property` or the alias form `property name[i] -> target`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: Ident,
    pub body: PropertyBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyBody {
    /// Explicit accessor functions; names are validated during lowering.
    Accessors(Vec<FunctionDef>),
    /// Accessors synthesized from the aliased variable.
    Alias { indices: Vec<Ident>, target: VarRef },
}
