//! Top-level blocks: callbacks and function definitions.

use bitflags::bitflags;
use ksp_core::Span;

use super::expr::Ident;
use super::stmt::Stmt;

/// A parsed script: top-level blocks in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub blocks: Vec<Block>,
}

impl Module {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn callbacks(&self) -> impl Iterator<Item = &Callback> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Callback(cb) => Some(cb),
            Block::Function(_) => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Function(f) => Some(f),
            Block::Callback(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Function(FunctionDef),
    Callback(Callback),
}

/// `on name [(variable)] ... end on`
#[derive(Debug, Clone, PartialEq)]
pub struct Callback {
    pub name: String,
    /// Bound UI control, e.g. `on ui_control ($knob)`.
    pub variable: Option<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Callback {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            variable: None,
            body,
            span: Span::default(),
        }
    }

    pub fn is_init(&self) -> bool {
        self.name == "init"
    }
}

bitflags! {
    /// Function definition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u8 {
        /// Declared with `taskfunc`: suspendable, lowered to a stack frame.
        const TASKFUNC = 1 << 0;
        /// Declared with `override`: replaces an earlier definition.
        const OVERRIDE = 1 << 1;
    }
}

/// How an argument is passed to a taskfunc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamKind {
    /// Copied in only.
    #[default]
    Value,
    /// Copied out only.
    Out,
    /// Lives in the frame slot only; neither copied in nor out.
    Ref,
    /// Copied in and out.
    Var,
}

impl ParamKind {
    pub fn copies_in(self) -> bool {
        matches!(self, ParamKind::Value | ParamKind::Var)
    }

    pub fn copies_out(self) -> bool {
        matches!(self, ParamKind::Out | ParamKind::Var)
    }

    pub fn keyword(self) -> Option<&'static str> {
        match self {
            ParamKind::Value => None,
            ParamKind::Out => Some("out"),
            ParamKind::Ref => Some("ref"),
            ParamKind::Var => Some("var"),
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "out" => Some(ParamKind::Out),
            "ref" => Some(ParamKind::Ref),
            "var" => Some(ParamKind::Var),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub kind: ParamKind,
}

impl Param {
    pub fn new(name: Ident, kind: ParamKind) -> Self {
        Self { name, kind }
    }
}

/// `[override] function|taskfunc name(params) -> result`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<Param>,
    pub result: Option<Ident>,
    pub body: Vec<Stmt>,
    pub flags: FunctionFlags,
    pub span: Span,
}

impl FunctionDef {
    pub fn is_taskfunc(&self) -> bool {
        self.flags.contains(FunctionFlags::TASKFUNC)
    }

    pub fn is_override(&self) -> bool {
        self.flags.contains(FunctionFlags::OVERRIDE)
    }

    /// Parameter names followed by the result name, if any.
    pub fn param_names(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|p| p.name.full())
            .chain(self.result.iter().map(Ident::full))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        let flags = FunctionFlags::TASKFUNC | FunctionFlags::OVERRIDE;
        assert!(flags.contains(FunctionFlags::TASKFUNC));
        assert!(!FunctionFlags::default().contains(FunctionFlags::OVERRIDE));
    }

    #[test]
    fn param_kinds() {
        assert!(ParamKind::Value.copies_in());
        assert!(!ParamKind::Value.copies_out());
        assert!(ParamKind::Var.copies_in() && ParamKind::Var.copies_out());
        assert!(!ParamKind::Out.copies_in());
        assert!(!ParamKind::Ref.copies_in() && !ParamKind::Ref.copies_out());
        assert_eq!(ParamKind::from_keyword("ref"), Some(ParamKind::Ref));
        assert_eq!(ParamKind::Out.keyword(), Some("out"));
    }

    #[test]
    fn param_names_include_result() {
        let f = FunctionDef {
            name: Ident::parse("mix", Span::default()),
            params: vec![Param::new(Ident::parse("a", Span::default()), ParamKind::Value)],
            result: Some(Ident::parse("r", Span::default())),
            body: Vec::new(),
            flags: FunctionFlags::empty(),
            span: Span::default(),
        };
        assert_eq!(f.param_names(), vec!["a".to_string(), "r".to_string()]);
        assert!(!f.is_taskfunc());
    }
}
