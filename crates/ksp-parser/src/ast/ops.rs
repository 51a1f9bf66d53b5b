//! Operator definitions for expressions.
//!
//! The same precedence table drives both the Pratt parser (via
//! [`BinaryOp::binding_power`]) and the emitter's parenthesization (via
//! [`BinaryOp::precedence`]).

use crate::lexer::TokenKind;
use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `&` string concatenation
    Concat,
    /// `or`
    Or,
    /// `xor`
    Xor,
    /// `and`
    And,
    /// `=`
    Equal,
    /// `#`
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    /// `.or.`
    BitOr,
    /// `.xor.`
    BitXor,
    /// `.and.`
    BitAnd,
    Add,
    Sub,
    Mul,
    Div,
    /// `mod`
    Mod,
}

impl BinaryOp {
    /// Precedence level, higher binds tighter.
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Concat => 0,
            Or => 1,
            Xor => 2,
            And => 3,
            Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual => 5,
            BitOr => 6,
            BitXor => 7,
            BitAnd => 8,
            Add | Sub => 10,
            Mul | Div | Mod => 11,
        }
    }

    /// Left and right binding power for Pratt parsing. All binary operators are left-associative.
    pub fn binding_power(self) -> (u8, u8) {
        let base = (self.precedence() + 1) * 2;
        (base, base + 1)
    }

    pub fn from_token(kind: TokenKind) -> Option<Self> {
        use TokenKind::*;
        Some(match kind {
            Amp => BinaryOp::Concat,
            Or => BinaryOp::Or,
            Xor => BinaryOp::Xor,
            And => BinaryOp::And,
            Equal => BinaryOp::Equal,
            NotEqual => BinaryOp::NotEqual,
            Less => BinaryOp::Less,
            Greater => BinaryOp::Greater,
            LessEqual => BinaryOp::LessEqual,
            GreaterEqual => BinaryOp::GreaterEqual,
            BitOr => BinaryOp::BitOr,
            BitXor => BinaryOp::BitXor,
            BitAnd => BinaryOp::BitAnd,
            Plus => BinaryOp::Add,
            Minus => BinaryOp::Sub,
            Star => BinaryOp::Mul,
            Slash => BinaryOp::Div,
            Mod => BinaryOp::Mod,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Concat => "&",
            Or => "or",
            Xor => "xor",
            And => "and",
            Equal => "=",
            NotEqual => "#",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            BitOr => ".or.",
            BitXor => ".xor.",
            BitAnd => ".and.",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "mod",
        }
    }

    /// Operators written without surrounding spaces in emitted code.
    pub fn is_tight(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Add | Sub | Mul | Div | Equal | Less | Greater | LessEqual | GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
    /// `.not. x`
    BitNot,
}

impl UnaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            UnaryOp::Not => 4,
            UnaryOp::BitNot => 9,
            UnaryOp::Neg => 12,
        }
    }

    /// Right binding power used to parse the operand.
    pub fn binding_power(self) -> u8 {
        (self.precedence() + 1) * 2
    }

    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::BitNot => Some(UnaryOp::BitNot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
            UnaryOp::BitNot => ".not.",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
