//! Constant expression evaluation.
//!
//! Integer arithmetic wraps to 32 bits the way the engine does. Division
//! truncates toward zero and `mod` takes the sign of the dividend.

use std::fmt;

use ksp_parser::ast::{BinaryOp, Expr, UnaryOp};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Real(Decimal),
    Str(String),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Real(v) => !v.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    /// The literal expression for this value, if it has one.
    pub fn to_expr(&self, at: &Expr) -> Option<Expr> {
        let span = at.span();
        match self {
            Value::Int(v) => Some(Expr::int(*v, span)),
            Value::Real(v) => Some(Expr::Real(ksp_parser::ast::RealLit { value: *v, span })),
            Value::Bool(b) => Some(Expr::boolean(*b, span)),
            Value::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expression is not constant")]
    NotConstant,

    #[error("numeric value expected, found {found}")]
    NotNumeric { found: String },

    #[error("integer value expected")]
    NotInteger,

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,
}

/// Constant variable values, keyed by lower-cased name with sigil.
pub type ConstTable = FxHashMap<String, Value>;

/// Evaluate an expression that uses only literals.
pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    evaluate_with(expr, &ConstTable::default())
}

/// Evaluate an expression, reading scalar constants from `constants`.
pub fn evaluate_with(expr: &Expr, constants: &ConstTable) -> Result<Value, EvalError> {
    match expr {
        Expr::Integer(lit) => Ok(Value::Int(lit.value)),
        Expr::Real(lit) => Ok(Value::Real(lit.value)),
        Expr::String(lit) => Ok(Value::Str(lit.contents().to_string())),
        Expr::Boolean(lit) => Ok(Value::Bool(lit.value)),
        Expr::Var(var) if var.subscripts.is_empty() => constants
            .get(&var.ident.full().to_lowercase())
            .cloned()
            .ok_or(EvalError::NotConstant),
        Expr::Var(_) | Expr::Call(_) | Expr::RawArray(_) => Err(EvalError::NotConstant),
        Expr::Unary(un) => {
            let value = evaluate_with(&un.operand, constants)?;
            unary(un.op, value)
        }
        Expr::Binary(bin) => {
            let left = evaluate_with(&bin.left, constants)?;
            let right = evaluate_with(&bin.right, constants)?;
            binary(bin.op, left, right)
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
        (UnaryOp::Neg, Value::Real(v)) => Ok(Value::Real(-v)),
        (UnaryOp::BitNot, Value::Int(v)) => Ok(Value::Int(!v)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, _) => Err(EvalError::NotConstant),
        (_, other) => Err(not_numeric(&other)),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    match op {
        Add | Sub | Mul | Div => arithmetic(op, numeric(left)?, numeric(right)?),
        Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual => {
            let (a, b) = (numeric(left)?, numeric(right)?);
            let ordering = a.as_decimal().cmp(&b.as_decimal());
            Ok(Value::Bool(match op {
                Equal => ordering.is_eq(),
                NotEqual => ordering.is_ne(),
                Less => ordering.is_lt(),
                Greater => ordering.is_gt(),
                LessEqual => ordering.is_le(),
                _ => ordering.is_ge(),
            }))
        }
        BitAnd | BitOr | BitXor => {
            let (a, b) = (integer(left)?, integer(right)?);
            Ok(Value::Int(match op {
                BitAnd => a & b,
                BitOr => a | b,
                _ => a ^ b,
            }))
        }
        Mod => match (numeric(left)?, numeric(right)?) {
            (Num::Int(_), Num::Int(0)) => Err(EvalError::DivisionByZero),
            (Num::Int(a), Num::Int(b)) => {
                let rem = (i64::from(a).abs() % i64::from(b).abs()) as i32;
                Ok(Value::Int(if a < 0 { rem.wrapping_neg() } else { rem }))
            }
            (a, b) => {
                let divisor = b.as_decimal();
                if divisor.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                a.as_decimal()
                    .checked_rem(divisor)
                    .map(Value::Real)
                    .ok_or(EvalError::Overflow)
            }
        },
        Concat => Ok(Value::Str(format!("{left}{right}"))),
        And | Or | Xor => {
            let (a, b) = (left.truthy(), right.truthy());
            Ok(Value::Bool(match op {
                And => a && b,
                Or => a || b,
                _ => a ^ b,
            }))
        }
    }
}

#[derive(Clone, Copy)]
enum Num {
    Int(i32),
    Real(Decimal),
}

impl Num {
    fn as_decimal(self) -> Decimal {
        match self {
            Num::Int(v) => Decimal::from(v),
            Num::Real(v) => v,
        }
    }
}

fn numeric(value: Value) -> Result<Num, EvalError> {
    match value {
        Value::Int(v) => Ok(Num::Int(v)),
        Value::Real(v) => Ok(Num::Real(v)),
        other => Err(not_numeric(&other)),
    }
}

fn integer(value: Value) -> Result<i32, EvalError> {
    match value {
        Value::Int(v) => Ok(v),
        Value::Real(_) => Err(EvalError::NotInteger),
        other => Err(not_numeric(&other)),
    }
}

fn not_numeric(value: &Value) -> EvalError {
    EvalError::NotNumeric {
        found: value.to_string(),
    }
}

fn arithmetic(op: BinaryOp, a: Num, b: Num) -> Result<Value, EvalError> {
    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        return Ok(Value::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            // x / 0 evaluates to 0
            _ if b == 0 => 0,
            _ => a.wrapping_div(b),
        }));
    }

    let (a, b) = (a.as_decimal(), b.as_decimal());
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        _ if b.is_zero() => Some(Decimal::ZERO),
        _ => a.checked_div(b),
    };
    result.map(Value::Real).ok_or(EvalError::Overflow)
}
