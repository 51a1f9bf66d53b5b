//! Optimization Pass - Constant folding and dead branch removal.
//!
//! Runs only when `optimize_code` is enabled.
//!
//! ## Responsibilities
//!
//! - Replace references to scalar `declare const` variables with their values
//! - Fold constant subexpressions with the constant evaluator
//! - Apply `x*1`, `x*0`, `x+0` and Boolean `and`/`or` identities
//! - Drop `if` branches and `while` loops whose condition is constant false,
//!   truncate an `if` chain at a constant true branch, and resolve a `select`
//!   on a constant
//!
//! An `if (1=1)` written in the source is kept as is: it is a known
//! workaround for the engine's parser buffer limit.

use ksp_core::{CompileError, Span};
use ksp_parser::Fold;
use ksp_parser::ast::fold::{walk_expr, walk_stmt};
use ksp_parser::ast::{
    BinaryExpr, BinaryOp, Block, CondBranch, Expr, IfStmt, Initializer, Module, SelectStmt, Stmt, StmtKind,
};
use rust_decimal::Decimal;

use crate::const_eval::{ConstTable, evaluate_with};

#[derive(Default)]
pub struct OptimizePass {
    constants: ConstTable,
}

impl OptimizePass {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        for block in &module.blocks {
            let body = match block {
                Block::Callback(cb) => &cb.body,
                Block::Function(f) => &f.body,
            };
            self.collect_constants(body);
        }
        tracing::debug!(constants = self.constants.len(), "optimizing");
        self.fold_module(module)
    }

    fn collect_constants(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Declare(decl) if decl.is_const() && decl.size.is_none() => {
                    if let Some(Initializer::Single(init)) = &decl.init
                        && let Ok(value) = evaluate_with(init, &self.constants)
                    {
                        self.constants.insert(decl.name.full().to_lowercase(), value);
                    }
                }
                StmtKind::If(chain) => {
                    for branch in &chain.branches {
                        self.collect_constants(&branch.body);
                    }
                    self.collect_constants(&chain.else_body);
                }
                _ => {}
            }
        }
    }

    /// The literal for `expr` when it is constant, `expr` otherwise.
    fn evaluated(&self, expr: Expr) -> Expr {
        if is_literal(&expr) {
            return expr;
        }
        match evaluate_with(&expr, &self.constants) {
            Ok(value) => value.to_expr(&expr).unwrap_or(expr),
            Err(_) => expr,
        }
    }

    fn optimize_if(&mut self, chain: IfStmt, span: Span, trace: Vec<Span>) -> Result<Vec<Stmt>, CompileError> {
        let mut branches = Vec::new();
        let mut else_body = None;

        for (i, branch) in chain.branches.into_iter().enumerate() {
            let keep_literal = i == 0 && is_one_equals_one(&branch.cond);
            let cond = if keep_literal {
                branch.cond
            } else {
                self.fold_expr(branch.cond)?
            };
            let body = self.fold_stmts(branch.body)?;

            match bool_literal(&cond) {
                Some(false) => {}
                Some(true) => {
                    else_body = Some(body);
                    break;
                }
                None if keep_literal => {
                    branches.push(CondBranch { cond, body });
                    else_body = Some(Vec::new());
                    break;
                }
                None => branches.push(CondBranch { cond, body }),
            }
        }

        let else_body = match else_body {
            Some(body) => body,
            None => self.fold_stmts(chain.else_body)?,
        };
        if branches.is_empty() {
            return Ok(else_body);
        }
        Ok(vec![Stmt {
            kind: StmtKind::If(IfStmt { branches, else_body }),
            span,
            trace,
        }])
    }
}

fn prune(stmt: Stmt) -> Vec<Stmt> {
    let Stmt { kind, span, trace } = stmt;
    match kind {
        StmtKind::While(w) if bool_literal(&w.cond) == Some(false) => Vec::new(),
        StmtKind::Select(select) if is_constant_select(&select) => {
            let taken = taken_case(&select);
            taken
                .and_then(|index| select.cases.into_iter().nth(index))
                .map(|case| case.body)
                .unwrap_or_default()
        }
        kind => vec![Stmt { kind, span, trace }],
    }
}

fn is_constant_select(select: &SelectStmt) -> bool {
    int_literal(&select.scrutinee).is_some() && all_cases_literal(select)
}

/// The case a constant `select` takes, if any.
fn taken_case(select: &SelectStmt) -> Option<usize> {
    let value = int_literal(&select.scrutinee)?;
    select.cases.iter().position(|case| {
        let start = int_literal(&case.start);
        match case.end.as_ref().and_then(int_literal) {
            Some(end) => start.is_some_and(|s| s <= value && value <= end),
            None => start == Some(value),
        }
    })
}

fn all_cases_literal(select: &SelectStmt) -> bool {
    select.cases.iter().all(|case| {
        int_literal(&case.start).is_some() && case.end.as_ref().is_none_or(|e| int_literal(e).is_some())
    })
}

fn is_literal(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Integer(_) | Expr::Real(_) | Expr::String(_) | Expr::Boolean(_) | Expr::RawArray(_)
    )
}

fn int_literal(expr: &Expr) -> Option<i32> {
    match expr {
        Expr::Integer(lit) => Some(lit.value),
        _ => None,
    }
}

fn bool_literal(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Boolean(lit) => Some(lit.value),
        _ => None,
    }
}

fn is_number(expr: &Expr, n: i32) -> bool {
    match expr {
        Expr::Integer(lit) => lit.value == n,
        Expr::Real(lit) => lit.value == Decimal::from(n),
        _ => false,
    }
}

fn is_one_equals_one(expr: &Expr) -> bool {
    matches!(expr, Expr::Binary(bin) if bin.op == BinaryOp::Equal && bin.left.is_int(1) && bin.right.is_int(1))
}

fn simplify(bin: BinaryExpr) -> Expr {
    let BinaryExpr { left, op, right, span } = bin;
    match op {
        BinaryOp::Mul => {
            if is_number(&left, 0) {
                return left;
            }
            if is_number(&left, 1) {
                return right;
            }
            if is_number(&right, 0) {
                return right;
            }
            if is_number(&right, 1) {
                return left;
            }
        }
        BinaryOp::Add => {
            if is_number(&left, 0) {
                return right;
            }
            if is_number(&right, 0) {
                return left;
            }
        }
        BinaryOp::Or => {
            if let Some(value) = bool_literal(&left) {
                return if value { left } else { right };
            }
            if let Some(value) = bool_literal(&right) {
                return if value { right } else { left };
            }
        }
        BinaryOp::And => {
            if let Some(value) = bool_literal(&left) {
                return if value { right } else { left };
            }
            if let Some(value) = bool_literal(&right) {
                return if value { left } else { right };
            }
        }
        _ => {}
    }
    Expr::Binary(Box::new(BinaryExpr { left, op, right, span }))
}

impl Fold for OptimizePass {
    type Error = CompileError;

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, CompileError> {
        let Stmt { kind, span, trace } = stmt;
        match kind {
            StmtKind::If(chain) => self.optimize_if(chain, span, trace),
            kind => Ok(walk_stmt(self, Stmt { kind, span, trace })?
                .into_iter()
                .flat_map(prune)
                .collect()),
        }
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, CompileError> {
        let expr = match walk_expr(self, expr)? {
            Expr::Binary(bin) => simplify(*bin),
            expr => expr,
        };
        Ok(self.evaluated(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emitter;
    use crate::options::CompileOptions;
    use ksp_parser::{LineMap, Parser};
    use ksp_registry::Builtins;

    fn optimize(body: &str) -> String {
        let builtins = Builtins::standard();
        let source = format!("on init\n  declare const $N := 4\n{body}\nend on");
        let module = Parser::parse(&source, &LineMap::single(None)).expect("parse");
        let module = OptimizePass::new().run(module).expect("optimizes");
        let init = module.callbacks().next().expect("init");
        Emitter::new(&builtins, &CompileOptions::default()).emit_stmts(&init.body[1..])
    }

    #[test]
    fn constants_and_identities_fold() {
        assert_eq!(optimize("$x := $N * 2 + $y * 1"), "$x := 8+$y\n");
        assert_eq!(optimize("$x := $y * 0 + 3"), "$x := 3\n");
        assert_eq!(optimize("$x := 7 / 2 + (-7 mod 3)"), "$x := 2\n");
    }

    #[test]
    fn division_by_zero_folds_to_zero() {
        assert_eq!(optimize("$x := 1 / 0"), "$x := 0\n");
    }

    #[test]
    fn unfoldable_expressions_stay() {
        assert_eq!(optimize("$x := $y / 0"), "$x := $y/0\n");
        assert_eq!(optimize("@s := \"a\" & \"b\""), "@s := \"a\" & \"b\"\n");
    }

    #[test]
    fn dead_branches_are_dropped() {
        assert_eq!(optimize("if ($N = 4)\n  $x := 1\nelse\n  $x := 2\nend if"), "$x := 1\n");
        assert_eq!(optimize("if ($N # 4)\n  $x := 1\nelse\n  $x := 2\nend if"), "$x := 2\n");
        assert_eq!(optimize("while ($N < 0)\n  $x := 1\nend while"), "");
    }

    #[test]
    fn literal_one_equals_one_is_kept() {
        assert_eq!(optimize("if (1 = 1)\n  $x := 1\nend if"), "if (1=1)\n$x := 1\nend if\n");
    }

    #[test]
    fn constant_select_picks_its_case() {
        let source = "select ($N)\n  case 1 to 3\n    $x := 1\n  case 4\n    $x := 2\nend select";
        assert_eq!(optimize(source), "$x := 2\n");
        let source = "select ($y)\n  case 4\n    $x := 2\nend select";
        assert_eq!(optimize(source), "select ($y)\ncase 4\n$x := 2\nend select\n");
    }
}
