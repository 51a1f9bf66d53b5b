//! Parameter substitution inside a copied function body.
//!
//! Keys are parameter names without sigil. A reference `x`, `$x` or
//! `x.field` to parameter `x` takes the argument's place; when the argument
//! is itself a variable reference the trailing dotted part and any
//! subscripts are kept.

use ksp_core::{CompileError, Span, first_part, last_part};
use ksp_parser::ast::fold::{fold_exprs, walk_call, walk_expr, walk_stmt, walk_var_ref};
use ksp_parser::ast::{Expr, FunctionCall, Ident, Stmt, VarRef};
use ksp_parser::{Fold, LineMap};
use rustc_hash::FxHashMap;

pub(crate) type Substitutions = FxHashMap<String, Expr>;

pub(crate) struct ParamSubstituter<'s> {
    lines: &'s LineMap,
    subst: &'s Substitutions,
    /// Appended to the trace of every statement, when inlining.
    call_site: Option<Span>,
    trace: Vec<Span>,
}

impl<'s> ParamSubstituter<'s> {
    pub(crate) fn new(lines: &'s LineMap, subst: &'s Substitutions, call_site: Option<Span>) -> Self {
        Self {
            lines,
            subst,
            call_site,
            trace: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&'s Expr> {
        self.subst.get(first_part(name))
    }

    /// `rep` with the dotted tail and subscripts of `var` carried over.
    fn merge(&mut self, var: VarRef, rep: &VarRef) -> Result<VarRef, CompileError> {
        let mut subscripts = fold_exprs(self, var.subscripts)?;
        subscripts.extend(rep.subscripts.iter().cloned());
        let name = format!("{}{}", rep.ident.name, last_part(&var.ident.name));
        let mut ident = Ident::new(rep.ident.sigil.or(var.ident.sigil), name, var.ident.span);
        ident.qualified = true;
        Ok(VarRef {
            ident,
            subscripts,
            span: var.span,
        })
    }
}

impl Fold for ParamSubstituter<'_> {
    type Error = CompileError;

    fn fold_stmt(&mut self, mut stmt: Stmt) -> Result<Vec<Stmt>, CompileError> {
        if let Some(site) = self.call_site {
            stmt.trace.push(site);
        }
        let saved = std::mem::replace(&mut self.trace, stmt.trace.clone());
        let out = walk_stmt(self, stmt);
        self.trace = saved;
        out
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, CompileError> {
        if let Expr::Var(var) = &expr
            && let Some(rep) = self.lookup(&var.ident.name)
            && !matches!(rep, Expr::Var(_))
        {
            return Ok(rep.clone());
        }
        walk_expr(self, expr)
    }

    fn fold_var_ref(&mut self, var: VarRef) -> Result<VarRef, CompileError> {
        match self.lookup(&var.ident.name) {
            None => walk_var_ref(self, var),
            Some(Expr::Var(rep)) => self.merge(var, rep),
            Some(_) => Err(CompileError::AssignTargetNotVariable {
                loc: self.lines.location_with_trace(var.span, &self.trace),
            }),
        }
    }

    fn fold_call(&mut self, mut call: FunctionCall) -> Result<FunctionCall, CompileError> {
        if let Some(rep) = self.lookup(&call.name.name) {
            let Expr::Var(rep) = rep else {
                return Err(CompileError::FunctionNameExpected {
                    parameter: first_part(&call.name.name).to_string(),
                    loc: self.lines.location_with_trace(call.span, &self.trace),
                });
            };
            let name = format!("{}{}", rep.ident.name, last_part(&call.name.name));
            call.name = Ident::new(None, name, call.name.span);
            call.name.qualified = true;
        }
        walk_call(self, call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksp_parser::ast::{BinaryOp, StmtKind};

    fn var(text: &str) -> VarRef {
        VarRef::new(Ident::parse(text, Span::new(1, 1, 1)))
    }

    fn subst(pairs: Vec<(&str, Expr)>) -> Substitutions {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn variable_argument_keeps_tail_and_subscripts() {
        let lines = LineMap::single(None);
        let map = subst(vec![("x", Expr::Var(var("%arr")))]);
        let mut s = ParamSubstituter::new(&lines, &map, None);

        let mut target = var("x");
        target.subscripts.push(Expr::int(2, Span::default()));
        let out = s.fold_var_ref(target).expect("substitutes");
        assert_eq!(out.ident.full(), "%arr");
        assert_eq!(out.subscripts.len(), 1);

        let dotted = s.fold_var_ref(var("x.level")).expect("substitutes");
        assert_eq!(dotted.ident.full(), "%arr.level");
    }

    #[test]
    fn expression_argument_replaces_whole_reference() {
        let lines = LineMap::single(None);
        let sum = Expr::binary(Expr::int(1, Span::default()), BinaryOp::Add, Expr::int(2, Span::default()));
        let map = subst(vec![("n", sum.clone())]);
        let mut s = ParamSubstituter::new(&lines, &map, None);
        assert_eq!(s.fold_expr(Expr::Var(var("n"))).expect("expr"), sum);

        let err = s.fold_var_ref(var("n")).unwrap_err();
        assert!(matches!(err, CompileError::AssignTargetNotVariable { .. }));
    }

    #[test]
    fn call_through_parameter_needs_a_name() {
        let lines = LineMap::single(None);
        let map = subst(vec![("f", Expr::Var(var("lib.reset"))), ("g", Expr::int(1, Span::default()))]);
        let mut s = ParamSubstituter::new(&lines, &map, None);

        let call = FunctionCall::new(Ident::parse("f", Span::default()), Vec::new(), true);
        assert_eq!(s.fold_call(call).expect("renamed").name.name, "lib.reset");

        let call = FunctionCall::new(Ident::parse("g", Span::default()), Vec::new(), true);
        assert!(matches!(s.fold_call(call), Err(CompileError::FunctionNameExpected { .. })));
    }

    #[test]
    fn call_site_is_appended_to_trace() {
        let lines = LineMap::single(None);
        let map = Substitutions::default();
        let site = Span::new(7, 3, 1);
        let mut s = ParamSubstituter::new(&lines, &map, Some(site));
        let stmt = Stmt::assign(var("$y"), Expr::int(1, Span::default()), Span::new(2, 1, 1));
        let out = s.fold_stmt(stmt).expect("folds");
        assert_eq!(out[0].trace, vec![site]);
        assert!(matches!(out[0].kind, StmtKind::Assign(_)));
    }
}
