//! Control Parameter Pass - Final shape checks on references and calls.
//!
//! ## Responsibilities
//!
//! - Reject references with more than one subscript
//! - Reject `get/set_event_par*` calls whose first argument is a call
//!   without a constant return value
//! - Wrap a UI variable passed as the control of `get/set_control_par*` in
//!   `get_ui_id(...)`, and likewise the value of a `..._PARENT_PANEL` setter

use std::mem;

use ksp_core::{CompileError, Span};
use ksp_parser::Fold;
use ksp_parser::ast::fold::{walk_call, walk_stmt, walk_var_ref};
use ksp_parser::ast::{Expr, FunctionCall, Module, Stmt, VarRef};

use crate::context::CompilationContext;

use super::fixed_ident;

pub struct ControlParPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
    trace: Vec<Span>,
}

impl<'a, 'reg> ControlParPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self { ctx, trace: Vec::new() }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        self.fold_module(module)
    }

    fn is_ui_var(&self, expr: &Expr) -> bool {
        expr.as_var()
            .is_some_and(|v| self.ctx.symbols.is_ui_variable(&v.ident.full()))
    }
}

fn ui_id(arg: Expr) -> Expr {
    let span = arg.span();
    let mut call = FunctionCall::new(fixed_ident("get_ui_id", span), vec![arg], false);
    call.span = span;
    Expr::call(call)
}

impl Fold for ControlParPass<'_, '_> {
    type Error = CompileError;

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, CompileError> {
        let saved = mem::replace(&mut self.trace, stmt.trace.clone());
        let out = walk_stmt(self, stmt);
        self.trace = saved;
        out
    }

    fn fold_var_ref(&mut self, var: VarRef) -> Result<VarRef, CompileError> {
        if var.subscripts.len() > 1 {
            return Err(CompileError::TooManySubscripts {
                name: var.ident.full(),
                loc: self.ctx.location(var.span, &self.trace),
            });
        }
        walk_var_ref(self, var)
    }

    fn fold_call(&mut self, call: FunctionCall) -> Result<FunctionCall, CompileError> {
        let mut call = walk_call(self, call)?;
        let name = call.name.name.as_str();
        if call.using_call || !self.ctx.builtins.is_function(name) {
            return Ok(call);
        }

        if (name.starts_with("set_event_par") || name.starts_with("get_event_par"))
            && let Some(Expr::Call(inner)) = call.args.first()
            && !self.ctx.builtins.has_constant_return(&inner.name.name)
        {
            return Err(CompileError::InvalidEventParArgument {
                function: inner.name.name.clone(),
                caller: call.name.name.clone(),
                loc: self.ctx.location(inner.span, &self.trace),
            });
        }

        let is_setter = name.starts_with("set_control_par");
        if (is_setter || name.starts_with("get_control_par"))
            && call.args.first().is_some_and(|a| self.is_ui_var(a))
        {
            if is_setter
                && call.args.len() > 2
                && call.args[1].as_var().is_some_and(|v| v.ident.name.ends_with("PARENT_PANEL"))
                && self.is_ui_var(&call.args[2])
            {
                let panel = call.args.remove(2);
                call.args.insert(2, ui_id(panel));
            }
            let control = call.args.remove(0);
            call.args.insert(0, ui_id(control));
        }
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emitter;
    use crate::options::CompileOptions;
    use crate::passes::{LowerPass, SigilPass};
    use ksp_parser::{LineMap, Parser};
    use ksp_registry::Builtins;

    fn check(source: &str) -> Result<String, CompileError> {
        let builtins = Builtins::standard();
        let lines = LineMap::single(None);
        let options = CompileOptions::default();
        let mut ctx = CompilationContext::new(&builtins, &lines);
        let module = Parser::parse(source, &lines).expect("parse");
        let module = LowerPass::new(&mut ctx).run(module)?;
        let module = SigilPass::new(&mut ctx).run(module)?;
        let module = ControlParPass::new(&mut ctx).run(module)?;
        let init = module.callbacks().next().expect("init");
        Ok(Emitter::new(&builtins, &options).emit_stmts(&init.body))
    }

    #[test]
    fn ui_control_is_wrapped() {
        let out = check(
            "on init\n  declare ui_knob knob(0, 100, 1)\n  declare ui_panel panel\n  \
             set_control_par(knob, $CONTROL_PAR_WIDTH, 40)\n  \
             set_control_par(knob, $CONTROL_PAR_PARENT_PANEL, panel)\nend on",
        )
        .expect("checks");
        assert!(
            out.contains("set_control_par(get_ui_id($knob), $CONTROL_PAR_WIDTH, 40)"),
            "{out}"
        );
        assert!(
            out.contains("set_control_par(get_ui_id($knob), $CONTROL_PAR_PARENT_PANEL, get_ui_id($panel))"),
            "{out}"
        );
    }

    #[test]
    fn plain_ids_are_left_alone() {
        let out = check("on init\n  declare $id\n  set_control_par(id, $CONTROL_PAR_WIDTH, 40)\nend on")
            .expect("checks");
        assert!(out.contains("set_control_par($id, $CONTROL_PAR_WIDTH, 40)"), "{out}");
    }

    #[test]
    fn event_par_needs_constant_return() {
        let err = check(
            "on init\n  declare $v\n  v := get_event_par(random(1, 2), $EVENT_PAR_NOTE)\nend on",
        )
        .unwrap_err();
        assert!(matches!(&err, CompileError::InvalidEventParArgument { function, .. } if function == "random"));
    }

    #[test]
    fn one_subscript_at_most() {
        let builtins = Builtins::standard();
        let lines = LineMap::single(None);
        let mut ctx = CompilationContext::new(&builtins, &lines);
        let mut pass = ControlParPass::new(&mut ctx);
        let mut var = VarRef::new(fixed_ident("%a", Span::default()));
        var.subscripts = vec![Expr::int(1, Span::default()), Expr::int(2, Span::default())];
        assert!(matches!(pass.fold_var_ref(var), Err(CompileError::TooManySubscripts { .. })));
    }
}
