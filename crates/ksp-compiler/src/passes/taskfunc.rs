//! Taskfunc Pass - Give every taskfunc body its stack frame.
//!
//! A taskfunc keeps its state in the `%p` array so that it survives a
//! `wait`. The frame, relative to the frame pointer:
//!
//! ```text
//! %p[$fp]                saved caller frame pointer
//! %p[$fp + 1 ..= L]      frame-local declarations
//! %p[$fp + L + 1 ..]     parameters, then the result
//! ```
//!
//! The caller has already written the inputs below `$sp`; the prologue
//! slides the frame over them and the epilogue pops it again. Parameters and
//! result are rewritten to their slots and removed from the signature.

use ksp_core::{CompileError, first_part};
use ksp_parser::Fold;
use ksp_parser::ast::{Assignment, BinaryOp, Expr, Module, Stmt, StmtKind};

use crate::context::CompilationContext;

use super::substitute::{ParamSubstituter, Substitutions};
use super::{FRAME_POINTER, STACK_POINTER, fixed_var, stack_slot};

pub struct TaskfuncPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
}

impl<'a, 'reg> TaskfuncPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self { ctx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        let lines = self.ctx.lines;

        for entry in self.ctx.functions.values_mut() {
            if !entry.def.is_taskfunc() {
                continue;
            }
            let span = entry.def.span;
            let locals = entry.frame_decls.len();

            let slots: Vec<String> = entry
                .def
                .params
                .iter()
                .map(|p| &p.name)
                .chain(entry.def.result.iter())
                .map(|ident| first_part(&ident.name).to_string())
                .collect();
            let frame = i32::try_from(slots.len() + locals + 1)
                .map_err(|_| CompileError::internal("taskfunc frame too large"))?;

            let first = frame - i32::try_from(slots.len()).unwrap_or(frame);
            let mut subst = Substitutions::default();
            for (offset, name) in (first..).zip(slots) {
                subst.insert(name, Expr::Var(stack_slot(FRAME_POINTER, BinaryOp::Add, offset, span)));
            }

            let body = std::mem::take(&mut entry.def.body);
            let body = ParamSubstituter::new(lines, &subst, None).fold_stmts(body)?;

            let fp = || Expr::Var(fixed_var(FRAME_POINTER, span));
            let sp = || Expr::Var(fixed_var(STACK_POINTER, span));
            let assign = |target: &str, value: Expr| {
                Stmt::new(
                    StmtKind::Assign(Assignment {
                        target: fixed_var(target, span),
                        value,
                    }),
                    span,
                )
            };
            let frame_base = || Expr::binary(sp(), BinaryOp::Sub, Expr::int(frame, span));

            let mut lowered = vec![
                Stmt::new(
                    StmtKind::Assign(Assignment {
                        target: stack_slot(STACK_POINTER, BinaryOp::Sub, frame, span),
                        value: fp(),
                    }),
                    span,
                ),
                assign(FRAME_POINTER, frame_base()),
                assign(STACK_POINTER, fp()),
            ];
            lowered.extend(body);
            lowered.push(assign(STACK_POINTER, fp()));
            lowered.push(assign(
                FRAME_POINTER,
                Expr::Var(stack_slot(FRAME_POINTER, BinaryOp::Add, 0, span)),
            ));
            lowered.push(assign(
                STACK_POINTER,
                Expr::binary(sp(), BinaryOp::Add, Expr::int(frame, span)),
            ));

            tracing::trace!(taskfunc = %entry.def.name.name, frame, "built taskfunc frame");
            entry.def.body = lowered;
            entry.def.params.clear();
            entry.def.result = None;
        }
        Ok(module)
    }
}
