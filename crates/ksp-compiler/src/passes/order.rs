//! Order Pass - Decide which functions are emitted, and where.
//!
//! ## Responsibilities
//!
//! - Mark every function reachable from a callback as used
//! - Reject any cycle in the call graph
//! - Emit the explicitly called, used functions callees first, between the
//!   init callback and the remaining callbacks
//! - Hoist the declarations collected in function bodies into init
//!
//! Functions that were only ever inlined are not emitted.

use std::mem;

use ksp_core::CompileError;
use ksp_parser::ast::{Block, Module, Stmt};

use crate::context::CompilationContext;

pub struct OrderPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
}

impl<'a, 'reg> OrderPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self { ctx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        for name in self.ctx.call_graph.reachable_from_root() {
            if let Some(entry) = self.ctx.function_mut(&name) {
                entry.used = true;
            }
        }

        if let Some(cycle) = self.ctx.call_graph.find_cycle() {
            return Err(CompileError::RecursionDetected {
                cycle: cycle.join("->"),
            });
        }

        let mut order = self.ctx.call_graph.topological_order();
        order.reverse();
        order.retain(|name| {
            self.ctx.call_graph.is_explicit(name) && self.ctx.function(name).is_some_and(|f| f.used)
        });

        let mut callbacks = module.blocks.into_iter();
        let Some(Block::Callback(mut init)) = callbacks.next() else {
            return Err(CompileError::internal("module does not start with the init callback"));
        };

        // Each used function wraps init in its declarations: globals before,
        // locals after. Walking the table backwards leaves the first
        // function outermost.
        for entry in self.ctx.functions.values_mut().rev().filter(|f| f.used) {
            let mut body: Vec<Stmt> = mem::take(&mut entry.global_decls);
            body.append(&mut init.body);
            body.append(&mut entry.local_decls);
            init.body = body;
        }

        let mut blocks = Vec::with_capacity(order.len() + callbacks.len() + 1);
        blocks.push(Block::Callback(init));
        for name in &order {
            if let Some(entry) = self.ctx.function(name) {
                blocks.push(Block::Function(entry.def.clone()));
            }
        }
        blocks.extend(callbacks);

        tracing::debug!(emitted = order.len(), "ordered functions");
        Ok(Module { blocks })
    }
}
