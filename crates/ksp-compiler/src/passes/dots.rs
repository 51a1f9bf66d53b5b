//! Dots Pass - Replace `.` with `__` in every name.
//!
//! Namespaced and family names contain dots, which the engine does not
//! accept in identifiers. The symbol table is renamed along with the tree so
//! that compaction sees the final names.

use ksp_core::CompileError;
use ksp_parser::Fold;
use ksp_parser::ast::fold::walk_function;
use ksp_parser::ast::{FunctionDef, Ident, Module};

use crate::context::CompilationContext;

pub struct DotsPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
}

impl<'a, 'reg> DotsPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self { ctx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        let module = self.fold_module(module)?;
        self.ctx.symbols.rename_variables(undotted);
        Ok(module)
    }
}

pub(crate) fn undotted(name: &str) -> String {
    name.replace('.', "__")
}

impl Fold for DotsPass<'_, '_> {
    type Error = CompileError;

    fn fold_function(&mut self, mut function: FunctionDef) -> Result<FunctionDef, CompileError> {
        function.name = self.fold_ident(function.name)?;
        walk_function(self, function)
    }

    fn fold_ident(&mut self, mut ident: Ident) -> Result<Ident, CompileError> {
        if ident.name.contains('.') {
            ident.name = undotted(&ident.name);
        }
        Ok(ident)
    }
}
