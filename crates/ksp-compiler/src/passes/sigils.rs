//! Sigil Pass - Give every variable reference its type sigil.
//!
//! A reference written without a sigil is matched against the declared and
//! built-in variables under every sigil. Exactly one match binds it; none is
//! an undeclared name, several are an ambiguous type. A subscripted
//! reference only considers array sigils.
//!
//! Function names, families, properties and the current function's
//! parameters are left alone. Declarations in a taskfunc frame are never
//! emitted, so they are skipped.
//!
//! The pass runs twice: once over the lowered callbacks and function table,
//! and again over the ordered module, where function bodies are blocks.

use std::mem;

use ksp_core::{CompileError, Sigil, Span, first_part};
use ksp_parser::Fold;
use ksp_parser::ast::fold::{fold_exprs, walk_function, walk_stmt};
use ksp_parser::ast::{Declaration, FunctionCall, FunctionDef, Ident, Initializer, Module, Stmt, VarRef};

use crate::context::CompilationContext;

pub struct SigilPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
    params: Vec<String>,
    trace: Vec<Span>,
}

impl<'a, 'reg> SigilPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self {
            ctx,
            params: Vec::new(),
            trace: Vec::new(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        let module = self.fold_module(module)?;

        for index in 0..self.ctx.functions.len() {
            let Some((_, entry)) = self.ctx.functions.get_index_mut(index) else {
                return Err(CompileError::internal("function table changed during sigil resolution"));
            };
            let params = entry.def.param_names();
            let body = mem::take(&mut entry.def.body);
            let globals = mem::take(&mut entry.global_decls);
            let locals = mem::take(&mut entry.local_decls);

            self.params = params;
            let body = self.fold_stmts(body)?;
            let globals = self.fold_stmts(globals)?;
            let locals = self.fold_stmts(locals)?;
            self.params.clear();

            let Some((_, entry)) = self.ctx.functions.get_index_mut(index) else {
                return Err(CompileError::internal("function table changed during sigil resolution"));
            };
            entry.def.body = body;
            entry.global_decls = globals;
            entry.local_decls = locals;
        }
        Ok(module)
    }

    fn is_param(&self, name: &str) -> bool {
        let head = first_part(name);
        self.params.iter().any(|p| p == head)
    }

    fn is_declared(&self, full: &str) -> bool {
        self.ctx.symbols.has_variable(full) || self.ctx.builtins.is_builtin(full)
    }

    /// Names that are not variables and never take a sigil.
    fn is_sigil_free(&self, name: &str) -> bool {
        self.ctx.is_user_function(name)
            || self.ctx.builtins.is_function(name)
            || self.ctx.symbols.is_family(name)
            || self.ctx.symbols.is_property(name)
            || self.is_param(name)
    }

    fn resolve(&self, mut ident: Ident, subscripted: bool) -> Result<Ident, CompileError> {
        let loc = || self.ctx.location(ident.span, &self.trace);

        match ident.sigil {
            None => {
                if self.is_sigil_free(&ident.name) {
                    return Ok(ident);
                }
                let candidates: Vec<Sigil> = Sigil::ALL
                    .into_iter()
                    .filter(|s| !subscripted || s.is_array())
                    .filter(|s| self.is_declared(&format!("{s}{}", ident.name)))
                    .collect();
                match candidates.as_slice() {
                    [] => Err(CompileError::UndeclaredName {
                        name: ident.full(),
                        loc: loc(),
                    }),
                    [sigil] => {
                        ident.sigil = Some(*sigil);
                        Ok(ident)
                    }
                    _ => Err(CompileError::AmbiguousType {
                        name: ident.name.clone(),
                        candidates: candidates
                            .iter()
                            .map(|s| format!("{s}{}", ident.name))
                            .collect::<Vec<_>>()
                            .join(", "),
                        loc: loc(),
                    }),
                }
            }
            Some(used) => {
                let full = ident.full();
                if self.is_declared(&full) || self.is_param(&full) {
                    return Ok(ident);
                }
                let declared = Sigil::ALL
                    .into_iter()
                    .find(|s| *s != used && self.ctx.symbols.has_variable(&format!("{s}{}", ident.name)));
                match declared {
                    Some(declared) => Err(CompileError::SigilConflict {
                        name: ident.name.clone(),
                        declared,
                        used,
                        loc: loc(),
                    }),
                    None => Err(CompileError::UndeclaredName { name: full, loc: loc() }),
                }
            }
        }
    }
}

impl Fold for SigilPass<'_, '_> {
    type Error = CompileError;

    fn fold_function(&mut self, function: FunctionDef) -> Result<FunctionDef, CompileError> {
        let saved = mem::replace(&mut self.params, function.param_names());
        let function = walk_function(self, function);
        self.params = saved;
        function
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, CompileError> {
        let saved = mem::replace(&mut self.trace, stmt.trace.clone());
        let out = walk_stmt(self, stmt);
        self.trace = saved;
        out
    }

    fn fold_declaration(&mut self, decl: Declaration) -> Result<Declaration, CompileError> {
        Ok(Declaration {
            size: decl.size.map(|s| self.fold_expr(s)).transpose()?,
            params: fold_exprs(self, decl.params)?,
            init: match decl.init {
                Some(Initializer::Single(e)) => Some(Initializer::Single(self.fold_expr(e)?)),
                Some(Initializer::List(values)) => Some(Initializer::List(fold_exprs(self, values)?)),
                None => None,
            },
            ..decl
        })
    }

    fn fold_var_ref(&mut self, var: VarRef) -> Result<VarRef, CompileError> {
        let subscripts = fold_exprs(self, var.subscripts)?;
        let ident = self.resolve(var.ident, !subscripts.is_empty())?;
        Ok(VarRef {
            ident,
            subscripts,
            span: var.span,
        })
    }

    fn fold_call(&mut self, mut call: FunctionCall) -> Result<FunctionCall, CompileError> {
        let raw = usize::from(self.ctx.builtins.keeps_first_argument(&call.name.name) && !call.args.is_empty());
        let rest = call.args.split_off(raw);
        call.args.extend(fold_exprs(self, rest)?);
        Ok(call)
    }

    fn fold_ident(&mut self, ident: Ident) -> Result<Ident, CompileError> {
        self.resolve(ident, false)
    }
}
