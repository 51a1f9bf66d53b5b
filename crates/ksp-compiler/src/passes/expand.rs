//! Expansion Pass - Inline user functions and lower property access.
//!
//! After this pass no call to an ordinary user function is left in a
//! callback: every call site is replaced with a copy of the callee's body,
//! parameters substituted by the arguments. What remains are built-in calls,
//! `call <name>` statements and the marshalled calls of taskfuncs.
//!
//! ## Responsibilities
//!
//! - Rewrite `prop := v` into a setter call and a read of `prop` into a
//!   getter call
//! - Inline calls in statement, assignment and expression position
//! - Check every call against the callee's shape (arity, result, taskfunc,
//!   `call` rules) and reject recursion
//! - Marshal taskfunc arguments through the `%p` stack around `call`
//! - Record call-graph edges, reachability from callbacks and `wait` users
//!
//! ## Call Sites
//!
//! ```text
//! f(a)             statement    body of f, params replaced
//! x := f(a)        assignment   body of f, result replaced by x
//! y := f(a) + 1    expression   body must be a single `result := e`; yields e
//! call f           statement    kept, f is emitted as a subroutine
//! x := t(a)        taskfunc     %p[$sp - n] := a ... call t ... x := %p[$sp - 1]
//! ```
//!
//! Parameterless functions and taskfuncs are bodies of their own: they are
//! expanded in place, in table order, so that `call` can reach them.

use std::mem;

use ksp_core::{CompileError, Location, Span, first_part};
use ksp_parser::Fold;
use ksp_parser::ast::fold::{fold_exprs, walk_expr, walk_stmt};
use ksp_parser::ast::{
    Assignment, BinaryOp, Block, Callback, Expr, FunctionCall, FunctionDef, Module, Param, ParamKind, Stmt,
    StmtKind, VarRef,
};

use crate::context::CompilationContext;

use super::substitute::{ParamSubstituter, Substitutions};
use super::{STACK_POINTER, fixed_ident, stack_slot};

/// The block whose body is being expanded.
#[derive(Debug, Clone, PartialEq)]
enum Top {
    Callback { is_init: bool },
    Function(String),
}

/// Where a call appears.
enum Site {
    Statement,
    Assign(VarRef),
    Expression,
}

impl Site {
    fn is_statement(&self) -> bool {
        matches!(self, Site::Statement)
    }
}

enum Expanded {
    Stmts(Vec<Stmt>),
    Expr(Expr),
}

impl Expanded {
    fn into_stmts(self) -> Result<Vec<Stmt>, CompileError> {
        match self {
            Expanded::Stmts(stmts) => Ok(stmts),
            Expanded::Expr(_) => Err(CompileError::internal("statement call expanded to an expression")),
        }
    }

    fn into_expr(self) -> Result<Expr, CompileError> {
        match self {
            Expanded::Expr(expr) => Ok(expr),
            Expanded::Stmts(_) => Err(CompileError::internal("expression call expanded to statements")),
        }
    }
}

/// What the checks need to know about a callee.
struct Callee {
    params: Vec<Param>,
    has_result: bool,
    is_taskfunc: bool,
}

pub struct ExpandPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
    top: Top,
    /// Functions being inlined, outermost first.
    stack: Vec<String>,
    trace: Vec<Span>,
}

impl<'a, 'reg> ExpandPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self {
            ctx,
            top: Top::Callback { is_init: true },
            stack: Vec::new(),
            trace: Vec::new(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        let mut blocks = module.blocks.into_iter();
        let mut out = Vec::new();

        // Init first, so that the declarations of functions it inlines are
        // hoisted into it rather than left for the function table.
        if let Some(block) = blocks.next() {
            out.push(self.expand_block(block)?);
        }

        let mut expanded = Vec::new();
        for index in 0..self.ctx.functions.len() {
            let Some((name, entry)) = self.ctx.functions.get_index(index) else {
                return Err(CompileError::internal("function table changed during expansion"));
            };
            if !is_standalone(&entry.def) {
                continue;
            }
            let name = name.clone();
            let body = entry.def.body.clone();
            self.top = Top::Function(name.clone());
            self.stack = vec![name];
            expanded.push((index, self.fold_stmts(body)?));
        }
        self.stack.clear();

        for block in blocks {
            out.push(self.expand_block(block)?);
        }

        for (index, body) in expanded {
            if let Some((_, entry)) = self.ctx.functions.get_index_mut(index) {
                entry.def.body = body;
            }
        }

        tracing::debug!(
            functions = self.ctx.functions.len(),
            explicit = self.ctx.functions.keys().filter(|n| self.ctx.call_graph.is_explicit(n)).count(),
            "expanded function calls"
        );
        Ok(Module { blocks: out })
    }

    fn expand_block(&mut self, block: Block) -> Result<Block, CompileError> {
        match block {
            Block::Callback(callback) => {
                self.top = Top::Callback {
                    is_init: callback.is_init(),
                };
                self.stack.clear();
                Ok(Block::Callback(self.fold_callback(callback)?))
            }
            Block::Function(def) => Err(CompileError::internal(format!(
                "function {} left in the module after lowering",
                def.name.name
            ))),
        }
    }

    fn location(&self, span: Span) -> Location {
        self.ctx.location(span, &self.trace)
    }

    fn stmt(&self, kind: StmtKind, span: Span) -> Stmt {
        Stmt {
            kind,
            span,
            trace: self.trace.clone(),
        }
    }

    fn in_init(&self) -> bool {
        matches!(self.top, Top::Callback { is_init: true })
    }

    fn is_property_ref(&self, var: &VarRef) -> bool {
        var.ident.sigil.is_none() && self.ctx.symbols.is_property(&var.ident.name)
    }

    /// A bare name of a user function used as a value: a call without parentheses.
    fn names_function(&self, var: &VarRef) -> bool {
        var.ident.sigil.is_none() && var.subscripts.is_empty() && self.ctx.is_user_function(&var.ident.name)
    }

    fn getter_call(&self, var: VarRef) -> Result<FunctionCall, CompileError> {
        let getter = format!("{}.get", var.ident.name);
        if !self.ctx.is_user_function(&getter) {
            return Err(CompileError::PropertyNotReadable {
                property: var.ident.name,
                loc: self.location(var.span),
            });
        }
        let mut call = FunctionCall::new(fixed_ident(&getter, var.ident.span), var.subscripts, false);
        call.span = var.span;
        Ok(call)
    }

    fn expand_assign(&mut self, assign: Assignment, span: Span, trace: Vec<Span>) -> Result<Vec<Stmt>, CompileError> {
        let Assignment { target, value } = assign;

        if self.is_property_ref(&target) {
            let setter = format!("{}.set", target.ident.name);
            if !self.ctx.is_user_function(&setter) {
                return Err(CompileError::PropertyReadOnly {
                    property: target.ident.name,
                    loc: self.location(target.span),
                });
            }
            let mut args = target.subscripts;
            args.push(value);
            let mut call = FunctionCall::new(fixed_ident(&setter, target.ident.span), args, true);
            call.span = span;
            return self.expand_call(call, Site::Statement)?.into_stmts();
        }

        let value = match value {
            Expr::Var(var) if self.is_property_ref(&var) => Expr::call(self.getter_call(var)?),
            Expr::Var(var) if self.names_function(&var) => Expr::call(FunctionCall::new(var.ident, Vec::new(), false)),
            value => value,
        };

        match value {
            Expr::Call(call) if call.using_call || !self.ctx.is_builtin_call(&call.name.name) => {
                let target = self.fold_var_ref(target)?;
                self.expand_call(*call, Site::Assign(target))?.into_stmts()
            }
            value => walk_stmt(
                self,
                Stmt {
                    kind: StmtKind::Assign(Assignment { target, value }),
                    span,
                    trace,
                },
            ),
        }
    }

    /// Fold the arguments of a built-in call; a raw first argument stays as written.
    fn fold_builtin_args(&mut self, mut call: FunctionCall) -> Result<FunctionCall, CompileError> {
        let raw = usize::from(self.ctx.builtins.keeps_first_argument(&call.name.name) && !call.args.is_empty());
        let rest = call.args.split_off(raw);
        call.args.extend(fold_exprs(self, rest)?);
        Ok(call)
    }

    fn expand_call(&mut self, call: FunctionCall, site: Site) -> Result<Expanded, CompileError> {
        let name = call.name.name.clone();

        if !call.using_call && self.ctx.is_builtin_call(&name) {
            if name == "wait"
                && let Top::Function(top) = &self.top
            {
                self.ctx.functions_invoking_wait.insert(top.clone());
            }
            let call = self.fold_builtin_args(call)?;
            return Ok(match site {
                Site::Statement => Expanded::Stmts(vec![self.stmt(StmtKind::Call(call.clone()), call.span)]),
                Site::Assign(target) => {
                    let span = call.span;
                    Expanded::Stmts(vec![self.stmt(
                        StmtKind::Assign(Assignment {
                            target,
                            value: Expr::call(call),
                        }),
                        span,
                    )])
                }
                Site::Expression => Expanded::Expr(Expr::call(call)),
            });
        }

        let Some(entry) = self.ctx.function(&name) else {
            return Err(CompileError::UnknownFunction {
                name,
                loc: self.location(call.span),
            });
        };
        let callee = Callee {
            params: entry.def.params.clone(),
            has_result: entry.def.result.is_some(),
            is_taskfunc: entry.def.is_taskfunc(),
        };

        let caller = match &self.top {
            Top::Function(top) => Some(top.as_str()),
            Top::Callback { .. } => None,
        };
        self.ctx.call_graph.add_call(caller, &name);
        if call.using_call {
            self.ctx.call_graph.mark_explicit(&name);
        }

        self.check_call(&call, &callee, &site)?;

        if matches!(self.top, Top::Callback { .. })
            && let Some(entry) = self.ctx.function_mut(&name)
        {
            entry.used = true;
        }

        if callee.is_taskfunc {
            return self.expand_taskfunc_call(call, site, &callee);
        }
        if call.using_call {
            let span = call.span;
            return Ok(Expanded::Stmts(vec![self.stmt(StmtKind::Call(call), span)]));
        }
        self.inline(call, site)
    }

    fn check_call(&self, call: &FunctionCall, callee: &Callee, site: &Site) -> Result<(), CompileError> {
        let function = call.name.name.clone();
        let loc = || self.location(call.span);

        if self.stack.contains(&function) {
            let chain = self
                .stack
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(function.as_str()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(CompileError::RecursiveCall { chain, loc: loc() });
        }
        if call.args.len() != callee.params.len() {
            return Err(CompileError::ArgumentCountMismatch {
                function,
                expected: callee.params.len(),
                got: call.args.len(),
                loc: loc(),
            });
        }
        if !site.is_statement() && !callee.has_result {
            return Err(CompileError::NoReturnValue { function, loc: loc() });
        }
        if callee.is_taskfunc && matches!(site, Site::Expression) {
            return Err(CompileError::TaskfuncInExpression { function, loc: loc() });
        }
        if self.in_init() && (call.using_call || callee.is_taskfunc) {
            return Err(CompileError::CallInInit { function, loc: loc() });
        }
        if call.using_call && !callee.is_taskfunc {
            if !call.args.is_empty() {
                return Err(CompileError::CallWithParameters { function, loc: loc() });
            }
            if !site.is_statement() {
                return Err(CompileError::CallInExpression { function, loc: loc() });
            }
        }
        Ok(())
    }

    /// `%p[$sp - n] := arg` for inputs, `call t`, then `arg := %p[$sp - n]` for outputs.
    fn expand_taskfunc_call(&mut self, mut call: FunctionCall, site: Site, callee: &Callee) -> Result<Expanded, CompileError> {
        let span = call.span;
        let captured = match site {
            Site::Statement => None,
            Site::Assign(target) => Some(target),
            Site::Expression => return Err(CompileError::internal("taskfunc call in expression position")),
        };

        let mut args: Vec<(Expr, ParamKind)> = mem::take(&mut call.args)
            .into_iter()
            .zip(callee.params.iter().map(|p| p.kind))
            .collect();
        let returns_unused = callee.has_result && captured.is_none();
        if let Some(target) = captured {
            args.push((Expr::Var(target), ParamKind::Out));
        }
        let count = args.len() + usize::from(returns_unused);

        let mut prologue = Vec::new();
        let mut epilogue = Vec::new();
        for (i, (arg, kind)) in args.into_iter().enumerate() {
            let offset = i32::try_from(count - i)
                .map_err(|_| CompileError::internal("taskfunc frame offset out of range"))?;
            let slot = stack_slot(STACK_POINTER, BinaryOp::Sub, offset, span);
            if kind.copies_in() {
                prologue.push(self.stmt(
                    StmtKind::Assign(Assignment {
                        target: slot.clone(),
                        value: arg.clone(),
                    }),
                    span,
                ));
            }
            if kind.copies_out()
                && let Expr::Var(var) = arg
            {
                epilogue.push(self.stmt(
                    StmtKind::Assign(Assignment {
                        target: var,
                        value: Expr::Var(slot),
                    }),
                    span,
                ));
            }
        }

        call.using_call = true;
        call.is_procedure = true;
        self.ctx.call_graph.mark_explicit(&call.name.name);

        // Calls on the right-hand side are expanded as expressions only.
        let mut out = Vec::new();
        for stmt in prologue {
            out.extend(walk_stmt(self, stmt)?);
        }
        out.push(self.stmt(StmtKind::Call(call), span));
        for stmt in epilogue {
            out.extend(walk_stmt(self, stmt)?);
        }
        Ok(Expanded::Stmts(out))
    }

    fn inline(&mut self, call: FunctionCall, site: Site) -> Result<Expanded, CompileError> {
        let name = call.name.name.clone();
        let in_init = self.in_init();

        let Some(entry) = self.ctx.function_mut(&name) else {
            return Err(CompileError::internal(format!("function {name} vanished during expansion")));
        };
        let mut hoisted = Vec::new();
        if in_init {
            hoisted.append(&mut entry.global_decls);
            hoisted.append(&mut entry.local_decls);
        }
        let def = entry.def.clone();

        let mut out = self.fold_stmts(hoisted)?;

        // Nested calls in arguments are expanded here, in the caller's
        // context. Plain references stay raw: they may be assignment targets
        // or function names.
        let mut subst = Substitutions::default();
        for (param, arg) in def.params.iter().zip(call.args) {
            let arg = match arg {
                Expr::Var(_) => arg,
                arg => self.fold_expr(arg)?,
            };
            subst.insert(first_part(&param.name.name).to_string(), arg);
        }
        let result_key = def.result.as_ref().map(|r| first_part(&r.name).to_string());
        if let (Site::Assign(target), Some(key)) = (&site, &result_key) {
            subst.insert(key.clone(), Expr::Var(target.clone()));
        }

        let body = ParamSubstituter::new(self.ctx.lines, &subst, Some(call.span)).fold_stmts(def.body)?;
        self.stack.push(name.clone());
        let body = self.fold_stmts(body);
        self.stack.pop();
        out.extend(body?);

        match site {
            Site::Expression => {
                let mut out = out.into_iter();
                match (out.next(), out.next()) {
                    (
                        Some(Stmt {
                            kind: StmtKind::Assign(assign),
                            ..
                        }),
                        None,
                    ) if assign.target.subscripts.is_empty()
                        && result_key.as_deref() == Some(first_part(&assign.target.ident.name)) =>
                    {
                        Ok(Expanded::Expr(assign.value))
                    }
                    _ => Err(CompileError::NotSingleAssignment {
                        function: name,
                        loc: self.location(call.span),
                    }),
                }
            }
            _ => Ok(Expanded::Stmts(out)),
        }
    }
}

/// Functions expanded as bodies of their own: taskfuncs, and functions
/// without parameters and result.
fn is_standalone(def: &FunctionDef) -> bool {
    def.is_taskfunc() || (def.params.is_empty() && def.result.is_none())
}

impl Fold for ExpandPass<'_, '_> {
    type Error = CompileError;

    fn fold_callback(&mut self, mut callback: Callback) -> Result<Callback, CompileError> {
        callback.body = self.fold_stmts(callback.body)?;
        Ok(callback)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, CompileError> {
        let saved = mem::replace(&mut self.trace, stmt.trace.clone());
        let Stmt { kind, span, trace } = stmt;
        let out = match kind {
            StmtKind::Call(call) => self.expand_call(call, Site::Statement).and_then(Expanded::into_stmts),
            StmtKind::Assign(assign) => self.expand_assign(assign, span, trace),
            kind => walk_stmt(self, Stmt { kind, span, trace }),
        };
        self.trace = saved;
        out
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, CompileError> {
        match expr {
            Expr::Var(var) if self.is_property_ref(&var) => {
                let call = self.getter_call(var)?;
                self.expand_call(call, Site::Expression)?.into_expr()
            }
            Expr::Var(var) if self.names_function(&var) => {
                let call = FunctionCall::new(var.ident, Vec::new(), false);
                self.expand_call(call, Site::Expression)?.into_expr()
            }
            Expr::Call(call) => self.expand_call(*call, Site::Expression)?.into_expr(),
            expr => walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emitter;
    use crate::options::CompileOptions;
    use crate::passes::{LowerPass, SigilPass};
    use ksp_core::ErrorCategory;
    use ksp_parser::{LineMap, Parser};
    use ksp_registry::Builtins;

    struct Output {
        callbacks: Vec<String>,
        functions: Vec<(String, String)>,
        explicit: Vec<String>,
        used: Vec<String>,
        waits: Vec<String>,
    }

    fn expand(source: &str) -> Result<Output, CompileError> {
        let builtins = Builtins::standard();
        let lines = LineMap::single(None);
        let options = CompileOptions::default();
        let mut ctx = CompilationContext::new(&builtins, &lines);
        let module = Parser::parse(source, &lines).expect("parse");
        let module = LowerPass::new(&mut ctx).run(module)?;
        let module = SigilPass::new(&mut ctx).run(module)?;
        let module = ExpandPass::new(&mut ctx).run(module)?;

        let render = |stmts: &[Stmt]| Emitter::new(&builtins, &options).emit_stmts(stmts);
        let mut waits: Vec<String> = ctx.functions_invoking_wait.iter().cloned().collect();
        waits.sort();
        Ok(Output {
            callbacks: module.callbacks().map(|cb| render(&cb.body)).collect(),
            functions: ctx
                .functions
                .iter()
                .map(|(name, f)| (name.clone(), render(&f.def.body)))
                .collect(),
            explicit: ctx
                .functions
                .keys()
                .filter(|n| ctx.call_graph.is_explicit(n))
                .cloned()
                .collect(),
            used: ctx.functions.iter().filter(|(_, f)| f.used).map(|(n, _)| n.clone()).collect(),
            waits,
        })
    }

    fn error(source: &str) -> CompileError {
        match expand(source) {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        }
    }

    #[test]
    fn assignment_site_replaces_result() {
        let out = expand(
            "on init\n  declare $x\n  x := add(1, 2)\nend on\n\
             function add(a, b) -> r\n  r := a + b\nend function",
        )
        .expect("expands");
        assert!(out.callbacks[0].contains("$x := 1+2\n"), "{}", out.callbacks[0]);
        assert_eq!(out.used, vec!["add"]);
    }

    #[test]
    fn expression_site_yields_the_result_expression() {
        let out = expand(
            "on init\n  declare $x\n  x := add(1, 2) * 3\nend on\n\
             function add(a, b) -> r\n  r := a + b\nend function",
        )
        .expect("expands");
        assert!(out.callbacks[0].contains("$x := (1+2)*3\n"), "{}", out.callbacks[0]);
    }

    #[test]
    fn nested_calls_in_arguments() {
        let out = expand(
            "on init\n  declare $x\n  x := twice(twice(3))\nend on\n\
             function twice(v) -> r\n  r := v * 2\nend function",
        )
        .expect("expands");
        assert!(out.callbacks[0].contains("$x := 3*2*2\n"), "{}", out.callbacks[0]);
    }

    #[test]
    fn variable_argument_is_written_through() {
        let out = expand(
            "on init\n  declare $n\n  bump(n)\nend on\n\
             function bump(v)\n  v := v + 1\nend function",
        )
        .expect("expands");
        assert!(out.callbacks[0].contains("$n := $n+1\n"), "{}", out.callbacks[0]);
    }

    #[test]
    fn multi_line_body_in_expression() {
        let err = error(
            "on init\n  declare $x\n  x := 1 + pick(2)\nend on\n\
             function pick(v) -> r\n  r := v\n  r := r + 1\nend function",
        );
        assert!(matches!(&err, CompileError::NotSingleAssignment { function, .. } if function == "pick"));
        assert_eq!(err.category(), ErrorCategory::Contract);
    }

    #[test]
    fn property_access_goes_through_accessors() {
        let out = expand(
            "on init\n  declare $store\n  declare $y\n  \
             property level\n    function get() -> r\n      r := store\n    end function\n    \
             function set(v)\n      store := v\n    end function\n  end property\n  \
             level := 5\n  y := level\nend on",
        )
        .expect("expands");
        let init = &out.callbacks[0];
        assert!(init.contains("$store := 5\n"), "{init}");
        assert!(init.contains("$y := $store\n"), "{init}");
    }

    #[test]
    fn read_only_property() {
        let err = error(
            "on init\n  declare $store\n  \
             property level\n    function get() -> r\n      r := store\n    end function\n  end property\n  \
             level := 5\nend on",
        );
        assert!(matches!(err, CompileError::PropertyReadOnly { .. }));
    }

    #[test]
    fn recursion_through_inlining() {
        let err = error(
            "on note\n  a\nend on\n\
             function a\n  b\nend function\n\
             function b\n  a\nend function",
        );
        assert!(matches!(&err, CompileError::RecursiveCall { chain, .. } if chain == "a -> b -> a"));
    }

    #[test]
    fn call_shape_errors() {
        let unknown = error("on note\n  missing(1)\nend on");
        assert!(matches!(unknown, CompileError::UnknownFunction { .. }));

        let arity = error("on note\n  f(1, 2)\nend on\nfunction f(a)\nend function");
        assert!(matches!(arity, CompileError::ArgumentCountMismatch { expected: 1, got: 2, .. }));

        let no_result = error("on init\n  declare $x\n  x := f(1)\nend on\nfunction f(a)\nend function");
        assert!(matches!(no_result, CompileError::NoReturnValue { .. }));

        let in_init = error("on init\n  call f\nend on\nfunction f\nend function");
        assert!(matches!(in_init, CompileError::CallInInit { .. }));

        let with_params = error("on note\n  call f(1)\nend on\nfunction f(a)\nend function");
        assert!(matches!(with_params, CompileError::CallWithParameters { .. }));
    }

    #[test]
    fn explicit_call_is_kept() {
        let out = expand(
            "on init\n  declare $x\nend on\n\
             on note\n  call reset\nend on\n\
             function reset\n  x := 0\nend function",
        )
        .expect("expands");
        assert_eq!(out.callbacks[1], "call reset\n");
        assert_eq!(out.explicit, vec!["reset"]);
        assert_eq!(out.functions[0].1, "$x := 0\n");
    }

    #[test]
    fn taskfunc_arguments_travel_on_the_stack() {
        let out = expand(
            "on init\n  declare %p[32]\n  declare $sp\n  declare $fp\n  declare $x\n  declare $y\nend on\n\
             on note\n  x := work(1, y)\nend on\n\
             taskfunc work(a, out b) -> r\n  b := a\n  r := a\n  wait(10)\nend taskfunc",
        )
        .expect("expands");
        assert_eq!(
            out.callbacks[1],
            "%p[$sp-3] := 1\ncall work\n$y := %p[$sp-2]\n$x := %p[$sp-1]\n"
        );
        assert_eq!(out.explicit, vec!["work"]);
        assert_eq!(out.waits, vec!["work"]);
    }

    #[test]
    fn taskfunc_in_expression() {
        let err = error(
            "on init\n  declare $x\nend on\n\
             on note\n  x := 1 + work()\nend on\n\
             taskfunc work -> r\n  r := 1\nend taskfunc",
        );
        assert!(matches!(err, CompileError::TaskfuncInExpression { .. }));
    }

    #[test]
    fn init_receives_hoisted_declarations() {
        let out = expand(
            "on init\n  setup\nend on\n\
             function setup\n  declare count := 4\n  count := count + 1\nend function",
        )
        .expect("expands");
        let init = &out.callbacks[0];
        assert!(init.starts_with("declare $_count\n"), "{init}");
        assert!(init.contains("$_count := 4\n$_count := $_count+1\n"), "{init}");
    }
}
