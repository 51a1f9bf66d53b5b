//! Lowering Pass - Resolve names and flatten source-level constructs.
//!
//! This pass walks every block once. Function definitions are lifted out of
//! the module into [`CompilationContext::functions`]; callbacks stay, with
//! the init callback moved to the front.
//!
//! ## Responsibilities
//!
//! - Qualify every identifier with the namespace chain of its line
//! - Give every declaration a sigil, inferred from its shape when omitted
//! - Register global variables, families, properties and functions
//! - Rewrite properties into `<name>.get` / `<name>.set` accessor functions
//! - Flatten families into their parent body, prefixing declared names
//! - Lower `for` loops to `while` and `else if` chains to nested `if`
//! - Bucket function-local declarations: promoted to global, renamed local,
//!   or a taskfunc frame slot
//!
//! ## Local Declarations
//!
//! ```text
//! function on_init_lib      declare x   → global, name kept
//! function f                declare x   → $_x (or $_x2, $_x3, ...)
//! taskfunc t                declare x   → %p[$fp + n]
//! taskfunc t                declare local x → $_x
//! ```

use std::mem;

use ksp_core::{CompileError, Sigil, Span};
use ksp_parser::Fold;
use ksp_parser::ast::fold::{fold_exprs, walk_call, walk_callback, walk_stmt};
use ksp_parser::ast::{
    Assignment, BinaryOp, Block, Callback, Declaration, Expr, Family, ForLoop,
    FunctionCall, FunctionDef, FunctionFlags, Ident, IfStmt, Initializer, Module, Param, ParamKind,
    PropertyBody, PropertyDecl, Stmt, StmtKind, VarRef, WhileLoop,
};

use crate::const_eval::{Value, evaluate};
use crate::context::{CompilationContext, FunctionEntry};
use crate::resolver::prefixed;

use super::{FRAME_POINTER, fixed_ident, stack_slot};

/// The function whose body is being lowered.
struct FunctionScope {
    entry: FunctionEntry,
    params: Vec<String>,
}

pub struct LowerPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
    scope: Option<FunctionScope>,
    /// Enclosing family names, outermost first.
    families: Vec<String>,
}

impl<'a, 'reg> LowerPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Self {
        Self {
            ctx,
            scope: None,
            families: Vec::new(),
        }
    }

    /// Lower `module`, returning its callbacks with init first.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module) -> Result<Module, CompileError> {
        for def in module.functions() {
            self.ctx.functions_before_prefix.insert(def.name.name.clone());
        }

        let mut blocks = module.blocks;
        match blocks
            .iter()
            .position(|b| matches!(b, Block::Callback(cb) if cb.is_init()))
        {
            Some(0) => {}
            Some(index) => {
                let init = blocks.remove(index);
                blocks.insert(0, init);
            }
            None => blocks.insert(0, Block::Callback(Callback::new("init", Vec::new()))),
        }

        let mut callbacks = Vec::with_capacity(blocks.len());
        for block in blocks {
            match block {
                Block::Callback(cb) => callbacks.push(Block::Callback(self.fold_callback(cb)?)),
                Block::Function(def) => self.lower_function(def, true)?,
            }
        }

        tracing::debug!(
            functions = self.ctx.functions.len(),
            variables = self.ctx.symbols.variable_count(),
            "lowered module"
        );
        Ok(Module { blocks: callbacks })
    }

    fn lower_function(&mut self, mut def: FunctionDef, qualify_name: bool) -> Result<(), CompileError> {
        let names = def.param_names();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(CompileError::DuplicateParameter {
                    function: def.name.full(),
                    loc: self.ctx.location(def.span, &[]),
                });
            }
        }

        if qualify_name {
            def.name = self.ctx.qualify_declared(def.name);
        }
        let name = def.name.name.clone();

        if let Some(existing) = self.ctx.functions.get(&name)
            && !def.is_override()
        {
            if existing.def.is_override() {
                tracing::trace!(function = %name, "base definition replaced by override");
                return Ok(());
            }
            return Err(CompileError::DuplicateFunction {
                name,
                loc: self.ctx.location(def.name.span, &[]),
            });
        }

        let body = mem::take(&mut def.body);
        let scope = FunctionScope {
            entry: FunctionEntry::new(def),
            params: names,
        };
        let saved_scope = self.scope.replace(scope);
        let saved_families = mem::take(&mut self.families);

        let body = self.fold_stmts(body);

        self.families = saved_families;
        let scope = mem::replace(&mut self.scope, saved_scope);
        let body = body?;

        let Some(FunctionScope { mut entry, .. }) = scope else {
            return Err(CompileError::internal("function scope lost while lowering"));
        };
        entry.def.body = body;
        self.ctx.call_graph.ensure(&name);
        if let Some(replaced) = self.ctx.functions.insert(name, entry) {
            for decl in &replaced.local_decls {
                if let StmtKind::Declare(decl) = &decl.kind {
                    self.ctx.symbols.remove_variable(&decl.name.full());
                }
            }
        }
        Ok(())
    }

    fn params(&self) -> &[String] {
        self.scope.as_ref().map_or(&[], |s| s.params.as_slice())
    }

    fn substitution(&self, name: &str) -> Option<&VarRef> {
        self.scope.as_ref()?.entry.substitutions.get(name)
    }

    /// A declared name inside a family gets the family chain; anywhere else
    /// it gets the namespace chain of its line.
    fn declared_name(&self, ident: Ident) -> Ident {
        if self.families.is_empty() {
            self.ctx.qualify_declared(ident)
        } else {
            prefixed(ident, &self.families)
        }
    }

    fn lower_family(&mut self, family: Family) -> Result<Vec<Stmt>, CompileError> {
        let name = if self.families.is_empty() {
            self.ctx.qualify_declared(family.name).name
        } else {
            family.name.name
        };
        self.families.push(name);
        self.ctx.symbols.add_family(self.families.join("."));

        let body = self.fold_stmts(family.body);
        self.families.pop();
        body
    }

    fn lower_property(&mut self, prop: PropertyDecl, span: Span) -> Result<(), CompileError> {
        let PropertyDecl { name, body } = prop;
        let name = self.declared_name(name);
        let property = name.name.clone();

        let accessors = match body {
            PropertyBody::Accessors(functions) => {
                self.check_accessors(&property, &functions, span)?;
                functions
            }
            PropertyBody::Alias { indices, target } => alias_accessors(&indices, target, span),
        };

        for mut accessor in accessors {
            let full = format!("{property}.{}", accessor.name.name);
            accessor.name = fixed_ident(&full, accessor.name.span);
            self.lower_function(accessor, false)?;
        }

        self.ctx.symbols.add_property(property);
        Ok(())
    }

    fn check_accessors(&self, property: &str, functions: &[FunctionDef], span: Span) -> Result<(), CompileError> {
        if functions.is_empty() {
            return Err(CompileError::MissingAccessors {
                property: property.to_string(),
                loc: self.ctx.location(span, &[]),
            });
        }

        for f in functions {
            let loc = || self.ctx.location(f.span, &[]);
            match f.name.name.as_str() {
                "get" if f.result.is_none() => {
                    return Err(CompileError::GetterWithoutResult {
                        property: property.to_string(),
                        loc: loc(),
                    });
                }
                "set" if f.result.is_some() => {
                    return Err(CompileError::SetterWithResult {
                        property: property.to_string(),
                        loc: loc(),
                    });
                }
                "set" if f.params.is_empty() => {
                    return Err(CompileError::SetterWithoutParameter {
                        property: property.to_string(),
                        loc: loc(),
                    });
                }
                "get" | "set" => {}
                other => {
                    return Err(CompileError::InvalidAccessor {
                        found: other.to_string(),
                        loc: loc(),
                    });
                }
            }
        }
        Ok(())
    }

    fn lower_declaration(&mut self, decl: Declaration, span: Span, trace: Vec<Span>) -> Result<Vec<Stmt>, CompileError> {
        let Declaration {
            name,
            modifiers,
            size,
            params,
            init,
        } = decl;

        let size = size.map(|s| self.fold_expr(s)).transpose()?;
        let params = fold_exprs(self, params)?;
        let init = match init {
            Some(Initializer::Single(e)) => Some(Initializer::Single(self.fold_expr(e)?)),
            Some(Initializer::List(values)) => Some(Initializer::List(fold_exprs(self, values)?)),
            None => None,
        };

        let mut decl = Declaration {
            name: self.declared_name(name),
            modifiers,
            size,
            params,
            init,
        };
        if decl.name.sigil.is_none() {
            decl.name.sigil = Some(infer_sigil(&decl));
        }

        if self.scope.is_none() {
            self.ctx.symbols.add_variable(&decl.name.full(), decl.ui_kind().is_some());
            return Ok(vec![Stmt {
                kind: StmtKind::Declare(Box::new(decl)),
                span,
                trace,
            }]);
        }
        self.lower_local(decl, span, trace)
    }

    fn lower_local(&mut self, mut decl: Declaration, span: Span, trace: Vec<Span>) -> Result<Vec<Stmt>, CompileError> {
        let Some(scope) = self.scope.as_mut() else {
            return Err(CompileError::internal("local declaration outside a function"));
        };
        let entry = &mut scope.entry;

        let is_local = decl.has_modifier("local");
        let promoted = (entry.name().to_lowercase().contains("on_init") && !is_local) || decl.has_modifier("global");

        if promoted {
            decl.remove_modifier("global");
            self.ctx.symbols.add_variable(&decl.name.full(), decl.ui_kind().is_some());
            entry.global_decls.push(Stmt {
                kind: StmtKind::Declare(Box::new(decl)),
                span,
                trace,
            });
            return Ok(Vec::new());
        }

        let local_name = decl.name.name.clone();
        if !entry.locals.insert(local_name.to_lowercase()) {
            return Err(CompileError::LocalRedeclared {
                name: local_name,
                loc: self.ctx.location(decl.name.span, &trace),
            });
        }

        let in_frame = entry.def.is_taskfunc() && !is_local;
        let replacement = if in_frame {
            let slot = entry.frame_decls.len() as i32 + 1;
            stack_slot(FRAME_POINTER, BinaryOp::Add, slot, decl.name.span)
        } else {
            let sigil = decl.name.sigil.unwrap_or(Sigil::Integer);
            let base = format!("{sigil}_{local_name}");
            let mut unique = base.clone();
            let mut n = 2;
            while self.ctx.symbols.has_variable(&unique) {
                unique = format!("{base}{n}");
                n += 1;
            }
            tracing::trace!(local = %local_name, renamed = %unique, "renamed local");

            decl.name = fixed_ident(&unique, decl.name.span);
            decl.remove_modifier("local");
            self.ctx.symbols.add_variable(&unique, decl.ui_kind().is_some());
            VarRef::new(decl.name.clone())
        };

        let mut out = Vec::new();
        if !decl.is_const()
            && decl.size.is_none()
            && let Some(Initializer::Single(value)) = decl.init.take()
        {
            out.push(Stmt {
                kind: StmtKind::Assign(Assignment {
                    target: replacement.clone(),
                    value,
                }),
                span,
                trace: trace.clone(),
            });
        }

        entry.substitutions.insert(local_name, replacement);
        let stmt = Stmt {
            kind: StmtKind::Declare(Box::new(decl)),
            span,
            trace,
        };
        if in_frame {
            entry.frame_decls.push(stmt);
        } else {
            entry.local_decls.push(stmt);
        }
        Ok(out)
    }
}

impl Fold for LowerPass<'_, '_> {
    type Error = CompileError;

    fn fold_callback(&mut self, callback: Callback) -> Result<Callback, CompileError> {
        if !self.ctx.builtins.is_callback(&callback.name) {
            tracing::warn!(callback = %callback.name, "unknown callback name");
        }
        walk_callback(self, callback)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, CompileError> {
        let Stmt { kind, span, trace } = stmt;
        match kind {
            StmtKind::For(for_loop) => {
                let lowered = lower_for(*for_loop, span, &trace);
                self.fold_stmts(lowered)
            }
            StmtKind::If(chain) if chain.branches.len() > 1 => {
                let nested = nest_else_ifs(chain, span, &trace);
                walk_stmt(self, nested)
            }
            StmtKind::Family(family) => self.lower_family(family),
            StmtKind::Property(prop) => {
                self.lower_property(*prop, span)?;
                Ok(Vec::new())
            }
            StmtKind::Declare(decl) => self.lower_declaration(*decl, span, trace),
            kind => walk_stmt(self, Stmt { kind, span, trace }),
        }
    }

    fn fold_var_ref(&mut self, var: VarRef) -> Result<VarRef, CompileError> {
        let ident = self.ctx.qualify(var.ident, self.params());
        let mut subscripts = fold_exprs(self, var.subscripts)?;

        if let Some(replacement) = self.substitution(&ident.name) {
            subscripts.extend(replacement.subscripts.iter().cloned());
            return Ok(VarRef {
                ident: replacement.ident.clone(),
                subscripts,
                span: var.span,
            });
        }
        Ok(VarRef {
            ident,
            subscripts,
            span: var.span,
        })
    }

    fn fold_call(&mut self, mut call: FunctionCall) -> Result<FunctionCall, CompileError> {
        if !self.ctx.builtins.keeps_first_argument(&call.name.name) || call.args.is_empty() {
            return walk_call(self, call);
        }
        call.name = self.fold_ident(call.name)?;
        let rest = call.args.split_off(1);
        call.args.extend(fold_exprs(self, rest)?);
        Ok(call)
    }

    fn fold_ident(&mut self, ident: Ident) -> Result<Ident, CompileError> {
        let ident = self.ctx.qualify(ident, self.params());
        Ok(match self.substitution(&ident.name) {
            Some(replacement) => replacement.ident.clone(),
            None => ident,
        })
    }
}

/// Array declarations get an array sigil, scalars an integer or real one.
fn infer_sigil(decl: &Declaration) -> Sigil {
    let first = decl.first_value().map(evaluate);
    if decl.size.is_some() {
        if decl.ui_kind() == Some("ui_xy") {
            return Sigil::RealArray;
        }
        return match first {
            Some(Ok(Value::Str(_))) => Sigil::StringArray,
            Some(Ok(Value::Real(_))) => Sigil::RealArray,
            _ => Sigil::IntegerArray,
        };
    }
    match first {
        Some(Ok(Value::Real(_))) if !decl.is_const() => Sigil::Real,
        _ => Sigil::Integer,
    }
}

/// `for v := a to b` → `v := a`, `while (v <= b) ... inc(v) end while`.
fn lower_for(for_loop: ForLoop, span: Span, trace: &[Span]) -> Vec<Stmt> {
    let ForLoop {
        var,
        start,
        end,
        step,
        downto,
        mut body,
    } = for_loop;
    let at = |kind| Stmt {
        kind,
        span,
        trace: trace.to_vec(),
    };

    let (op, end) = match end {
        Expr::Binary(bin) if !downto && bin.op == BinaryOp::Sub && bin.right.is_int(1) => (BinaryOp::Less, bin.left),
        end if downto => (BinaryOp::GreaterEqual, end),
        end => (BinaryOp::LessEqual, end),
    };
    let cond = Expr::binary(Expr::Var(var.clone()), op, end);

    let advance = match step {
        None => {
            let name = if downto { "dec" } else { "inc" };
            StmtKind::Call(FunctionCall::new(
                fixed_ident(name, span),
                vec![Expr::Var(var.clone())],
                true,
            ))
        }
        Some(step) => {
            let op = if downto { BinaryOp::Sub } else { BinaryOp::Add };
            StmtKind::Assign(Assignment {
                target: var.clone(),
                value: Expr::binary(Expr::Var(var.clone()), op, step),
            })
        }
    };
    body.push(at(advance));

    vec![
        at(StmtKind::Assign(Assignment { target: var, value: start })),
        at(StmtKind::While(WhileLoop { cond, body })),
    ]
}

/// `if a .. else if b .. else .. end if` becomes `if a .. else (if b .. else .. end if) end if`.
fn nest_else_ifs(chain: IfStmt, span: Span, trace: &[Span]) -> Stmt {
    let IfStmt {
        mut branches,
        mut else_body,
    } = chain;
    while branches.len() > 1 {
        let Some(last) = branches.pop() else { break };
        else_body = vec![Stmt {
            kind: StmtKind::If(IfStmt {
                branches: vec![last],
                else_body,
            }),
            span,
            trace: trace.to_vec(),
        }];
    }
    Stmt {
        kind: StmtKind::If(IfStmt { branches, else_body }),
        span,
        trace: trace.to_vec(),
    }
}

/// Accessors for `property name[i, j] -> target`.
fn alias_accessors(indices: &[Ident], target: VarRef, span: Span) -> Vec<FunctionDef> {
    let index_params: Vec<Param> = indices
        .iter()
        .map(|i| Param::new(i.clone(), ParamKind::Value))
        .collect();
    let result = Ident::parse("result", span);
    let value = Ident::parse("value_to_set", span);

    let getter = FunctionDef {
        name: Ident::parse("get", span),
        params: index_params.clone(),
        result: Some(result.clone()),
        body: vec![Stmt::assign(VarRef::new(result), Expr::Var(target.clone()), span)],
        flags: FunctionFlags::empty(),
        span,
    };

    let mut setter_params = index_params;
    setter_params.push(Param::new(value.clone(), ParamKind::Value));
    let setter = FunctionDef {
        name: Ident::parse("set", span),
        params: setter_params,
        result: None,
        body: vec![Stmt::assign(target, Expr::var(value), span)],
        flags: FunctionFlags::empty(),
        span,
    };

    vec![getter, setter]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emitter;
    use crate::options::CompileOptions;
    use crate::passes::SigilPass;
    use ksp_core::ErrorCategory;
    use ksp_parser::{LineMap, Parser};
    use ksp_registry::Builtins;

    struct Lowered {
        callbacks: Vec<(String, String)>,
        functions: Vec<(String, String)>,
        globals: Vec<String>,
        locals: Vec<String>,
        frame: Vec<String>,
        variables: Vec<String>,
        properties: bool,
    }

    fn lower_with(source: &str, lines: &LineMap) -> Result<Lowered, CompileError> {
        let builtins = Builtins::standard();
        let options = CompileOptions::default();
        let mut ctx = CompilationContext::new(&builtins, lines);
        let module = Parser::parse(source, lines).expect("parse");
        let module = LowerPass::new(&mut ctx).run(module)?;
        let module = SigilPass::new(&mut ctx).run(module)?;

        let render = |stmts: &[Stmt]| Emitter::new(&builtins, &options).emit_stmts(stmts);
        let all = |pick: fn(&FunctionEntry) -> &Vec<Stmt>| {
            ctx.functions.values().map(|f| render(pick(f))).collect::<Vec<_>>()
        };
        Ok(Lowered {
            callbacks: module.callbacks().map(|cb| (cb.name.clone(), render(&cb.body))).collect(),
            functions: ctx
                .functions
                .iter()
                .map(|(name, f)| (name.clone(), render(&f.def.body)))
                .collect(),
            globals: all(|f| &f.global_decls),
            locals: all(|f| &f.local_decls),
            frame: all(|f| &f.frame_decls),
            variables: ctx.symbols.sorted_variables().into_iter().map(str::to_string).collect(),
            properties: ctx.symbols.is_property("level"),
        })
    }

    fn lower(source: &str) -> Result<Lowered, CompileError> {
        lower_with(source, &LineMap::single(None))
    }

    fn init(source: &str) -> String {
        let out = lower(&format!("on init\n{source}\nend on")).expect("lowers");
        out.callbacks[0].1.clone()
    }

    #[test]
    fn for_loops_become_while_loops() {
        assert_eq!(
            init("declare %a[4]\ndeclare $i\nfor i := 0 to 4 - 1\n  a[i] := i\nend for"),
            "declare %a[4]\ndeclare $i\n$i := 0\nwhile ($i<4)\n%a[$i] := $i\ninc($i)\nend while\n"
        );
        assert_eq!(
            init("declare $i\nfor i := 10 downto 0 step 2\n  message(i)\nend for"),
            "declare $i\n$i := 10\nwhile ($i>=0)\nmessage($i)\n$i := $i-2\nend while\n"
        );
    }

    #[test]
    fn else_if_chains_are_nested() {
        assert_eq!(
            init("declare $i\nif (i = 1)\n  i := 2\nelse if (i = 2)\n  i := 3\nelse\n  i := 4\nend if"),
            "declare $i\nif ($i=1)\n$i := 2\nelse\nif ($i=2)\n$i := 3\nelse\n$i := 4\nend if\nend if\n"
        );
    }

    #[test]
    fn sigils_are_inferred_from_declarations() {
        let out = init("declare n\ndeclare r := 1.5\ndeclare t[2] := (\"a\", \"b\")\ndeclare u[2]");
        assert_eq!(out, "declare $n\ndeclare ~r := 1.5\ndeclare !t[2] := (\"a\", \"b\")\ndeclare %u[2]\n");
    }

    #[test]
    fn families_prefix_their_declarations() {
        let out = lower(
            "on init\n  family voice\n    declare gain\n    family env\n      declare attack\n    end family\n  \
             end family\n  voice.gain := 1\nend on",
        )
        .expect("lowers");
        assert_eq!(
            out.callbacks[0].1,
            "declare $voice.gain\ndeclare $voice.env.attack\n$voice.gain := 1\n"
        );
        assert_eq!(out.variables, vec!["$voice.env.attack", "$voice.gain"]);
    }

    #[test]
    fn properties_become_accessor_functions() {
        let out = lower(
            "on init\n  declare %levels[4]\n  property level[i] -> levels[i]\nend on",
        )
        .expect("lowers");
        assert!(out.properties);
        let names: Vec<&str> = out.functions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["level.get", "level.set"]);
        assert_eq!(out.functions[0].1, "result := %levels[i]\n");
        assert_eq!(out.functions[1].1, "%levels[i] := value_to_set\n");
    }

    #[test]
    fn accessor_shapes_are_checked() {
        let err = lower(
            "on init\n  property level\n    function fetch() -> r\n      r := 1\n    end function\n  end property\nend on",
        )
        .err()
        .expect("invalid accessor");
        assert!(matches!(&err, CompileError::InvalidAccessor { found, .. } if found == "fetch"));
        assert_eq!(err.category(), ErrorCategory::Contract);

        let err = lower(
            "on init\n  property level\n    function get()\n      message(1)\n    end function\n  end property\nend on",
        )
        .err()
        .expect("getter without result");
        assert!(matches!(err, CompileError::GetterWithoutResult { .. }));

        let err = lower(
            "on init\n  property level\n    function set()\n      message(1)\n    end function\n  end property\nend on",
        )
        .err()
        .expect("setter without parameter");
        assert!(matches!(err, CompileError::SetterWithoutParameter { .. }));
    }

    #[test]
    fn locals_are_renamed_uniquely() {
        let out = lower(
            "on init\nend on\n\
             function f\n  declare tmp := 5\n  message(tmp)\nend function\n\
             function g\n  declare tmp\n  tmp := 1\nend function",
        )
        .expect("lowers");
        assert_eq!(out.functions[0].1, "$_tmp := 5\nmessage($_tmp)\n");
        assert_eq!(out.functions[1].1, "$_tmp2 := 1\n");
        assert_eq!(out.locals, vec!["declare $_tmp\n", "declare $_tmp2\n"]);
    }

    #[test]
    fn on_init_functions_promote_declarations() {
        let out = lower(
            "on init\nend on\n\
             function lib_on_init\n  declare level := 3\n  declare local scratch\nend function\n\
             function f\n  declare global shared\nend function",
        )
        .expect("lowers");
        assert_eq!(out.globals, vec!["declare $level := 3\n", "declare $shared\n"]);
        assert_eq!(out.locals, vec!["declare $_scratch\n", ""]);
        assert!(out.variables.contains(&"$level".to_string()));
    }

    #[test]
    fn taskfunc_locals_live_in_the_frame() {
        let out = lower(
            "on init\n  declare %p[32]\n  declare $sp\n  declare $fp\nend on\n\
             taskfunc t\n  declare count\n  declare local keep\n  count := 1\n  keep := count\nend taskfunc",
        )
        .expect("lowers");
        assert_eq!(out.functions[0].1, "%p[$fp+1] := 1\n$_keep := %p[$fp+1]\n");
        assert_eq!(out.frame, vec!["declare $count\n"]);
        assert_eq!(out.locals, vec!["declare $_keep\n"]);
    }

    #[test]
    fn init_is_moved_to_the_front() {
        let out = lower("on note\n  message(1)\nend on\non init\n  message(2)\nend on").expect("lowers");
        let names: Vec<&str> = out.callbacks.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["init", "note"]);

        let out = lower("on note\n  message(1)\nend on").expect("lowers");
        assert_eq!(out.callbacks[0], ("init".to_string(), String::new()));
    }

    #[test]
    fn overrides_replace_definitions() {
        let body = |source: &str| lower(source).expect("lowers").functions[0].1.clone();
        let base = "function f\n  message(1)\nend function\n";
        let replacement = "override function f\n  message(2)\nend function\n";
        assert_eq!(body(&format!("{base}{replacement}")), "message(2)\n");
        assert_eq!(body(&format!("{replacement}{base}")), "message(2)\n");

        let base_with_local = "function f\n  declare tmp\n  tmp := 1\n  message(tmp)\nend function\n";
        let replacement_with_local = "override function f\n  declare other\n  other := 2\nend function\n";
        let out = lower(&format!("{base_with_local}{replacement_with_local}")).expect("lowers");
        assert!(!out.variables.contains(&"$_tmp".to_string()), "{:?}", out.variables);
        assert!(out.variables.contains(&"$_other".to_string()), "{:?}", out.variables);

        let err = lower(&format!("{base}{base}")).err().expect("duplicate");
        assert!(matches!(&err, CompileError::DuplicateFunction { name, .. } if name == "f"));
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn declaration_errors() {
        let err = lower("function f(a, a)\n  message(a)\nend function").err().expect("duplicate parameter");
        assert!(matches!(err, CompileError::DuplicateParameter { .. }));

        let err = lower("function f\n  declare x\n  declare x\nend function").err().expect("redeclared");
        assert!(matches!(&err, CompileError::LocalRedeclared { name, .. } if name == "x"));
    }

    #[test]
    fn imported_lines_get_their_namespace() {
        let mut lines = LineMap::new();
        lines
            .push_lines(2, Some("main.ksp"), &[])
            .push_lines(3, Some("lib.ksp"), &["lib".to_string()]);
        let out = lower_with(
            "on init\nend on\nfunction reset\n  declare global level\nend function",
            &lines,
        )
        .expect("lowers");
        assert_eq!(out.functions[0].0, "lib.reset");
        assert_eq!(out.globals, vec!["declare $lib.level\n"]);
    }
}
