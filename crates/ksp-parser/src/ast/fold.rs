//! Tree-to-tree rewriting.
//!
//! A [`Fold`] consumes a node and returns its replacement, so every pass
//! produces a new tree instead of patching the old one in place. The default
//! methods call the matching `walk_*` function, which rebuilds the node from
//! its folded children. Override a method to change how one node kind is
//! rewritten; the exhaustive matches in the walkers make a new node kind a
//! compile error in every pass that has not handled it.
//!
//! [`Fold::fold_stmt`] returns a `Vec<Stmt>` so a statement can expand into
//! several (loop lowering, inlining) or disappear.

use super::decl::*;
use super::expr::*;
use super::stmt::*;

pub trait Fold: Sized {
    type Error;

    fn fold_module(&mut self, module: Module) -> Result<Module, Self::Error> {
        walk_module(self, module)
    }

    fn fold_block(&mut self, block: Block) -> Result<Block, Self::Error> {
        walk_block(self, block)
    }

    fn fold_callback(&mut self, callback: Callback) -> Result<Callback, Self::Error> {
        walk_callback(self, callback)
    }

    fn fold_function(&mut self, function: FunctionDef) -> Result<FunctionDef, Self::Error> {
        walk_function(self, function)
    }

    fn fold_stmts(&mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, Self::Error> {
        walk_stmts(self, stmts)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, Self::Error> {
        walk_stmt(self, stmt)
    }

    fn fold_declaration(&mut self, decl: Declaration) -> Result<Declaration, Self::Error> {
        walk_declaration(self, decl)
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, Self::Error> {
        walk_expr(self, expr)
    }

    fn fold_var_ref(&mut self, var: VarRef) -> Result<VarRef, Self::Error> {
        walk_var_ref(self, var)
    }

    fn fold_call(&mut self, call: FunctionCall) -> Result<FunctionCall, Self::Error> {
        walk_call(self, call)
    }

    fn fold_ident(&mut self, ident: Ident) -> Result<Ident, Self::Error> {
        Ok(ident)
    }
}

pub fn walk_module<F: Fold>(f: &mut F, module: Module) -> Result<Module, F::Error> {
    let blocks = module
        .blocks
        .into_iter()
        .map(|b| f.fold_block(b))
        .collect::<Result<_, _>>()?;
    Ok(Module { blocks })
}

pub fn walk_block<F: Fold>(f: &mut F, block: Block) -> Result<Block, F::Error> {
    Ok(match block {
        Block::Callback(cb) => Block::Callback(f.fold_callback(cb)?),
        Block::Function(func) => Block::Function(f.fold_function(func)?),
    })
}

pub fn walk_callback<F: Fold>(f: &mut F, mut callback: Callback) -> Result<Callback, F::Error> {
    callback.variable = callback.variable.map(|v| f.fold_ident(v)).transpose()?;
    callback.body = f.fold_stmts(callback.body)?;
    Ok(callback)
}

pub fn walk_function<F: Fold>(f: &mut F, mut function: FunctionDef) -> Result<FunctionDef, F::Error> {
    function.body = f.fold_stmts(function.body)?;
    Ok(function)
}

pub fn walk_stmts<F: Fold>(f: &mut F, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, F::Error> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        out.extend(f.fold_stmt(stmt)?);
    }
    Ok(out)
}

pub fn walk_stmt<F: Fold>(f: &mut F, stmt: Stmt) -> Result<Vec<Stmt>, F::Error> {
    let Stmt { kind, span, trace } = stmt;
    let kind = match kind {
        StmtKind::Property(prop) => {
            let PropertyDecl { name, body } = *prop;
            let body = match body {
                PropertyBody::Accessors(fs) => PropertyBody::Accessors(
                    fs.into_iter()
                        .map(|func| f.fold_function(func))
                        .collect::<Result<_, _>>()?,
                ),
                PropertyBody::Alias { indices, target } => PropertyBody::Alias {
                    indices,
                    target: f.fold_var_ref(target)?,
                },
            };
            StmtKind::Property(Box::new(PropertyDecl { name, body }))
        }
        StmtKind::Declare(decl) => StmtKind::Declare(Box::new(f.fold_declaration(*decl)?)),
        StmtKind::Assign(assign) => StmtKind::Assign(Assignment {
            target: f.fold_var_ref(assign.target)?,
            value: f.fold_expr(assign.value)?,
        }),
        StmtKind::Call(call) => StmtKind::Call(f.fold_call(call)?),
        StmtKind::While(w) => StmtKind::While(WhileLoop {
            cond: f.fold_expr(w.cond)?,
            body: f.fold_stmts(w.body)?,
        }),
        StmtKind::For(for_loop) => {
            let ForLoop {
                var,
                start,
                end,
                step,
                downto,
                body,
            } = *for_loop;
            StmtKind::For(Box::new(ForLoop {
                var: f.fold_var_ref(var)?,
                start: f.fold_expr(start)?,
                end: f.fold_expr(end)?,
                step: step.map(|s| f.fold_expr(s)).transpose()?,
                downto,
                body: f.fold_stmts(body)?,
            }))
        }
        StmtKind::Family(family) => StmtKind::Family(Family {
            name: family.name,
            body: f.fold_stmts(family.body)?,
        }),
        StmtKind::If(chain) => {
            let mut branches = Vec::with_capacity(chain.branches.len());
            for branch in chain.branches {
                branches.push(CondBranch {
                    cond: f.fold_expr(branch.cond)?,
                    body: f.fold_stmts(branch.body)?,
                });
            }
            StmtKind::If(IfStmt {
                branches,
                else_body: f.fold_stmts(chain.else_body)?,
            })
        }
        StmtKind::Select(select) => {
            let scrutinee = f.fold_expr(select.scrutinee)?;
            let mut cases = Vec::with_capacity(select.cases.len());
            for case in select.cases {
                cases.push(SelectCase {
                    start: f.fold_expr(case.start)?,
                    end: case.end.map(|e| f.fold_expr(e)).transpose()?,
                    body: f.fold_stmts(case.body)?,
                });
            }
            StmtKind::Select(SelectStmt { scrutinee, cases })
        }
    };
    Ok(vec![Stmt { kind, span, trace }])
}

pub fn walk_declaration<F: Fold>(f: &mut F, decl: Declaration) -> Result<Declaration, F::Error> {
    let Declaration {
        name,
        modifiers,
        size,
        params,
        init,
    } = decl;
    Ok(Declaration {
        name: f.fold_ident(name)?,
        modifiers,
        size: size.map(|s| f.fold_expr(s)).transpose()?,
        params: fold_exprs(f, params)?,
        init: match init {
            Some(Initializer::Single(e)) => Some(Initializer::Single(f.fold_expr(e)?)),
            Some(Initializer::List(values)) => Some(Initializer::List(fold_exprs(f, values)?)),
            None => None,
        },
    })
}

pub fn walk_expr<F: Fold>(f: &mut F, expr: Expr) -> Result<Expr, F::Error> {
    Ok(match expr {
        Expr::Binary(bin) => {
            let BinaryExpr {
                left,
                op,
                right,
                span,
            } = *bin;
            Expr::Binary(Box::new(BinaryExpr {
                left: f.fold_expr(left)?,
                op,
                right: f.fold_expr(right)?,
                span,
            }))
        }
        Expr::Unary(un) => {
            let UnaryExpr { op, operand, span } = *un;
            Expr::Unary(Box::new(UnaryExpr {
                op,
                operand: f.fold_expr(operand)?,
                span,
            }))
        }
        Expr::Var(var) => Expr::Var(f.fold_var_ref(var)?),
        Expr::Call(call) => Expr::Call(Box::new(f.fold_call(*call)?)),
        lit @ (Expr::Integer(_)
        | Expr::Real(_)
        | Expr::String(_)
        | Expr::Boolean(_)
        | Expr::RawArray(_)) => lit,
    })
}

pub fn walk_var_ref<F: Fold>(f: &mut F, var: VarRef) -> Result<VarRef, F::Error> {
    Ok(VarRef {
        ident: f.fold_ident(var.ident)?,
        subscripts: fold_exprs(f, var.subscripts)?,
        span: var.span,
    })
}

pub fn walk_call<F: Fold>(f: &mut F, call: FunctionCall) -> Result<FunctionCall, F::Error> {
    Ok(FunctionCall {
        name: f.fold_ident(call.name)?,
        args: fold_exprs(f, call.args)?,
        ..call
    })
}

pub fn fold_exprs<F: Fold>(f: &mut F, exprs: Vec<Expr>) -> Result<Vec<Expr>, F::Error> {
    exprs.into_iter().map(|e| f.fold_expr(e)).collect()
}
