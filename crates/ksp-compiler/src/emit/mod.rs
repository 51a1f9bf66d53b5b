//! Emitter - prints a lowered module as KSP text.
//!
//! Two layouts are supported: compact (no indentation, no blank lines) and
//! indented, selected by [`CompileOptions::remove_whitespace`]. Output is a
//! pure function of the tree and the options.
//!
//! Parentheses are only added where precedence requires them: a left operand
//! binding looser than its operator, a right operand binding no tighter, and
//! any operator operand of a prefix operator.

use std::fmt::Write;

use ksp_parser::ast::{
    Block, Callback, Declaration, Expr, FunctionCall, FunctionDef, IfStmt, Initializer, Module, SelectStmt, Stmt,
    StmtKind, UnaryOp, VarRef,
};
use ksp_registry::Builtins;

use crate::options::CompileOptions;

/// Comparisons and Booleans print at this level.
const BOOLEAN_PRECEDENCE: u8 = 5;

pub struct Emitter<'a> {
    builtins: &'a Builtins,
    compact: bool,
    indent_width: usize,
    depth: usize,
    out: String,
}

impl<'a> Emitter<'a> {
    pub fn new(builtins: &'a Builtins, options: &CompileOptions) -> Self {
        Self {
            builtins,
            compact: options.remove_whitespace,
            indent_width: options.indent_width,
            depth: 0,
            out: String::new(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn emit_module(mut self, module: &Module) -> String {
        for block in &module.blocks {
            match block {
                Block::Callback(cb) => self.callback(cb),
                Block::Function(f) => self.function(f),
            }
            if !self.compact {
                self.out.push('\n');
            }
        }
        self.out
    }

    pub fn emit_stmts(mut self, stmts: &[Stmt]) -> String {
        self.stmts(stmts);
        self.out
    }

    fn line(&mut self, text: &str) {
        if !self.compact {
            let width = self.depth * self.indent_width;
            let _ = write!(self.out, "{:width$}", "");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn indented(&mut self, stmts: &[Stmt]) {
        self.depth += 1;
        self.stmts(stmts);
        self.depth -= 1;
    }

    fn callback(&mut self, cb: &Callback) {
        match &cb.variable {
            Some(var) => self.line(&format!("on {}({var})", cb.name)),
            None => self.line(&format!("on {}", cb.name)),
        }
        self.indented(&cb.body);
        self.line("end on");
    }

    fn function(&mut self, f: &FunctionDef) {
        let mut head = format!("function {}", f.name);
        if !f.params.is_empty() {
            let params: Vec<String> = f.params.iter().map(|p| p.name.to_string()).collect();
            let _ = write!(head, "({})", params.join(", "));
        }
        self.line(&head);
        self.indented(&f.body);
        self.line("end function");
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Declare(decl) => {
                let text = self.declaration(decl);
                self.line(&text);
            }
            StmtKind::Assign(assign) => {
                let text = format!("{} := {}", self.var_ref(&assign.target), self.expr(&assign.value));
                self.line(&text);
            }
            StmtKind::Call(call) => {
                let text = self.call(call);
                self.line(&text);
            }
            StmtKind::While(w) => {
                let head = format!("while ({})", self.expr(&w.cond));
                self.line(&head);
                self.indented(&w.body);
                self.line("end while");
            }
            StmtKind::For(f) => {
                let word = if f.downto { "downto" } else { "to" };
                let mut head = format!(
                    "for {} := {} {word} {}",
                    self.var_ref(&f.var),
                    self.expr(&f.start),
                    self.expr(&f.end)
                );
                if let Some(step) = &f.step {
                    let _ = write!(head, " step {}", self.expr(step));
                }
                self.line(&head);
                self.indented(&f.body);
                self.line("end for");
            }
            StmtKind::Family(family) => {
                self.line(&format!("family {}", family.name));
                self.indented(&family.body);
                self.line("end family");
            }
            StmtKind::If(chain) => self.if_chain(chain),
            StmtKind::Select(select) => self.select(select),
            // Accessors have been inlined by now.
            StmtKind::Property(_) => {}
        }
    }

    fn if_chain(&mut self, chain: &IfStmt) {
        for (i, branch) in chain.branches.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "else if" };
            let head = format!("{keyword} ({})", self.expr(&branch.cond));
            self.line(&head);
            self.indented(&branch.body);
        }
        if !chain.else_body.is_empty() {
            self.line("else");
            self.indented(&chain.else_body);
        }
        self.line("end if");
    }

    fn select(&mut self, select: &SelectStmt) {
        let head = format!("select ({})", self.expr(&select.scrutinee));
        self.line(&head);
        self.depth += 1;
        for case in &select.cases {
            let head = match &case.end {
                Some(end) => format!("case {} to {}", self.expr(&case.start), self.expr(end)),
                None => format!("case {}", self.expr(&case.start)),
            };
            self.line(&head);
            self.indented(&case.body);
        }
        self.depth -= 1;
        self.line("end select");
    }

    fn declaration(&self, decl: &Declaration) -> String {
        let mut text = String::from("declare ");
        for modifier in &decl.modifiers {
            text.push_str(modifier);
            text.push(' ');
        }
        let _ = write!(text, "{}", decl.name);
        if let Some(size) = &decl.size {
            let _ = write!(text, "[{}]", self.expr(size));
        }
        if !decl.params.is_empty() {
            let _ = write!(text, "({})", self.exprs(&decl.params));
        }
        match &decl.init {
            Some(Initializer::Single(Expr::RawArray(raw))) => {
                let _ = write!(text, " := ({})", raw.text);
            }
            Some(Initializer::Single(value)) => {
                let _ = write!(text, " := {}", self.expr(value));
            }
            Some(Initializer::List(values)) => {
                let _ = write!(text, " := ({})", self.exprs(values));
            }
            None => {}
        }
        text
    }

    fn call(&self, call: &FunctionCall) -> String {
        let mut text = String::new();
        if call.using_call {
            text.push_str("call ");
        }
        let _ = write!(text, "{}", call.name);
        if !call.args.is_empty() || !call.is_procedure || self.builtins.forces_parentheses(&call.name.name) {
            let _ = write!(text, "({})", self.exprs(&call.args));
        }
        text
    }

    fn var_ref(&self, var: &VarRef) -> String {
        if var.subscripts.is_empty() {
            var.ident.to_string()
        } else {
            format!("{}[{}]", var.ident, self.exprs(&var.subscripts))
        }
    }

    fn exprs(&self, exprs: &[Expr]) -> String {
        exprs.iter().map(|e| self.expr(e)).collect::<Vec<_>>().join(", ")
    }

    pub fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary(bin) => {
                let prec = bin.op.precedence();
                let left = self.operand(&bin.left, |p| p < prec);
                let right = self.operand(&bin.right, |p| p <= prec);
                if bin.op.is_tight() {
                    format!("{left}{}{right}", bin.op)
                } else {
                    format!("{left} {} {right}", bin.op)
                }
            }
            Expr::Unary(un) => {
                if un.op == UnaryOp::Neg && un.operand.is_int(i32::MIN) {
                    return "080000000h".to_string();
                }
                let operand = match &un.operand {
                    Expr::Unary(_) => self.expr(&un.operand),
                    other => self.operand(other, |_| true),
                };
                match un.op {
                    UnaryOp::Neg => format!("-{operand}"),
                    op => format!("{op} {operand}"),
                }
            }
            Expr::Integer(lit) if lit.value == i32::MIN => "080000000h".to_string(),
            Expr::Integer(lit) => lit.value.to_string(),
            Expr::Real(lit) => {
                let text = lit.value.normalize().to_string();
                if text.contains('.') { text } else { format!("{text}.0") }
            }
            Expr::String(lit) => lit.raw.clone(),
            Expr::Boolean(lit) => if lit.value { "9=9" } else { "9=0" }.to_string(),
            Expr::Var(var) => self.var_ref(var),
            Expr::Call(call) => self.call(call),
            Expr::RawArray(raw) => format!("({})", raw.text),
        }
    }

    /// An operand, parenthesized when `needs` holds for its precedence.
    fn operand(&self, expr: &Expr, needs: impl Fn(u8) -> bool) -> String {
        let prec = match expr {
            Expr::Binary(bin) => Some(bin.op.precedence()),
            Expr::Unary(un) => Some(un.op.precedence()),
            Expr::Boolean(_) => Some(BOOLEAN_PRECEDENCE),
            _ => None,
        };
        let text = self.expr(expr);
        match prec {
            Some(p) if needs(p) => format!("({text})"),
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksp_parser::{LineMap, Parser};

    fn emit(source: &str, options: &CompileOptions) -> String {
        let builtins = Builtins::standard();
        let module = Parser::parse(source, &LineMap::single(None)).expect("parse");
        Emitter::new(&builtins, options).emit_module(&module)
    }

    fn emit_expr(text: &str) -> String {
        let out = emit(&format!("on init\n  $x := {text}\nend on"), &CompileOptions::default());
        out.trim_start_matches("on init\n$x := ")
            .trim_end_matches("\nend on\n")
            .to_string()
    }

    #[test]
    fn minimal_parentheses() {
        assert_eq!(emit_expr("(1 + 2) * 3"), "(1+2)*3");
        assert_eq!(emit_expr("1 + (2 * 3)"), "1+2*3");
        assert_eq!(emit_expr("(1 - 2) - 3"), "1-2-3");
        assert_eq!(emit_expr("1 - (2 - 3)"), "1-(2-3)");
        assert_eq!(emit_expr("$a .and. ($b .or. $c)"), "$a .and. ($b .or. $c)");
        assert_eq!(emit_expr("-($a + 1)"), "-($a+1)");
        assert_eq!(emit_expr("$a mod 3"), "$a mod 3");
    }

    #[test]
    fn unary_operands_keep_their_grouping() {
        assert_eq!(emit_expr("(.not. $a) + 1"), "(.not. $a)+1");
        assert_eq!(emit_expr("-$a * 2"), "-$a*2");
        assert_eq!(emit_expr("$a * (.not. $b)"), "$a*(.not. $b)");
        assert_eq!(emit_expr("not not $b"), "not not $b");
        let out = emit("on init\n  if ((not $b) = $c)\n    $x := 1\n  end if\nend on", &CompileOptions::default());
        assert_eq!(out, "on init\nif ((not $b)=$c)\n$x := 1\nend if\nend on\n");
    }

    #[test]
    fn conditions_and_strings() {
        let out = emit(
            "on init\n  if (not ($a = 1) and $b # 2)\n    @s := \"x\" & 'y'\n  end if\nend on",
            &CompileOptions::default(),
        );
        assert_eq!(out, "on init\nif (not ($a=1) and $b # 2)\n@s := \"x\" & 'y'\nend if\nend on\n");
    }

    #[test]
    fn literals() {
        assert_eq!(emit_expr("1.50"), "1.5");
        assert_eq!(emit_expr("-2147483648"), "080000000h");
        assert_eq!(emit_expr("0x10"), "16");
    }

    #[test]
    fn indented_layout() {
        let options = CompileOptions::default().with_remove_whitespace(false);
        let out = emit(
            "on init\n  declare %t[2] := (1, 2)\n  select ($a)\n    case 1 to 2\n      $b := 1\n  end select\nend on\n\
             function f\n  while ($a < 3)\n    inc($a)\n  end while\nend function",
            &options,
        );
        assert_eq!(
            out,
            "on init\n  declare %t[2] := (1, 2)\n  select ($a)\n    case 1 to 2\n      $b := 1\n  end select\nend on\n\n\
             function f\n  while ($a<3)\n    inc($a)\n  end while\nend function\n\n"
        );
    }

    #[test]
    fn calls_and_declarations() {
        let out = emit(
            "on ui_control ($knob)\n  declare ui_knob $k(0, 100, 1)\n  call reset\n  exit\n  message(\"\")\nend on",
            &CompileOptions::default(),
        );
        assert_eq!(
            out,
            "on ui_control($knob)\ndeclare ui_knob $k(0, 100, 1)\ncall reset\nexit\nmessage(\"\")\nend on\n"
        );
    }

    #[test]
    fn else_branches() {
        let out = emit(
            "on init\n  if ($a = 1)\n    $b := 1\n  else\n    $b := 2\n  end if\nend on",
            &CompileOptions::default(),
        );
        assert_eq!(out, "on init\nif ($a=1)\n$b := 1\nelse\n$b := 2\nend if\nend on\n");
    }
}
