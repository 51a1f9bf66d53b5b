//! CompilationContext - the state shared by every lowering pass.
//!
//! One context lives for exactly one compilation, so no table leaks from one
//! script into the next. Passes borrow it mutably in turn.

use indexmap::IndexMap;
use ksp_core::{Location, Span};
use ksp_parser::LineMap;
use ksp_parser::ast::{FunctionDef, Stmt, VarRef};
use ksp_registry::{Builtins, CallGraph, SymbolTable};
use rustc_hash::{FxHashMap, FxHashSet};

/// A user function together with what lowering learned about its body.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub def: FunctionDef,
    /// Declarations promoted to globals, destined for the init callback.
    pub global_decls: Vec<Stmt>,
    /// Renamed local declarations, also destined for the init callback.
    pub local_decls: Vec<Stmt>,
    /// Declarations living in a taskfunc frame; they are never emitted.
    pub frame_decls: Vec<Stmt>,
    /// Local name (without sigil) to the storage that replaces it.
    pub substitutions: FxHashMap<String, VarRef>,
    /// Lower-cased local names, for redeclaration checks.
    pub locals: FxHashSet<String>,
    /// Reached from some callback.
    pub used: bool,
}

impl FunctionEntry {
    pub fn new(def: FunctionDef) -> Self {
        Self {
            def,
            global_decls: Vec::new(),
            local_decls: Vec::new(),
            frame_decls: Vec::new(),
            substitutions: FxHashMap::default(),
            locals: FxHashSet::default(),
            used: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name.name
    }
}

pub struct CompilationContext<'a> {
    pub builtins: &'a Builtins,
    pub lines: &'a LineMap,
    pub symbols: SymbolTable,
    /// User functions by resolved name, in declaration order.
    pub functions: IndexMap<String, FunctionEntry>,
    /// Function names as written, before any namespace prefix.
    pub functions_before_prefix: FxHashSet<String>,
    pub call_graph: CallGraph,
    /// Functions whose body calls `wait`.
    pub functions_invoking_wait: FxHashSet<String>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(builtins: &'a Builtins, lines: &'a LineMap) -> Self {
        Self {
            builtins,
            lines,
            symbols: SymbolTable::new(),
            functions: IndexMap::new(),
            functions_before_prefix: FxHashSet::default(),
            call_graph: CallGraph::new(),
            functions_invoking_wait: FxHashSet::default(),
        }
    }

    pub fn location(&self, span: Span, trace: &[Span]) -> Location {
        self.lines.location_with_trace(span, trace)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut FunctionEntry> {
        self.functions.get_mut(name)
    }

    pub fn is_user_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Built-in function, unless a user `override` replaces it.
    pub fn is_builtin_call(&self, name: &str) -> bool {
        self.builtins.is_function(name)
            && !self.functions.get(name).is_some_and(|f| f.def.is_override())
    }
}
