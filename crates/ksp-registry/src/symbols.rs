//! Names declared by the script being compiled.

use rustc_hash::FxHashSet;

/// Declared variables, families and properties of one compilation.
///
/// Variable names are stored lower-cased with their sigil, so lookups are
/// case-insensitive the way the engine treats them.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    variables: FxHashSet<String>,
    ui_variables: FxHashSet<String>,
    families: FxHashSet<String>,
    properties: FxHashSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global variable; `name` includes its sigil.
    pub fn add_variable(&mut self, name: &str, is_ui: bool) {
        let key = name.to_lowercase();
        if is_ui {
            self.ui_variables.insert(key.clone());
        }
        self.variables.insert(key);
    }

    pub fn remove_variable(&mut self, name: &str) {
        let key = name.to_lowercase();
        self.ui_variables.remove(&key);
        self.variables.remove(&key);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains(&name.to_lowercase())
    }

    pub fn is_ui_variable(&self, name: &str) -> bool {
        self.ui_variables.contains(&name.to_lowercase())
    }

    pub fn add_family(&mut self, name: impl Into<String>) {
        self.families.insert(name.into());
    }

    pub fn is_family(&self, name: &str) -> bool {
        self.families.contains(name)
    }

    pub fn add_property(&mut self, name: impl Into<String>) {
        self.properties.insert(name.into());
    }

    pub fn is_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    /// Declared variable names in lexical order.
    pub fn sorted_variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Apply `rename` to every variable name, UI subset included.
    pub fn rename_variables(&mut self, rename: impl Fn(&str) -> String) {
        self.variables = self.variables.iter().map(|v| rename(v)).collect();
        self.ui_variables = self.ui_variables.iter().map(|v| rename(v)).collect();
    }
}
