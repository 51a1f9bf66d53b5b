//! Compiler configuration.

/// Options controlling one compilation.
///
/// Source pragmas (`{ #pragma compile_with ... }`) may override the boolean
/// switches unless [`CompileOptions::force_options`] is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Emit without indentation.
    pub remove_whitespace: bool,
    /// Rename global variables to short hashed names.
    pub compact_variables: bool,
    /// Merge callbacks declared more than once.
    pub combine_callbacks: bool,
    /// Fold constants and drop dead branches.
    pub optimize_code: bool,
    pub indent_width: usize,
    /// Glob patterns of variable names exempt from compaction.
    pub preserve_names: Vec<String>,
    /// Ignore `compile_with`/`compile_without` pragmas.
    pub force_options: bool,
    /// File name reported in diagnostics when no line map is supplied.
    pub file_name: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            remove_whitespace: true,
            compact_variables: false,
            combine_callbacks: false,
            optimize_code: false,
            indent_width: 2,
            preserve_names: Vec::new(),
            force_options: false,
            file_name: None,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_whitespace(mut self, value: bool) -> Self {
        self.remove_whitespace = value;
        self
    }

    pub fn with_compact_variables(mut self, value: bool) -> Self {
        self.compact_variables = value;
        self
    }

    pub fn with_combine_callbacks(mut self, value: bool) -> Self {
        self.combine_callbacks = value;
        self
    }

    pub fn with_optimize_code(mut self, value: bool) -> Self {
        self.optimize_code = value;
        self
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn with_preserve_names<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preserve_names.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_force_options(mut self, value: bool) -> Self {
        self.force_options = value;
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set a boolean switch by its pragma name. Returns `false` for unknown names.
    pub fn set_switch(&mut self, name: &str, value: bool) -> bool {
        match name {
            "remove_whitespace" => self.remove_whitespace = value,
            "compact_variables" => self.compact_variables = value,
            "combine_callbacks" => self.combine_callbacks = value,
            "optimize_code" => self.optimize_code = value,
            _ => return false,
        }
        true
    }
}
