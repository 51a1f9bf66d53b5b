//! Built-in engine symbols.
//!
//! The tables are loaded from a sectioned text file:
//!
//! ```text
//! [variables]
//! $EVENT_NOTE
//! [functions]
//! play_note(integer, integer, integer, integer):integer
//! ```
//!
//! [`Builtins::standard`] parses the file embedded in this crate. Lookups are
//! by exact name; variable names include their sigil.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

const STANDARD: &str = include_str!("../data/builtins.txt");

/// Functions whose first argument is a raw key or condition name and must
/// not be resolved as a variable reference.
const RAW_FIRST_ARGUMENT: &[&str] = &[
    "SET_CONDITION",
    "RESET_CONDITION",
    "USE_CODE_IF",
    "USE_CODE_IF_NOT",
    "_pgs_create_key",
    "_pgs_key_exists",
    "_pgs_set_key_val",
    "_pgs_get_key_val",
    "pgs_create_key",
    "pgs_key_exists",
    "pgs_set_key_val",
    "pgs_get_key_val",
    "pgs_create_str_key",
    "pgs_str_key_exists",
    "pgs_set_str_key_val",
    "pgs_get_str_key_val",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinsError {
    #[error("line {line}: entry outside of any section")]
    NoSection { line: usize },

    #[error("line {line}: unknown section [{name}]")]
    UnknownSection { name: String, line: usize },

    #[error("line {line}: malformed function signature '{text}'")]
    MalformedSignature { text: String, line: usize },
}

/// Parameter and return types of a built-in function, as written in the data file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<String>,
    pub returns: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Builtins {
    variables: FxHashSet<String>,
    functions: FxHashMap<String, Signature>,
    keywords: FxHashSet<String>,
    callbacks: FxHashSet<String>,
    forced_parentheses: FxHashSet<String>,
    constant_return: FxHashSet<String>,
    /// Variables, function names and keywords.
    all: FxHashSet<String>,
    /// `all` with sigils removed.
    all_unprefixed: FxHashSet<String>,
}

#[derive(Clone, Copy)]
enum Section {
    Variables,
    Functions,
    Keywords,
    Callbacks,
    ForcedParentheses,
    ConstantReturn,
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "variables" => Section::Variables,
            "functions" => Section::Functions,
            "keywords" => Section::Keywords,
            "callbacks" => Section::Callbacks,
            "functions_with_forced_parentheses" => Section::ForcedParentheses,
            "functions_with_constant_return" => Section::ConstantReturn,
            _ => return None,
        })
    }
}

impl Builtins {
    /// The tables shipped with the compiler.
    pub fn standard() -> Self {
        match Self::parse(STANDARD) {
            Ok(builtins) => builtins,
            Err(err) => {
                tracing::error!(%err, "embedded builtins table is malformed");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, BuiltinsError> {
        let mut builtins = Self::default();
        let mut section = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                section = Some(Section::from_name(name).ok_or_else(|| {
                    BuiltinsError::UnknownSection {
                        name: name.to_string(),
                        line: line_no,
                    }
                })?);
                continue;
            }

            match section.ok_or(BuiltinsError::NoSection { line: line_no })? {
                Section::Variables => {
                    builtins.variables.insert(line.to_string());
                }
                Section::Functions => {
                    let (name, signature) = parse_signature(line).ok_or_else(|| {
                        BuiltinsError::MalformedSignature {
                            text: line.to_string(),
                            line: line_no,
                        }
                    })?;
                    builtins.functions.insert(name, signature);
                }
                Section::Keywords => {
                    builtins.keywords.insert(line.to_string());
                }
                Section::Callbacks => {
                    builtins.callbacks.insert(line.to_string());
                }
                Section::ForcedParentheses => {
                    builtins.forced_parentheses.insert(line.to_string());
                }
                Section::ConstantReturn => {
                    builtins.constant_return.insert(line.to_string());
                }
            }
        }

        builtins.keywords.insert("async_complete".to_string());
        builtins.rebuild_indexes();
        Ok(builtins)
    }

    fn rebuild_indexes(&mut self) {
        self.all = self
            .variables
            .iter()
            .chain(self.functions.keys())
            .chain(self.keywords.iter())
            .cloned()
            .collect();
        self.all_unprefixed = self
            .all
            .iter()
            .map(|name| ksp_core::Sigil::split(name).1.to_string())
            .collect();
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.keywords.contains(name)
    }

    pub fn is_callback(&self, name: &str) -> bool {
        self.callbacks.contains(name)
    }

    /// Whether `name` (sigil included) names any built-in symbol.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.all.contains(name)
    }

    /// Whether `name` matches a built-in symbol once sigils are ignored.
    pub fn is_builtin_unprefixed(&self, name: &str) -> bool {
        self.all_unprefixed.contains(name)
    }

    pub fn forces_parentheses(&self, name: &str) -> bool {
        self.forced_parentheses.contains(name)
    }

    pub fn has_constant_return(&self, name: &str) -> bool {
        self.constant_return.contains(name)
    }

    /// Whether the first argument of `name` is left unresolved.
    pub fn keeps_first_argument(&self, name: &str) -> bool {
        RAW_FIRST_ARGUMENT.contains(&name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }
}

/// `name(param, ...):return` with both the parameter list and the return type optional.
fn parse_signature(line: &str) -> Option<(String, Signature)> {
    let (head, returns) = match line.rsplit_once(':') {
        Some((head, ret)) if !ret.contains(')') => (head, Some(ret.trim().to_string())),
        _ => (line, None),
    };

    let (name, params) = match head.split_once('(') {
        Some((name, rest)) => {
            let inner = rest.trim_end().strip_suffix(')')?;
            let params = inner
                .split(',')
                .map(|p| p.trim().trim_matches(|c| c == '<' || c == '>'))
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            (name.trim(), params)
        }
        None => (head.trim(), Vec::new()),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_string(), Signature { params, returns }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tables_load() {
        let builtins = Builtins::standard();
        assert!(builtins.is_builtin("$EVENT_NOTE"));
        assert!(builtins.is_function("play_note"));
        assert!(builtins.is_keyword("async_complete"));
        assert!(builtins.is_callback("ui_control"));
        assert!(builtins.has_constant_return("by_marks"));
        assert_eq!(builtins.signature("play_note").map(|s| s.params.len()), Some(4));
    }

    #[test]
    fn unprefixed_lookup() {
        let builtins = Builtins::standard();
        assert!(builtins.is_builtin("%CC"));
        assert!(!builtins.is_builtin("CC"));
        assert!(builtins.is_builtin_unprefixed("CC"));
        assert!(builtins.is_builtin_unprefixed("message"));
    }

    #[test]
    fn signatures() {
        let (name, sig) = parse_signature("get_control_par(integer, integer):integer").expect("valid");
        assert_eq!(name, "get_control_par");
        assert_eq!(sig.params, vec!["integer", "integer"]);
        assert_eq!(sig.returns.as_deref(), Some("integer"));

        let (name, sig) = parse_signature("exit").expect("valid");
        assert_eq!(name, "exit");
        assert!(sig.params.is_empty() && sig.returns.is_none());

        assert!(parse_signature("bad name()").is_none());
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            Builtins::parse("$X").unwrap_err(),
            BuiltinsError::NoSection { line: 1 }
        );
        assert!(matches!(
            Builtins::parse("[things]\nx").unwrap_err(),
            BuiltinsError::UnknownSection { .. }
        ));
    }

    #[test]
    fn raw_first_argument() {
        let builtins = Builtins::standard();
        assert!(builtins.keeps_first_argument("SET_CONDITION"));
        assert!(!builtins.keeps_first_argument("message"));
    }
}
