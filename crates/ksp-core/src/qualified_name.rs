use std::fmt;

/// A name qualified by the chain of namespaces it was imported under.
///
/// KSP has no namespace syntax of its own; a namespace is introduced when
/// one file imports another under an alias. Qualified names join the chain
/// with `.` and keep any type sigil in front.
///
/// # Examples
///
/// ```
/// use ksp_core::QualifiedName;
///
/// let plain = QualifiedName::global("$volume");
/// assert_eq!(plain.to_string(), "$volume");
///
/// let nested = QualifiedName::new("$volume", vec!["synth".into(), "env".into()]);
/// assert_eq!(nested.to_string(), "$synth.env.volume");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Simple name, possibly starting with a sigil (e.g. "$volume", "update")
    pub name: String,
    /// Namespace path (e.g. ["synth", "env"]), empty for the global namespace
    pub namespace: Vec<String>,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>, namespace: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Vec::new(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            return write!(f, "{}", self.name);
        }
        let (sigil, bare) = crate::Sigil::split(&self.name);
        if let Some(sigil) = sigil {
            write!(f, "{sigil}")?;
        }
        write!(f, "{}.{}", self.namespace.join("."), bare)
    }
}

/// The part of a dotted name before the first dot (`fam` in `fam.x`).
pub fn first_part(name: &str) -> &str {
    match name.find('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// The remainder of a dotted name from the first dot on (`.x` in `fam.x`).
pub fn last_part(name: &str) -> &str {
    match name.find('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}
