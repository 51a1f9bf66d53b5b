//! Namespace qualification of identifiers.
//!
//! A name written on a line that came from an imported file gets the
//! namespace chain of that line in front of it. Built-in names, keywords and
//! the current function's parameters are left alone, and an identifier that
//! has been qualified once is never qualified again.

use ksp_core::{QualifiedName, first_part};
use ksp_parser::ast::Ident;

use crate::context::CompilationContext;

impl CompilationContext<'_> {
    /// Qualify `ident` with the namespaces of the line it appears on.
    ///
    /// `params` are the parameter names of the enclosing function, as written.
    pub fn qualify(&self, ident: Ident, params: &[String]) -> Ident {
        if ident.qualified {
            return ident;
        }
        let namespaces = self.lines.namespaces(ident.span.line);
        if namespaces.is_empty() || self.keeps_name(&ident, params) {
            return mark_qualified(ident);
        }
        prefixed(ident, namespaces)
    }

    /// Qualify a declared name unconditionally.
    pub fn qualify_declared(&self, ident: Ident) -> Ident {
        if ident.qualified {
            return ident;
        }
        let namespaces = self.lines.namespaces(ident.span.line);
        if namespaces.is_empty() {
            return mark_qualified(ident);
        }
        prefixed(ident, namespaces)
    }

    fn keeps_name(&self, ident: &Ident, params: &[String]) -> bool {
        let name = ident.name.as_str();
        if self.builtins.is_function(name) {
            return !self.functions_before_prefix.contains(name);
        }
        self.builtins.is_builtin_unprefixed(name)
            || self.builtins.is_keyword(name)
            || params.iter().any(|p| p == first_part(&ident.full()))
    }
}

/// `ns.name` for the namespace chain `namespace`, keeping the sigil in front.
pub fn prefixed(ident: Ident, namespace: &[String]) -> Ident {
    let name = QualifiedName::new(ident.name.clone(), namespace.to_vec()).to_string();
    let mut out = ident.renamed(ident.sigil, name);
    out.qualified = true;
    out
}

fn mark_qualified(mut ident: Ident) -> Ident {
    ident.qualified = true;
    ident
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksp_core::{Sigil, Span};
    use ksp_parser::LineMap;
    use ksp_registry::Builtins;

    fn lib_lines() -> LineMap {
        let mut lines = LineMap::new();
        lines
            .push_lines(1, Some("main.ksp"), &[])
            .push_lines(5, Some("lib.ksp"), &["lib".to_string(), "env".to_string()]);
        lines
    }

    fn at(text: &str, line: u32) -> Ident {
        Ident::parse(text, Span::new(line, 1, text.len() as u32))
    }

    #[test]
    fn names_on_imported_lines_get_the_chain() {
        let builtins = Builtins::standard();
        let lines = lib_lines();
        let ctx = CompilationContext::new(&builtins, &lines);

        let q = ctx.qualify(at("$gain", 2), &[]);
        assert_eq!(q.full(), "$lib.env.gain");
        assert!(q.qualified);

        let global = ctx.qualify(at("$gain", 1), &[]);
        assert_eq!(global.full(), "$gain");
    }

    #[test]
    fn qualifying_twice_is_a_no_op() {
        let builtins = Builtins::standard();
        let lines = lib_lines();
        let ctx = CompilationContext::new(&builtins, &lines);
        let once = ctx.qualify(at("gain", 3), &[]);
        let twice = ctx.qualify(once.clone(), &[]);
        assert_eq!(once, twice);
    }

    #[test]
    fn builtins_params_and_keywords_stay() {
        let builtins = Builtins::standard();
        let lines = lib_lines();
        let ctx = CompilationContext::new(&builtins, &lines);

        assert_eq!(ctx.qualify(at("play_note", 2), &[]).name, "play_note");
        assert_eq!(ctx.qualify(at("$EVENT_NOTE", 2), &[]).name, "EVENT_NOTE");
        assert_eq!(ctx.qualify(at("declare", 2), &[]).name, "declare");
        assert_eq!(ctx.qualify(at("x.field", 2), &["x".to_string()]).name, "x.field");
    }

    #[test]
    fn user_function_named_like_a_builtin_is_prefixed() {
        let builtins = Builtins::standard();
        let lines = lib_lines();
        let mut ctx = CompilationContext::new(&builtins, &lines);
        ctx.functions_before_prefix.insert("play_note".to_string());
        assert_eq!(ctx.qualify(at("play_note", 2), &[]).name, "lib.env.play_note");
    }

    #[test]
    fn declared_names_are_always_prefixed() {
        let builtins = Builtins::standard();
        let lines = lib_lines();
        let ctx = CompilationContext::new(&builtins, &lines);
        let q = ctx.qualify_declared(at("%EVENT_NOTE", 4));
        assert_eq!(q.sigil, Some(Sigil::IntegerArray));
        assert_eq!(q.name, "lib.env.EVENT_NOTE");
    }
}
