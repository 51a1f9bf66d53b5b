//! Compaction Pass - Short hashed names for declared variables.
//!
//! Every declared variable that is neither built in nor preserved is renamed
//! to its sigil followed by five characters derived from a hash of its
//! lower-cased name. The mapping is returned as a [`CompactionMap`] so that
//! text mentioning the short names can be translated back.

use ksp_core::{CompileError, Sigil};
use ksp_parser::Fold;
use ksp_parser::ast::{Ident, Module};
use regex::Regex;
use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::xxh64;

use crate::context::CompilationContext;

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz012345";

/// The short name for `name`, which includes its sigil.
pub fn compact_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let digest = xxh64(lower.as_bytes(), 0).to_le_bytes();
    let mut short = String::with_capacity(6);
    short.extend(name.chars().next().filter(|c| Sigil::from_char(*c).is_some()));
    short.extend(digest[..5].iter().map(|b| char::from(ALPHABET[usize::from(b & 0x1F)])));
    short
}

/// Original and short names, in both directions.
#[derive(Debug, Clone)]
pub struct CompactionMap {
    forward: FxHashMap<String, String>,
    reverse: FxHashMap<String, String>,
    token: Regex,
}

impl CompactionMap {
    pub fn new() -> Result<Self, CompileError> {
        let token = Regex::new(r"[$%@!?~][A-Za-z0-9_]+")
            .map_err(|e| CompileError::internal(format!("variable token pattern: {e}")))?;
        Ok(Self {
            forward: FxHashMap::default(),
            reverse: FxHashMap::default(),
            token,
        })
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// The short name of `original` (case-insensitive).
    pub fn short(&self, original: &str) -> Option<&str> {
        self.forward.get(&original.to_lowercase()).map(String::as_str)
    }

    /// Replace every short name in `text` with its original.
    pub fn expand(&self, text: &str) -> String {
        self.token
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let token = &caps[0];
                self.reverse.get(token).cloned().unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }

    fn insert(&mut self, original: &str, short: String) -> Result<(), CompileError> {
        if let Some(first) = self.reverse.get(&short) {
            return Err(CompileError::CompactionCollision {
                first: first.clone(),
                second: original.to_string(),
                short,
            });
        }
        self.reverse.insert(short.clone(), original.to_string());
        self.forward.insert(original.to_lowercase(), short);
        Ok(())
    }
}

/// `(?i)^[$%@!?~]?(a|b.*)$` from glob patterns; `None` when there are none.
fn preserve_pattern(patterns: &[String]) -> Result<Option<Regex>, CompileError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = patterns
        .iter()
        .map(|p| {
            let (_, bare) = Sigil::split(p.trim());
            regex::escape(&bare.replace('.', "__")).replace(r"\*", ".*")
        })
        .collect();
    let pattern = format!("(?i)^[$%@!?~]?({})$", alternatives.join("|"));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| CompileError::internal(format!("preserve pattern {pattern}: {e}")))
}

pub struct CompactPass<'a, 'reg> {
    ctx: &'a mut CompilationContext<'reg>,
    map: CompactionMap,
}

impl<'a, 'reg> CompactPass<'a, 'reg> {
    pub fn new(ctx: &'a mut CompilationContext<'reg>) -> Result<Self, CompileError> {
        Ok(Self {
            ctx,
            map: CompactionMap::new()?,
        })
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: Module, preserve: &[String]) -> Result<(Module, CompactionMap), CompileError> {
        let preserve = preserve_pattern(preserve)?;

        let names: Vec<String> = self.ctx.symbols.sorted_variables().into_iter().map(str::to_string).collect();
        for name in &names {
            if preserve.as_ref().is_some_and(|re| re.is_match(name)) || self.ctx.builtins.is_builtin(name) {
                continue;
            }
            let short = compact_name(name);
            if self.ctx.builtins.is_builtin(&short) {
                return Err(CompileError::BuiltinCollision {
                    name: name.clone(),
                    short,
                });
            }
            self.map.insert(name, short)?;
        }

        let module = self.fold_module(module)?;
        let map = &self.map;
        self.ctx
            .symbols
            .rename_variables(|v| map.short(v).map_or_else(|| v.to_string(), str::to_string));

        tracing::debug!(compacted = self.map.len(), "compacted variable names");
        Ok((module, self.map))
    }
}

impl Fold for CompactPass<'_, '_> {
    type Error = CompileError;

    fn fold_ident(&mut self, ident: Ident) -> Result<Ident, CompileError> {
        if ident.sigil.is_none() {
            return Ok(ident);
        }
        match self.map.short(&ident.full()) {
            Some(short) => {
                let (sigil, name) = Sigil::split(short);
                Ok(ident.renamed(sigil, name))
            }
            None => Ok(ident),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emitter;
    use crate::options::CompileOptions;
    use ksp_parser::{LineMap, Parser};
    use ksp_registry::Builtins;

    #[test]
    fn short_names_keep_the_sigil() {
        let short = compact_name("$Volume");
        assert_eq!(short.len(), 6);
        assert!(short.starts_with('$'));
        assert!(short[1..].bytes().all(|b| ALPHABET.contains(&b)));
        assert_eq!(short, compact_name("$volume"));
        assert_ne!(compact_name("%volume"), short);
    }

    #[test]
    fn expand_handles_all_digit_short_names() {
        let mut map = CompactionMap::new().expect("map");
        map.insert("$volume", "$01234".to_string()).expect("inserted");
        map.insert("%notes", "%ab1c2".to_string()).expect("inserted");
        assert_eq!(map.expand("line 3: $01234 > %ab1c2[$01234]"), "line 3: $volume > %notes[$volume]");
        assert_eq!(map.short("$Volume"), Some("$01234"));
    }

    #[test]
    fn variables_are_renamed_and_reversible() {
        let builtins = Builtins::standard();
        let lines = LineMap::single(None);
        let mut ctx = CompilationContext::new(&builtins, &lines);
        ctx.symbols.add_variable("$volume", false);
        ctx.symbols.add_variable("$keep_me", false);

        let module = Parser::parse(
            "on init\n  declare $volume\n  declare $keep_me\n  $Volume := $EVENT_NOTE + $keep_me\nend on",
            &lines,
        )
        .expect("parse");
        let preserve = vec!["keep*".to_string()];
        let (module, map) = CompactPass::new(&mut ctx)
            .expect("pass")
            .run(module, &preserve)
            .expect("compacts");
        let out = Emitter::new(&builtins, &CompileOptions::default()).emit_module(&module);

        let short = compact_name("$volume");
        assert_eq!(map.len(), 1);
        assert!(out.contains(&format!("declare {short}\n")), "{out}");
        assert!(out.contains(&format!("{short} := $EVENT_NOTE+$keep_me")), "{out}");
        assert!(!out.contains("$volume"));
        assert!(ctx.symbols.has_variable(&short));

        let restored = map.expand(&format!("error at {short} near $EVENT_NOTE"));
        assert_eq!(restored, "error at $volume near $EVENT_NOTE");
    }

    #[test]
    fn collisions_are_reported() {
        let mut map = CompactionMap::new().expect("map");
        map.insert("$a", "$aaaaa".to_string()).expect("first");
        let err = map.insert("$b", "$aaaaa".to_string()).unwrap_err();
        assert!(matches!(err, CompileError::CompactionCollision { ref first, .. } if first == "$a"));
    }

    #[test]
    fn preserve_patterns_match_any_sigil() {
        let re = preserve_pattern(&["$lib.gain".to_string(), "tmp*".to_string()])
            .expect("pattern")
            .expect("some");
        assert!(re.is_match("~lib__gain"));
        assert!(re.is_match("%TMP_values"));
        assert!(!re.is_match("$other"));
    }
}
