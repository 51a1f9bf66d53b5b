//! Source pragmas.
//!
//! ```text
//! { #pragma compile_with optimize_code }
//! { #pragma compile_without remove_whitespace }
//! { #pragma preserve_names $volume, ui.*, tmp* }
//! ```
//!
//! Switches are applied to the options unless `force_options` is set. For
//! each switch the first `compile_with` wins, then the first
//! `compile_without`. Preserved names written on a line that belongs to an
//! imported namespace are qualified with it.

use ksp_core::CompileError;
use ksp_parser::LineMap;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::options::CompileOptions;

struct Patterns {
    compile: Regex,
    preserve: Regex,
    separator: Regex,
}

impl Patterns {
    fn new() -> Result<Self, CompileError> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CompileError::internal(format!("pragma pattern {pattern}: {e}")))
        };
        Ok(Self {
            compile: build(r"\{\s*#pragma\s+(compile_with|compile_without)\s+(\w+)\s*\}")?,
            preserve: build(r"\{\s*#pragma\s+preserve_names\s+(.*?)\s*\}")?,
            separator: build(r"[\s,]+")?,
        })
    }
}

fn line_of(source: &str, offset: usize) -> u32 {
    let line = source[..offset].bytes().filter(|&b| b == b'\n').count() + 1;
    u32::try_from(line).unwrap_or(u32::MAX)
}

/// Apply the pragmas found in `source` to `options`.
pub fn scan_pragmas(source: &str, lines: &LineMap, options: &mut CompileOptions) -> Result<(), CompileError> {
    let patterns = Patterns::new()?;

    for caps in patterns.preserve.captures_iter(source) {
        let (Some(whole), Some(list)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let namespaces = lines.namespaces(line_of(source, whole.start()));
        let list: String = list.as_str().chars().filter(|c| !"$%@!?~".contains(*c)).collect();
        for name in patterns.separator.split(&list).filter(|n| !n.is_empty()) {
            let pattern = if namespaces.is_empty() {
                name.to_string()
            } else {
                format!("{}.{name}", namespaces.join("."))
            };
            if !options.preserve_names.contains(&pattern) {
                options.preserve_names.push(pattern);
            }
        }
    }

    if options.force_options {
        return Ok(());
    }

    let mut seen = FxHashSet::default();
    for keyword in ["compile_with", "compile_without"] {
        for caps in patterns.compile.captures_iter(source) {
            if &caps[1] != keyword {
                continue;
            }
            let name = caps[2].to_string();
            if seen.contains(&name) {
                continue;
            }
            if options.set_switch(&name, keyword == "compile_with") {
                tracing::debug!(option = %name, value = keyword == "compile_with", "pragma overrides option");
                seen.insert(name);
            } else {
                tracing::warn!(option = %name, "ignoring pragma for unknown compiler option");
            }
        }
    }
    Ok(())
}
