//! Per-line source metadata.
//!
//! The preprocessor that expands imports is outside this workspace; what it
//! hands over is, for each physical line of the expanded text, the file the
//! line came from and the namespace chain it was imported under. The
//! resolver prefixes names declared on a line with that chain.

use std::sync::Arc;

use ksp_core::{Location, Span};

/// Metadata for one line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineInfo {
    pub file: Option<Arc<str>>,
    pub namespaces: Vec<String>,
}

impl LineInfo {
    pub fn new(file: Option<&str>, namespaces: Vec<String>) -> Self {
        Self {
            file: file.map(Arc::from),
            namespaces,
        }
    }
}

/// Maps 1-indexed line numbers to their [`LineInfo`].
///
/// Lines past the end of the explicit table fall back to the default entry,
/// so a map built with [`LineMap::single`] covers any source.
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    lines: Vec<LineInfo>,
    fallback: LineInfo,
}

impl LineMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line belongs to `file`, in the global namespace.
    pub fn single(file: Option<&str>) -> Self {
        Self {
            lines: Vec::new(),
            fallback: LineInfo::new(file, Vec::new()),
        }
    }

    /// Append metadata for the next `count` lines.
    pub fn push_lines(&mut self, count: usize, file: Option<&str>, namespaces: &[String]) -> &mut Self {
        let info = LineInfo::new(file, namespaces.to_vec());
        self.lines.extend(std::iter::repeat_n(info, count));
        self
    }

    pub fn info(&self, line: u32) -> &LineInfo {
        (line as usize)
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .unwrap_or(&self.fallback)
    }

    pub fn namespaces(&self, line: u32) -> &[String] {
        &self.info(line).namespaces
    }

    pub fn file(&self, line: u32) -> Option<&str> {
        self.info(line).file.as_deref()
    }

    /// Build a diagnostic location for a span.
    pub fn location(&self, span: Span) -> Location {
        Location::new(self.file(span.line).map(str::to_string), span)
    }

    /// Build a diagnostic location for a statement that may have been inlined.
    pub fn location_with_trace(&self, span: Span, trace: &[Span]) -> Location {
        self.location(span).with_trace(trace.to_vec())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_covers_every_line() {
        let map = LineMap::single(Some("main.ksp"));
        assert_eq!(map.file(1), Some("main.ksp"));
        assert_eq!(map.file(500), Some("main.ksp"));
        assert!(map.namespaces(3).is_empty());
    }

    #[test]
    fn imported_lines_carry_namespaces() {
        let mut map = LineMap::new();
        map.push_lines(2, Some("main.ksp"), &[])
            .push_lines(3, Some("lib.ksp"), &["lib".to_string()]);
        assert_eq!(map.len(), 5);
        assert_eq!(map.namespaces(2), &[] as &[String]);
        assert_eq!(map.namespaces(3), &["lib".to_string()]);
        assert_eq!(map.file(5), Some("lib.ksp"));
        assert_eq!(map.file(6), None);
    }

    #[test]
    fn location_includes_file_and_trace() {
        let map = LineMap::single(Some("a.ksp"));
        let loc = map.location_with_trace(Span::new(4, 2, 1), &[Span::new(9, 1, 0)]);
        assert_eq!(loc.to_string(), "a.ksp:4:2 (inlined from 9:1)");
    }
}
