//! Source location tracking for error reporting.
//!
//! Provides [`Span`] for token positions and [`Location`] for diagnostics that
//! need the originating file and the chain of inlined call sites.

use std::fmt;

/// Where a token or node starts, and how many bytes it covers.
///
/// Lines and columns are 1-based; columns count bytes. The end position is
/// not stored: diagnostics only ever point at the start.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub len: u32,
}

impl Span {
    pub const fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span, used for end of input.
    pub const fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    /// The smallest span covering both, when they share a line. Across lines
    /// the start of `self` is kept and the lengths are added.
    pub fn merge(self, other: Span) -> Span {
        if self.line != other.line {
            return Span::new(self.line, self.col, self.len + other.len);
        }
        let col = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, col, end - col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Where an error happened: file, position, and the call sites it was inlined through.
///
/// `trace` is ordered innermost first: the first entry is the call that inlined
/// the offending statement, the last entry is the outermost call site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: Option<String>,
    pub span: Span,
    pub trace: Vec<Span>,
}

impl Location {
    pub fn new(file: Option<String>, span: Span) -> Self {
        Self {
            file,
            span,
            trace: Vec::new(),
        }
    }

    /// A location with no file information.
    pub fn at(span: Span) -> Self {
        Self::new(None, span)
    }

    pub fn with_trace(mut self, trace: Vec<Span>) -> Self {
        self.trace = trace;
        self
    }

    /// The source line number, for callers that render diagnostics.
    pub fn line(&self) -> u32 {
        self.span.line
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}:")?;
        }
        write!(f, "{}", self.span)?;
        if !self.trace.is_empty() {
            write!(f, " (inlined from ")?;
            for (i, site) in self.trace.iter().enumerate() {
                if i > 0 {
                    write!(f, " <- ")?;
                }
                write!(f, "{site}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
