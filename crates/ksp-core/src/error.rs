//! Unified error types for the KSP compiler.
//!
//! ## Error Hierarchy
//!
//! ```text
//! KspError (top-level wrapper)
//! ├── ParseErrors    - one or more ParseError (lexing and grammar)
//! ├── CompileError   - lowering errors, grouped by ErrorCategory
//! └── Cancelled      - the caller aborted the pipeline
//! ```
//!
//! Every error carries a [`Location`] with the file, position and inlining
//! trace of the offending node. Formatting for humans is left to the caller;
//! the `Display` impls give a single-line summary.

use thiserror::Error;

use crate::{Location, Sigil, Span};

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during tokenization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedComment { span } => *span,
            LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The lexer rejected the input.
    InvalidToken,
    /// A specific token was expected but not found.
    ExpectedToken,
    /// Unexpected end of file.
    UnexpectedEof,
    /// An expression was expected.
    ExpectedExpression,
    /// A statement was expected.
    ExpectedStatement,
    /// A top-level block (`on`, `function`, `taskfunc`) was expected.
    ExpectedBlock,
    /// A closing `end ...` did not match its opening keyword.
    MismatchedEnd,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidToken => "invalid token",
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedBlock => "expected callback or function",
            ParseErrorKind::MismatchedEnd => "mismatched end",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {loc}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub loc: Location,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, loc: Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            loc,
            message: message.into(),
        }
    }

    pub fn expected_token(loc: Location, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            loc,
            format!("expected {expected}, found {found}"),
        )
    }
}

/// A collection of parse errors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn first(&self) -> Option<&ParseError> {
        self.errors.first()
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

// ============================================================================
// Compile Errors
// ============================================================================

/// The error taxonomy of the lowering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Names that cannot be bound: undeclared, ambiguous, duplicated.
    Resolution,
    /// Constructs used in a shape the target dialect cannot express.
    Contract,
    /// Illegal recursion, either during inlining or among explicit calls.
    Graph,
    /// Identifier compaction could not produce an injective mapping.
    Resource,
    /// A broken internal invariant.
    Internal,
}

/// Errors raised by the lowering passes.
///
/// All of them abort the compilation; none is recovered from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    // ---- Resolution ----
    #[error("at {loc}: {name} has not been declared")]
    UndeclaredName { name: String, loc: Location },

    #[error("at {loc}: type of {name} is ambiguous, its sigil could be any of: {candidates}")]
    AmbiguousType {
        name: String,
        candidates: String,
        loc: Location,
    },

    #[error("at {loc}: function {name} already declared")]
    DuplicateFunction { name: String, loc: Location },

    #[error("at {loc}: local variable {name} redeclared")]
    LocalRedeclared { name: String, loc: Location },

    #[error("at {loc}: function {function} has duplicate parameter names")]
    DuplicateParameter { function: String, loc: Location },

    #[error("at {loc}: {name} is declared with sigil '{declared}' but used with '{used}'")]
    SigilConflict {
        name: String,
        declared: Sigil,
        used: Sigil,
        loc: Location,
    },

    #[error("at {loc}: unknown function {name}")]
    UnknownFunction { name: String, loc: Location },

    // ---- Contract ----
    #[error("at {loc}: expected property function named 'get' or 'set', found '{found}'")]
    InvalidAccessor { found: String, loc: Location },

    #[error("at {loc}: property {property} defines neither a 'get' nor a 'set' function")]
    MissingAccessors { property: String, loc: Location },

    #[error("at {loc}: the 'get' function of property {property} needs a return value")]
    GetterWithoutResult { property: String, loc: Location },

    #[error("at {loc}: the 'set' function of property {property} cannot have a return value")]
    SetterWithResult { property: String, loc: Location },

    #[error("at {loc}: the 'set' function of property {property} needs at least one parameter")]
    SetterWithoutParameter { property: String, loc: Location },

    #[error("at {loc}: property {property} has no get function and cannot be read")]
    PropertyNotReadable { property: String, loc: Location },

    #[error("at {loc}: property {property} has no set function and is read-only")]
    PropertyReadOnly { property: String, loc: Location },

    #[error("at {loc}: wrong number of parameters for {function}(), expected {expected}, got {got}")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        got: usize,
        loc: Location,
    },

    #[error("at {loc}: function {function} does not return a value and cannot be used in an expression")]
    NoReturnValue { function: String, loc: Location },

    #[error("at {loc}: taskfunc {function} must be the only thing on the right-hand side of an assignment")]
    TaskfuncInExpression { function: String, loc: Location },

    #[error("at {loc}: 'call' of {function} is not allowed inside the init callback")]
    CallInInit { function: String, loc: Location },

    #[error("at {loc}: function {function} has parameters and cannot be invoked with 'call'")]
    CallWithParameters { function: String, loc: Location },

    #[error("at {loc}: 'call' of {function} cannot be used inside an expression")]
    CallInExpression { function: String, loc: Location },

    #[error("at {loc}: function {function} must consist of a single 'result := <expr>' line to be used in an expression")]
    NotSingleAssignment { function: String, loc: Location },

    #[error("at {loc}: the left-hand side of an assignment must be a variable reference")]
    AssignTargetNotVariable { loc: Location },

    #[error("at {loc}: too many subscripts on {name}, an array takes at most one")]
    TooManySubscripts { name: String, loc: Location },

    #[error("at {loc}: parameter {parameter} is called as a function but its argument is not a function name")]
    FunctionNameExpected { parameter: String, loc: Location },

    #[error("at {loc}: {function} cannot be used as an argument of {caller}")]
    InvalidEventParArgument {
        function: String,
        caller: String,
        loc: Location,
    },

    // ---- Graph ----
    #[error("at {loc}: recursive call not allowed: {chain}")]
    RecursiveCall { chain: String, loc: Location },

    #[error("recursion detected: {cycle}")]
    RecursionDetected { cycle: String },

    // ---- Resource ----
    #[error("compacting {name} produced {short}, which is a built-in name")]
    BuiltinCollision { name: String, short: String },

    #[error("compacting {first} and {second} both produced {short}")]
    CompactionCollision {
        first: String,
        second: String,
        short: String,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompileError {
    pub fn category(&self) -> ErrorCategory {
        use CompileError::*;
        match self {
            UndeclaredName { .. }
            | AmbiguousType { .. }
            | DuplicateFunction { .. }
            | LocalRedeclared { .. }
            | DuplicateParameter { .. }
            | SigilConflict { .. }
            | UnknownFunction { .. } => ErrorCategory::Resolution,

            InvalidAccessor { .. }
            | MissingAccessors { .. }
            | GetterWithoutResult { .. }
            | SetterWithResult { .. }
            | SetterWithoutParameter { .. }
            | PropertyNotReadable { .. }
            | PropertyReadOnly { .. }
            | ArgumentCountMismatch { .. }
            | NoReturnValue { .. }
            | TaskfuncInExpression { .. }
            | CallInInit { .. }
            | CallWithParameters { .. }
            | CallInExpression { .. }
            | NotSingleAssignment { .. }
            | AssignTargetNotVariable { .. }
            | TooManySubscripts { .. }
            | FunctionNameExpected { .. }
            | InvalidEventParArgument { .. } => ErrorCategory::Contract,

            RecursiveCall { .. } | RecursionDetected { .. } => ErrorCategory::Graph,

            BuiltinCollision { .. } | CompactionCollision { .. } => ErrorCategory::Resource,

            Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// The location of the offending node, when the error has one.
    pub fn location(&self) -> Option<&Location> {
        use CompileError::*;
        match self {
            UndeclaredName { loc, .. }
            | AmbiguousType { loc, .. }
            | DuplicateFunction { loc, .. }
            | LocalRedeclared { loc, .. }
            | DuplicateParameter { loc, .. }
            | SigilConflict { loc, .. }
            | UnknownFunction { loc, .. }
            | InvalidAccessor { loc, .. }
            | MissingAccessors { loc, .. }
            | GetterWithoutResult { loc, .. }
            | SetterWithResult { loc, .. }
            | SetterWithoutParameter { loc, .. }
            | PropertyNotReadable { loc, .. }
            | PropertyReadOnly { loc, .. }
            | ArgumentCountMismatch { loc, .. }
            | NoReturnValue { loc, .. }
            | TaskfuncInExpression { loc, .. }
            | CallInInit { loc, .. }
            | CallWithParameters { loc, .. }
            | CallInExpression { loc, .. }
            | NotSingleAssignment { loc, .. }
            | AssignTargetNotVariable { loc }
            | TooManySubscripts { loc, .. }
            | FunctionNameExpected { loc, .. }
            | InvalidEventParArgument { loc, .. }
            | RecursiveCall { loc, .. } => Some(loc),

            RecursionDetected { .. }
            | BuiltinCollision { .. }
            | CompactionCollision { .. }
            | Internal { .. } => None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Unified Error
// ============================================================================

/// The error type returned by the compile pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KspError {
    #[error(transparent)]
    Parse(#[from] ParseErrors),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("compilation aborted")]
    Cancelled,
}

impl KspError {
    pub fn is_parse(&self) -> bool {
        matches!(self, KspError::Parse(_))
    }

    pub fn is_compile(&self) -> bool {
        matches!(self, KspError::Compile(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, KspError::Cancelled)
    }

    pub fn as_compile(&self) -> Option<&CompileError> {
        match self {
            KspError::Compile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for KspError {
    fn from(error: ParseError) -> Self {
        KspError::Parse(error.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
