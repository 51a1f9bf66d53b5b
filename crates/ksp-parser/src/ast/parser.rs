//! Parser core: token navigation, error collection and recovery.
//!
//! The grammar itself lives in `expr_parser.rs` (Pratt expressions),
//! `stmt_parser.rs` (statements) and `decl_parser.rs` (top-level blocks).

use ksp_core::{Location, ParseError, ParseErrorKind, ParseErrors, Span};

use crate::LineMap;
use crate::lexer::{Token, TokenKind, tokenize};

use super::decl::Module;

/// Recursive-descent parser over a pre-lexed token buffer.
pub struct Parser<'src, 'm> {
    tokens: Vec<Token<'src>>,
    position: usize,
    errors: ParseErrors,
    lines: &'m LineMap,
}

impl<'src, 'm> Parser<'src, 'm> {
    pub fn new(source: &'src str, lines: &'m LineMap) -> Self {
        let (tokens, lex_errors) = tokenize(source);
        let mut errors = ParseErrors::new();
        for err in lex_errors {
            errors.push(ParseError::new(
                ParseErrorKind::InvalidToken,
                lines.location(err.span()),
                err.to_string(),
            ));
        }
        Self {
            tokens,
            position: 0,
            errors,
            lines,
        }
    }

    /// Parse a whole script.
    ///
    /// Errors are collected per top-level block; parsing resumes at the next
    /// `on`/`function`/`taskfunc` so one run reports as many as possible.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse(source: &'src str, lines: &'m LineMap) -> Result<Module, ParseErrors> {
        let mut parser = Parser::new(source, lines);
        let module = parser.parse_module();
        tracing::debug!(
            blocks = module.blocks.len(),
            errors = parser.errors.len(),
            "parsed module"
        );
        if parser.errors.is_empty() {
            Ok(module)
        } else {
            Err(parser.take_errors())
        }
    }

    pub fn take_errors(&mut self) -> ParseErrors {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn record(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    // =========================================
    // Token navigation
    // =========================================

    pub fn peek(&self) -> &Token<'src> {
        self.peek_nth(0)
    }

    /// Look `n` tokens ahead. Past the end this keeps returning EOF.
    pub fn peek_nth(&self, n: usize) -> &Token<'src> {
        let idx = (self.position + n).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    pub fn advance(&mut self) -> Token<'src> {
        let token = *self.peek();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    pub fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = *self.peek();
            Err(ParseError::expected_token(
                self.location(token.span),
                kind.description(),
                token.kind.description(),
            ))
        }
    }

    /// Require the end of the current line.
    pub fn expect_line_end(&mut self) -> Result<(), ParseError> {
        if self.eat(TokenKind::Newline).is_some() || self.is_eof() {
            Ok(())
        } else {
            let token = *self.peek();
            Err(ParseError::expected_token(
                self.location(token.span),
                TokenKind::Newline.description(),
                token.kind.description(),
            ))
        }
    }

    pub fn skip_newlines(&mut self) {
        while self.eat(TokenKind::Newline).is_some() {}
    }

    /// Current position, for backtracking.
    pub(crate) fn mark(&self) -> usize {
        self.position
    }

    pub(crate) fn reset(&mut self, mark: usize) {
        self.position = mark;
    }

    // =========================================
    // Errors
    // =========================================

    pub fn location(&self, span: Span) -> Location {
        self.lines.location(span)
    }

    pub fn error_at(&self, kind: ParseErrorKind, span: Span, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, self.location(span), message)
    }

    /// Skip to the next line that starts a top-level block.
    ///
    /// Always advances at least one token so a failing block cannot stall the parser.
    pub fn synchronize(&mut self) {
        let start = self.position;
        while !self.is_eof() {
            let at_line_start = self.position == 0
                || self
                    .tokens
                    .get(self.position - 1)
                    .is_some_and(|t| t.kind == TokenKind::Newline);
            let starts_block = matches!(
                self.peek().kind,
                TokenKind::On | TokenKind::Function | TokenKind::Taskfunc | TokenKind::Override
            );
            if at_line_start && starts_block && self.position > start {
                return;
            }
            self.advance();
        }
    }
}
