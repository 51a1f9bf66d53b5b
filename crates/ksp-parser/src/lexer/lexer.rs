//! Main lexer implementation for KSP.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s using
//! direct dispatch on the first character. Statements are line-oriented, so
//! newlines are significant: runs of blank lines collapse into a single
//! [`TokenKind::Newline`] and a trailing `...` joins the next line.

use ksp_core::{LexError, Sigil, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{BITWISE_OPERATORS, Token, TokenKind, lookup_keyword};

/// Lexer for KSP source code.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    /// Accumulated errors.
    errors: Vec<LexError>,
    /// The last emitted token was a newline (or nothing was emitted yet).
    at_line_start: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            errors: Vec::new(),
            at_line_start: true,
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        loop {
            self.skip_trivia();

            if self.cursor.is_eof() {
                return self.make_eof();
            }

            if self.cursor.peek() == Some('\n') {
                let start = self.cursor.offset();
                let (line, col) = (self.cursor.line(), self.cursor.column());
                self.cursor.advance();
                if self.at_line_start {
                    continue;
                }
                self.at_line_start = true;
                return Token::new(
                    TokenKind::Newline,
                    self.cursor.slice_from(start),
                    Span::new(line, col, 1),
                );
            }

            let token = self.scan_token();
            self.at_line_start = false;
            return token;
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    fn scan_token(&mut self) -> Token<'src> {
        let start_line = self.cursor.line();
        let start_col = self.cursor.column();
        let start_offset = self.cursor.offset();

        let Some(first) = self.cursor.peek() else {
            return self.make_eof();
        };

        match first {
            '"' | '\'' => self.scan_string(first, start_line, start_col, start_offset),

            c if c.is_ascii_digit() => self.scan_number(start_line, start_col, start_offset),

            c if is_ident_start(c) => self.scan_identifier(start_line, start_col, start_offset),

            c if Sigil::from_char(c).is_some()
                && self.cursor.peek_nth(1).is_some_and(is_ident_continue) =>
            {
                self.scan_identifier(start_line, start_col, start_offset)
            }

            _ => self.scan_operator(start_line, start_col, start_offset),
        }
    }

    /// Skip spaces, comments and `...` line continuations. Stops at newlines.
    fn skip_trivia(&mut self) {
        if self.cursor.check_str("\u{FEFF}") {
            self.cursor.advance_bytes(3);
        }

        loop {
            match self.cursor.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.cursor.advance();
                }
                Some('{') => self.skip_block_comment("{", "}"),
                Some('/') if self.cursor.check_str("/*") => self.skip_block_comment("/*", "*/"),
                Some('/') if self.cursor.check_str("//") => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('.') if self.cursor.check_str("...") => {
                    self.cursor.advance_bytes(3);
                    self.skip_continuation();
                }
                _ => break,
            }
        }
    }

    /// After `...`: skip the rest of the line including its newline.
    fn skip_continuation(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.cursor.advance();
                }
                Some('{') => self.skip_block_comment("{", "}"),
                Some('/') if self.cursor.check_str("/*") => self.skip_block_comment("/*", "*/"),
                Some('/') if self.cursor.check_str("//") => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('\n') => {
                    self.cursor.advance();
                    return;
                }
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self, open: &str, close: &str) {
        let span = Span::new(self.cursor.line(), self.cursor.column(), open.len() as u32);
        self.cursor.advance_bytes(open.len());
        while !self.cursor.is_eof() {
            if self.cursor.check_str(close) {
                self.cursor.advance_bytes(close.len());
                return;
            }
            self.cursor.advance();
        }
        self.errors.push(LexError::UnterminatedComment { span });
    }

    fn make_eof(&self) -> Token<'src> {
        Token::new(
            TokenKind::Eof,
            "",
            Span::point(self.cursor.line(), self.cursor.column()),
        )
    }

    fn make_token(&self, kind: TokenKind, line: u32, col: u32, start_offset: u32) -> Token<'src> {
        let lexeme = self.cursor.slice_from(start_offset);
        Token::new(kind, lexeme, Span::new(line, col, lexeme.len() as u32))
    }

    // =========================================
    // Scanning: Identifiers
    // =========================================

    /// Scan `[sigil]name(.name)*`. Dotted parts stop before a `.and.`-style operator.
    fn scan_identifier(&mut self, line: u32, col: u32, start: u32) -> Token<'src> {
        let has_sigil = self.cursor.check(|c| Sigil::from_char(c).is_some());
        if has_sigil {
            self.cursor.advance();
        }
        self.cursor.eat_while(is_ident_continue);

        let mut dotted = false;
        while self.cursor.peek() == Some('.')
            && self.cursor.peek_nth(1).is_some_and(is_ident_continue)
            && self.at_bitwise_operator().is_none()
        {
            self.cursor.advance();
            self.cursor.eat_while(is_ident_continue);
            dotted = true;
        }

        let text = self.cursor.slice_from(start);
        let kind = if has_sigil || dotted {
            TokenKind::Identifier
        } else {
            lookup_keyword(text).unwrap_or(TokenKind::Identifier)
        };
        self.make_token(kind, line, col, start)
    }

    fn at_bitwise_operator(&self) -> Option<TokenKind> {
        BITWISE_OPERATORS
            .iter()
            .find(|(text, _)| self.cursor.check_str_ignore_case(text))
            .map(|(_, kind)| *kind)
    }

    // =========================================
    // Scanning: Numbers
    // =========================================

    /// Scan `123`, `1.5`, `1.5e3`, `0x1F` or `01Fh`.
    fn scan_number(&mut self, line: u32, col: u32, start: u32) -> Token<'src> {
        if self.cursor.check_str("0x") || self.cursor.check_str("0X") {
            self.cursor.advance_bytes(2);
            let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit());
            if digits.is_empty() || self.cursor.check(is_ident_continue) {
                return self.invalid_number(line, col, start, "malformed hexadecimal literal");
            }
            return self.make_token(TokenKind::HexLiteral, line, col, start);
        }

        let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit());

        if self.cursor.check(|c| c == 'h' || c == 'H')
            && !self.cursor.peek_nth(1).is_some_and(is_ident_continue)
        {
            self.cursor.advance();
            return self.make_token(TokenKind::HexLiteral, line, col, start);
        }

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            self.cursor.eat_while(is_ident_continue);
            return self.invalid_number(line, col, start, "unexpected letters in number");
        }

        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            if self.cursor.check(|c| c == 'e' || c == 'E') {
                let signed = matches!(self.cursor.peek_nth(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    self.cursor.advance_bytes(digit_at);
                    self.cursor.eat_while(|c| c.is_ascii_digit());
                }
            }
            if self.cursor.check(is_ident_continue) {
                self.cursor.eat_while(is_ident_continue);
                return self.invalid_number(line, col, start, "unexpected letters in number");
            }
            return self.make_token(TokenKind::RealLiteral, line, col, start);
        }

        if self.cursor.check(is_ident_continue) {
            self.cursor.eat_while(is_ident_continue);
            return self.invalid_number(line, col, start, "unexpected letters in number");
        }

        self.make_token(TokenKind::IntLiteral, line, col, start)
    }

    fn invalid_number(&mut self, line: u32, col: u32, start: u32, detail: &str) -> Token<'src> {
        let token = self.make_token(TokenKind::Error, line, col, start);
        self.errors.push(LexError::InvalidNumber {
            span: token.span,
            detail: detail.to_string(),
        });
        token
    }

    // =========================================
    // Scanning: Strings
    // =========================================

    fn scan_string(&mut self, quote: char, line: u32, col: u32, start: u32) -> Token<'src> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let token = self.make_token(TokenKind::Error, line, col, start);
                    self.errors.push(LexError::UnterminatedString { span: token.span });
                    return token;
                }
                Some('\\') => {
                    self.cursor.advance();
                    if self.cursor.peek().is_some_and(|c| c != '\n') {
                        self.cursor.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.cursor.advance();
                    return self.make_token(TokenKind::StringLiteral, line, col, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    // =========================================
    // Scanning: Operators
    // =========================================

    fn scan_operator(&mut self, line: u32, col: u32, start: u32) -> Token<'src> {
        if let Some(kind) = self.at_bitwise_operator() {
            self.cursor.advance_bytes(kind_len(kind));
            return self.make_token(kind, line, col, start);
        }

        let Some(ch) = self.cursor.advance() else {
            return self.make_eof();
        };

        let kind = match ch {
            ':' if self.cursor.eat('=') => TokenKind::Assign,
            '-' if self.cursor.eat('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '&' => TokenKind::Amp,
            '=' => TokenKind::Equal,
            '#' => TokenKind::NotEqual,
            '<' if self.cursor.eat('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.cursor.eat('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            other => {
                let token = self.make_token(TokenKind::Error, line, col, start);
                self.errors.push(LexError::UnexpectedChar {
                    ch: other,
                    span: token.span,
                });
                return token;
            }
        };
        self.make_token(kind, line, col, start)
    }
}

fn kind_len(kind: TokenKind) -> usize {
    match kind {
        TokenKind::BitOr => 4,
        _ => 5,
    }
}

/// Lex a whole source text. A non-empty token list always ends with a newline and EOF.
pub fn tokenize(source: &str) -> (Vec<Token<'_>>, Vec<LexError>) {
    let mut lexer = Lexer::new(source);
    let mut tokens: Vec<Token<'_>> = Vec::new();
    loop {
        let token = lexer.next_token();
        let kind = token.kind;
        if kind == TokenKind::Eof && tokens.last().is_some_and(|t| t.kind != TokenKind::Newline) {
            tokens.push(Token::new(TokenKind::Newline, "", token.span));
        }
        tokens.push(token);
        if kind == TokenKind::Eof {
            break;
        }
    }
    (tokens, lexer.take_errors())
}
