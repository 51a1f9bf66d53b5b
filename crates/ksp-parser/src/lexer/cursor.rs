//! Character cursor for the lexer.
//!
//! Positions are tracked as a byte offset plus a 1-based line and byte
//! column, which is what [`Span`](ksp_core::Span) records.

pub struct Cursor<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn remaining(&self) -> &'src str {
        &self.source[self.pos..]
    }

    pub fn offset(&self) -> u32 {
        u32::try_from(self.pos).unwrap_or(u32::MAX)
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// The character `n` places ahead; `peek_nth(0)` is `peek()`.
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    pub fn check(&self, pred: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(pred)
    }

    pub fn check_str(&self, text: &str) -> bool {
        self.remaining().starts_with(text)
    }

    /// Like [`check_str`](Self::check_str), ignoring ASCII case (`.AND.`).
    pub fn check_str_ignore_case(&self, text: &str) -> bool {
        self.remaining()
            .get(..text.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(text))
    }

    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        let width = ch.len_utf8();
        self.pos += width;
        match ch {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += width as u32,
        }
        Some(ch)
    }

    /// Skip `n` bytes of source, keeping line and column up to date.
    pub fn advance_bytes(&mut self, n: usize) {
        let end = (self.pos + n).min(self.source.len());
        while self.pos < end && self.advance().is_some() {}
    }

    pub fn eat(&mut self, expected: char) -> bool {
        let matched = self.peek() == Some(expected);
        if matched {
            self.advance();
        }
        matched
    }

    /// Consume while `pred` holds and return what was consumed.
    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'src str {
        let start = self.pos;
        while self.check(&pred) {
            self.advance();
        }
        &self.source[start..self.pos]
    }

    pub fn slice_from(&self, start: u32) -> &'src str {
        self.source.get(start as usize..self.pos).unwrap_or("")
    }
}

pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

pub fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}
