//! Token types for the KSP lexer.

use ksp_core::Span;
use std::fmt;

/// A token, borrowing its lexeme from the source text.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'src str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// All token types of the KSP dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Decimal integer: `42`
    IntLiteral,
    /// Hexadecimal integer: `0x1F`, `01Fh`
    HexLiteral,
    /// Real literal: `1.5`
    RealLiteral,
    /// String literal: `"text"`, `'text'`
    StringLiteral,

    // =========================================
    // Identifiers
    // =========================================
    /// Identifier with optional sigil and dotted parts: `$fam.volume`
    Identifier,

    // =========================================
    // Keywords
    // =========================================
    On,
    End,
    Function,
    Taskfunc,
    Override,
    Declare,
    Property,
    Family,
    If,
    Else,
    While,
    For,
    To,
    Downto,
    Step,
    Select,
    Case,
    Call,
    And,
    Or,
    Xor,
    Not,
    Mod,

    // =========================================
    // Operators
    // =========================================
    /// `:=`
    Assign,
    /// `->`
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    /// `&`
    Amp,
    /// `=`
    Equal,
    /// `#`
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    /// `.and.`
    BitAnd,
    /// `.or.`
    BitOr,
    /// `.xor.`
    BitXor,
    /// `.not.`
    BitNot,

    // =========================================
    // Punctuation
    // =========================================
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,

    // =========================================
    // Structure
    // =========================================
    /// End of a logical line.
    Newline,
    /// Token produced after a lex error.
    Error,
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            On | End
                | Function
                | Taskfunc
                | Override
                | Declare
                | Property
                | Family
                | If
                | Else
                | While
                | For
                | To
                | Downto
                | Step
                | Select
                | Case
                | Call
                | And
                | Or
                | Xor
                | Not
                | Mod
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::HexLiteral
                | TokenKind::RealLiteral
                | TokenKind::StringLiteral
        )
    }

    /// Human-readable description used in parse errors.
    pub fn description(self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral | HexLiteral => "integer literal",
            RealLiteral => "real literal",
            StringLiteral => "string literal",
            Identifier => "identifier",
            On => "'on'",
            End => "'end'",
            Function => "'function'",
            Taskfunc => "'taskfunc'",
            Override => "'override'",
            Declare => "'declare'",
            Property => "'property'",
            Family => "'family'",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            For => "'for'",
            To => "'to'",
            Downto => "'downto'",
            Step => "'step'",
            Select => "'select'",
            Case => "'case'",
            Call => "'call'",
            And => "'and'",
            Or => "'or'",
            Xor => "'xor'",
            Not => "'not'",
            Mod => "'mod'",
            Assign => "':='",
            Arrow => "'->'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Amp => "'&'",
            Equal => "'='",
            NotEqual => "'#'",
            Less => "'<'",
            Greater => "'>'",
            LessEqual => "'<='",
            GreaterEqual => "'>='",
            BitAnd => "'.and.'",
            BitOr => "'.or.'",
            BitXor => "'.xor.'",
            BitNot => "'.not.'",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBracket => "'['",
            RightBracket => "']'",
            Comma => "','",
            Newline => "end of line",
            Error => "invalid token",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Look up a keyword by its spelling.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "on" => On,
        "end" => End,
        "function" => Function,
        "taskfunc" => Taskfunc,
        "override" => Override,
        "declare" => Declare,
        "property" => Property,
        "family" => Family,
        "if" => If,
        "else" => Else,
        "while" => While,
        "for" => For,
        "to" => To,
        "downto" => Downto,
        "step" => Step,
        "select" => Select,
        "case" => Case,
        "call" => Call,
        "and" => And,
        "or" => Or,
        "xor" => Xor,
        "not" => Not,
        "mod" => Mod,
        _ => return None,
    })
}

/// The four dotted bitwise operators, matched case-insensitively.
pub(crate) const BITWISE_OPERATORS: [(&str, TokenKind); 4] = [
    (".and.", TokenKind::BitAnd),
    (".or.", TokenKind::BitOr),
    (".xor.", TokenKind::BitXor),
    (".not.", TokenKind::BitNot),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(lookup_keyword("taskfunc"), Some(TokenKind::Taskfunc));
        assert_eq!(lookup_keyword("downto"), Some(TokenKind::Downto));
        assert_eq!(lookup_keyword("volume"), None);
        assert!(TokenKind::Mod.is_keyword());
        assert!(!TokenKind::Plus.is_keyword());
    }

    #[test]
    fn descriptions() {
        assert_eq!(TokenKind::Assign.to_string(), "':='");
        assert_eq!(TokenKind::Newline.description(), "end of line");
        assert!(TokenKind::HexLiteral.is_literal());
    }
}
