//! Expression parsing using a Pratt parser.

use std::str::FromStr;

use ksp_core::{ParseError, ParseErrorKind, Span};
use rust_decimal::Decimal;

use crate::lexer::{Token, TokenKind};

use super::expr::*;
use super::ops::{BinaryOp, UnaryOp};
use super::parser::Parser;

impl<'src, 'm> Parser<'src, 'm> {
    /// Parse a full expression.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr(0)
    }

    /// Parse an expression with a minimum binding power.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        while let Some(op) = BinaryOp::from_token(self.peek().kind) {
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expr::binary(lhs, op, rhs);
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = *self.peek();

        if let Some(op) = UnaryOp::from_token(token.kind) {
            self.advance();
            let operand = self.parse_expr(op.binding_power())?;
            let span = token.span.merge(operand.span());
            return Ok(Expr::unary(op, operand, span));
        }

        match token.kind {
            TokenKind::IntLiteral | TokenKind::HexLiteral => {
                self.advance();
                let value = self.integer_value(&token)?;
                Ok(Expr::int(value, token.span))
            }
            TokenKind::RealLiteral => {
                self.advance();
                let parsed = if token.lexeme.contains(['e', 'E']) {
                    Decimal::from_scientific(token.lexeme)
                } else {
                    Decimal::from_str(token.lexeme)
                };
                let value = parsed.map_err(|e| {
                    self.error_at(ParseErrorKind::InvalidToken, token.span, format!("invalid real literal: {e}"))
                })?;
                Ok(Expr::Real(RealLit {
                    value,
                    span: token.span,
                }))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::String(StrLit {
                    raw: token.lexeme.to_string(),
                    span: token.span,
                }))
            }
            TokenKind::Identifier => {
                self.advance();
                let ident = Ident::parse(token.lexeme, token.span);
                if self.check(TokenKind::LeftParen) {
                    let (args, end) = self.parse_arguments()?;
                    let mut call = FunctionCall::new(ident, args, false);
                    call.span = token.span.merge(end);
                    Ok(Expr::call(call))
                } else {
                    Ok(Expr::Var(self.parse_var_ref_rest(ident)?))
                }
            }
            TokenKind::Call => {
                let call = self.parse_call_keyword(false)?;
                Ok(Expr::call(call))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            _ => Err(self.error_at(
                ParseErrorKind::ExpectedExpression,
                token.span,
                format!("expected expression, found {}", token.kind),
            )),
        }
    }

    /// Integer literals wrap into 32 bits, like the host does.
    fn integer_value(&self, token: &Token<'src>) -> Result<i32, ParseError> {
        let text = token.lexeme;
        let parsed = if token.kind == TokenKind::HexLiteral {
            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .or_else(|| text.strip_suffix(['h', 'H']))
                .unwrap_or(text);
            u64::from_str_radix(digits, 16)
        } else {
            text.parse::<u64>()
        };
        parsed.map(|v| v as u32 as i32).map_err(|_| {
            self.error_at(
                ParseErrorKind::InvalidToken,
                token.span,
                format!("integer literal {text} is out of range"),
            )
        })
    }

    /// Parse `(a, b, ...)`. Returns the arguments and the span of the closing paren.
    pub(crate) fn parse_arguments(&mut self) -> Result<(Vec<Expr>, Span), ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen)?;
        Ok((args, close.span))
    }

    /// Subscripts following an identifier: `[i]`, `[i, j]` or `[i][j]`.
    pub(crate) fn parse_var_ref_rest(&mut self, ident: Ident) -> Result<VarRef, ParseError> {
        let mut subscripts = Vec::new();
        let mut span = ident.span;
        while self.eat(TokenKind::LeftBracket).is_some() {
            loop {
                subscripts.push(self.parse_expression()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            span = span.merge(self.expect(TokenKind::RightBracket)?.span);
        }
        let mut var = VarRef::with_subscripts(ident, subscripts);
        var.span = span;
        Ok(var)
    }

    /// Parse a variable reference starting at an identifier token.
    pub(crate) fn parse_var_ref(&mut self) -> Result<VarRef, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        self.parse_var_ref_rest(Ident::parse(token.lexeme, token.span))
    }

    /// `call name[(args)]`
    pub(crate) fn parse_call_keyword(&mut self, is_procedure: bool) -> Result<FunctionCall, ParseError> {
        let keyword = self.expect(TokenKind::Call)?;
        let name = self.expect(TokenKind::Identifier)?;
        let (args, end) = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            (Vec::new(), name.span)
        };
        let mut call = FunctionCall::new(Ident::parse(name.lexeme, name.span), args, is_procedure);
        call.using_call = true;
        call.span = keyword.span.merge(end);
        Ok(call)
    }
}
