//! Top-level block parsing: callbacks and function definitions.

use ksp_core::{ParseError, ParseErrorKind};

use crate::lexer::TokenKind;

use super::decl::*;
use super::expr::Ident;
use super::parser::Parser;

impl<'src, 'm> Parser<'src, 'm> {
    pub(crate) fn parse_module(&mut self) -> Module {
        let mut blocks = Vec::new();
        loop {
            self.skip_newlines();
            if self.is_eof() {
                break;
            }
            match self.parse_block() {
                Ok(block) => blocks.push(block),
                Err(err) => {
                    self.record(err);
                    self.synchronize();
                }
            }
        }
        Module::new(blocks)
    }

    pub fn parse_block(&mut self) -> Result<Block, ParseError> {
        let token = *self.peek();
        match token.kind {
            TokenKind::On => Ok(Block::Callback(self.parse_callback()?)),
            TokenKind::Override => {
                self.advance();
                Ok(Block::Function(self.parse_function(FunctionFlags::OVERRIDE)?))
            }
            TokenKind::Function | TokenKind::Taskfunc => {
                Ok(Block::Function(self.parse_function(FunctionFlags::empty())?))
            }
            _ => Err(self.error_at(
                ParseErrorKind::ExpectedBlock,
                token.span,
                format!("expected 'on', 'function' or 'taskfunc', found {}", token.kind),
            )),
        }
    }

    /// `on name [(variable)] ... end on`
    fn parse_callback(&mut self) -> Result<Callback, ParseError> {
        let on = self.expect(TokenKind::On)?;
        let name = self.expect(TokenKind::Identifier)?;

        let variable = if self.eat(TokenKind::LeftParen).is_some() {
            let var = self.expect(TokenKind::Identifier)?;
            self.expect(TokenKind::RightParen)?;
            Some(Ident::parse(var.lexeme, var.span))
        } else {
            None
        };
        self.expect_line_end()?;

        let body = self.parse_body()?;
        self.expect_end(TokenKind::On)?;

        Ok(Callback {
            name: name.lexeme.to_string(),
            variable,
            body,
            span: on.span.merge(name.span),
        })
    }

    /// `function|taskfunc name [(params)] [-> result] ... end function|taskfunc`
    ///
    /// `flags` carries `OVERRIDE` when the caller already consumed the keyword.
    pub fn parse_function(&mut self, mut flags: FunctionFlags) -> Result<FunctionDef, ParseError> {
        let keyword = self.advance();
        let closing = match keyword.kind {
            TokenKind::Function => TokenKind::Function,
            TokenKind::Taskfunc => {
                flags |= FunctionFlags::TASKFUNC;
                TokenKind::Taskfunc
            }
            _ => {
                return Err(ParseError::expected_token(
                    self.location(keyword.span),
                    "'function' or 'taskfunc'",
                    keyword.kind.description(),
                ));
            }
        };

        let name_token = self.expect(TokenKind::Identifier)?;
        let name = Ident::parse(name_token.lexeme, name_token.span);

        let mut params = Vec::new();
        if self.eat(TokenKind::LeftParen).is_some() {
            if !self.check(TokenKind::RightParen) {
                loop {
                    params.push(self.parse_param()?);
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightParen)?;
        }

        let result = if self.eat(TokenKind::Arrow).is_some() {
            let token = self.expect(TokenKind::Identifier)?;
            Some(Ident::parse(token.lexeme, token.span))
        } else {
            None
        };
        self.expect_line_end()?;

        let body = self.parse_body()?;
        self.expect_end(closing)?;

        Ok(FunctionDef {
            name,
            params,
            result,
            body,
            flags,
            span: keyword.span.merge(name_token.span),
        })
    }

    /// `[out|ref|var] name`
    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let first = self.expect(TokenKind::Identifier)?;
        if let Some(kind) = ParamKind::from_keyword(first.lexeme)
            && self.check(TokenKind::Identifier)
        {
            let name = self.advance();
            return Ok(Param::new(Ident::parse(name.lexeme, name.span), kind));
        }
        Ok(Param::new(Ident::parse(first.lexeme, first.span), ParamKind::Value))
    }
}
