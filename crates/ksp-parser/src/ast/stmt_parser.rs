//! Statement parsing.

use ksp_core::{ParseError, ParseErrorKind};

use crate::lexer::TokenKind;

use super::decl::FunctionFlags;
use super::expr::*;
use super::parser::Parser;
use super::stmt::*;

impl<'src, 'm> Parser<'src, 'm> {
    /// Parse statements until `end`, `else`, `case` or EOF.
    pub fn parse_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(
                self.peek().kind,
                TokenKind::End | TokenKind::Else | TokenKind::Case | TokenKind::Eof
            ) {
                return Ok(body);
            }
            body.push(self.parse_statement()?);
        }
    }

    /// Expect `end <keyword>` followed by the end of the line.
    pub(crate) fn expect_end(&mut self, keyword: TokenKind) -> Result<(), ParseError> {
        let end = self.expect(TokenKind::End)?;
        let closing = *self.peek();
        if closing.kind != keyword {
            return Err(self.error_at(
                ParseErrorKind::MismatchedEnd,
                end.span.merge(closing.span),
                format!("expected 'end {}', found 'end {}'", keyword_text(keyword), closing.lexeme),
            ));
        }
        self.advance();
        self.expect_line_end()
    }

    pub fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = *self.peek();
        let kind = match token.kind {
            TokenKind::Declare => self.parse_declaration()?,
            TokenKind::Property => self.parse_property()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Select => self.parse_select()?,
            TokenKind::Family => self.parse_family()?,
            TokenKind::Call => {
                let call = self.parse_call_keyword(true)?;
                self.expect_line_end()?;
                StmtKind::Call(call)
            }
            TokenKind::Identifier => self.parse_assign_or_call()?,
            _ => {
                return Err(self.error_at(
                    ParseErrorKind::ExpectedStatement,
                    token.span,
                    format!("expected statement, found {}", token.kind),
                ));
            }
        };
        Ok(Stmt::new(kind, token.span))
    }

    /// `x[i] := expr`, `f(args)` or a bare `f`.
    fn parse_assign_or_call(&mut self) -> Result<StmtKind, ParseError> {
        let token = self.advance();
        let ident = Ident::parse(token.lexeme, token.span);

        if self.check(TokenKind::LeftParen) {
            let (args, end) = self.parse_arguments()?;
            let mut call = FunctionCall::new(ident, args, true);
            call.span = token.span.merge(end);
            self.expect_line_end()?;
            return Ok(StmtKind::Call(call));
        }

        if self.check(TokenKind::Assign) || self.check(TokenKind::LeftBracket) {
            let target = self.parse_var_ref_rest(ident)?;
            self.expect(TokenKind::Assign)?;
            let value = self.parse_expression()?;
            self.expect_line_end()?;
            return Ok(StmtKind::Assign(Assignment { target, value }));
        }

        self.expect_line_end()?;
        Ok(StmtKind::Call(FunctionCall::new(ident, Vec::new(), true)))
    }

    // =========================================
    // Declarations
    // =========================================

    /// `declare [modifiers] name[size](params) := init`
    fn parse_declaration(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::Declare)?;

        let mut modifiers = Vec::new();
        while self.check(TokenKind::Identifier) && self.peek_nth(1).kind == TokenKind::Identifier {
            modifiers.push(self.advance().lexeme.to_string());
        }

        let name_token = self.expect(TokenKind::Identifier)?;
        let name = Ident::parse(name_token.lexeme, name_token.span);

        let size = if self.eat(TokenKind::LeftBracket).is_some() {
            let size = self.parse_expression()?;
            self.expect(TokenKind::RightBracket)?;
            Some(size)
        } else {
            None
        };

        let params = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?.0
        } else {
            Vec::new()
        };

        let init = if self.eat(TokenKind::Assign).is_some() {
            Some(self.parse_initializer(size.is_some())?)
        } else {
            None
        };

        self.expect_line_end()?;
        Ok(StmtKind::Declare(Box::new(Declaration {
            name,
            modifiers,
            size,
            params,
            init,
        })))
    }

    /// `(a, b, c)` is a value list for arrays or when it has several items;
    /// otherwise the parentheses belong to a single expression.
    fn parse_initializer(&mut self, is_array: bool) -> Result<Initializer, ParseError> {
        if self.check(TokenKind::LeftParen) {
            let mark = self.mark();
            if let Ok((values, _)) = self.parse_arguments() {
                let at_line_end = self.check(TokenKind::Newline) || self.is_eof();
                if at_line_end && (is_array || values.len() > 1) {
                    return Ok(Initializer::List(values));
                }
            }
            self.reset(mark);
        }
        Ok(Initializer::Single(self.parse_expression()?))
    }

    /// `property name ... end property`, or the alias form `property name[i] -> target`.
    fn parse_property(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::Property)?;
        let name_token = self.expect(TokenKind::Identifier)?;
        let name = Ident::parse(name_token.lexeme, name_token.span);

        if self.check(TokenKind::LeftBracket) || self.check(TokenKind::Arrow) {
            let mut indices = Vec::new();
            if self.eat(TokenKind::LeftBracket).is_some() {
                loop {
                    let index = self.expect(TokenKind::Identifier)?;
                    indices.push(Ident::parse(index.lexeme, index.span));
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                self.expect(TokenKind::RightBracket)?;
            }
            self.expect(TokenKind::Arrow)?;
            let target = self.parse_var_ref()?;
            self.expect_line_end()?;
            return Ok(StmtKind::Property(Box::new(PropertyDecl {
                name,
                body: PropertyBody::Alias { indices, target },
            })));
        }

        self.expect_line_end()?;
        let mut accessors = Vec::new();
        loop {
            self.skip_newlines();
            if !self.check(TokenKind::Function) {
                break;
            }
            accessors.push(self.parse_function(FunctionFlags::empty())?);
        }
        self.expect_end(TokenKind::Property)?;

        Ok(StmtKind::Property(Box::new(PropertyDecl {
            name,
            body: PropertyBody::Accessors(accessors),
        })))
    }

    // =========================================
    // Control flow
    // =========================================

    fn parse_while(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::While)?;
        let cond = self.parse_expression()?;
        self.expect_line_end()?;
        let body = self.parse_body()?;
        self.expect_end(TokenKind::While)?;
        Ok(StmtKind::While(WhileLoop { cond, body }))
    }

    /// `for v := a to|downto b [step s]`
    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::For)?;
        let var = self.parse_var_ref()?;
        self.expect(TokenKind::Assign)?;
        let start = self.parse_expression()?;

        let downto = match self.peek().kind {
            TokenKind::To => false,
            TokenKind::Downto => true,
            _ => {
                let token = *self.peek();
                return Err(ParseError::expected_token(
                    self.location(token.span),
                    "'to' or 'downto'",
                    token.kind.description(),
                ));
            }
        };
        self.advance();
        let end = self.parse_expression()?;
        let step = if self.eat(TokenKind::Step).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_line_end()?;

        let body = self.parse_body()?;
        self.expect_end(TokenKind::For)?;
        Ok(StmtKind::For(Box::new(ForLoop {
            var,
            start,
            end,
            step,
            downto,
            body,
        })))
    }

    /// `if (c) ... else if (c) ... else ... end if`
    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_expression()?;
        self.expect_line_end()?;
        let body = self.parse_body()?;

        let mut branches = vec![CondBranch { cond, body }];
        let mut else_body = Vec::new();

        while self.eat(TokenKind::Else).is_some() {
            if self.eat(TokenKind::If).is_some() {
                let cond = self.parse_expression()?;
                self.expect_line_end()?;
                let body = self.parse_body()?;
                branches.push(CondBranch { cond, body });
            } else {
                self.expect_line_end()?;
                else_body = self.parse_body()?;
                break;
            }
        }

        self.expect_end(TokenKind::If)?;
        Ok(StmtKind::If(IfStmt { branches, else_body }))
    }

    /// `select (e) case a [to b] ... end select`
    fn parse_select(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::Select)?;
        let scrutinee = self.parse_expression()?;
        self.expect_line_end()?;

        let mut cases = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::Case).is_none() {
                break;
            }
            let start = self.parse_expression()?;
            let end = if self.eat(TokenKind::To).is_some() {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect_line_end()?;
            let body = self.parse_body()?;
            cases.push(SelectCase { start, end, body });
        }

        self.expect_end(TokenKind::Select)?;
        Ok(StmtKind::Select(SelectStmt { scrutinee, cases }))
    }

    fn parse_family(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(TokenKind::Family)?;
        let token = self.expect(TokenKind::Identifier)?;
        self.expect_line_end()?;
        let body = self.parse_body()?;
        self.expect_end(TokenKind::Family)?;
        Ok(StmtKind::Family(Family {
            name: Ident::parse(token.lexeme, token.span),
            body,
        }))
    }
}

fn keyword_text(kind: TokenKind) -> &'static str {
    kind.description().trim_matches('\'')
}
