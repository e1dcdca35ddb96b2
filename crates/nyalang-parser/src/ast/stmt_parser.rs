//! Statement parsing.

use super::parser::Parser;
use crate::ast::expr::Expr;
use crate::ast::stmt::*;
use crate::ast::{AssignOp, Ident};
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;
use nyalang_core::{ParseError, ParseErrorKind};

impl<'ast> Parser<'ast> {
    pub fn parse_statement(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::Identifier
                if self.peek_nth(1).kind == TokenKind::Colon
                    || AssignOp::from_token(self.peek_nth(1).kind).is_some() =>
            {
                self.parse_named_assignment()
            }
            _ => self.parse_expr_or_member_assignment(),
        }
    }

    /// Grammar: `IDENT (':' TYPE)? ASSIGN_OP EXPR ';'`
    fn parse_named_assignment(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let ty = if self.eat(TokenKind::Colon).is_some() {
            Some(self.parse_type()?)
        } else {
            None
        };

        let op = self.parse_assign_op()?;
        if ty.is_some() && op != AssignOp::Assign {
            return Err(ParseError::new(
                ParseErrorKind::InvalidSyntax,
                name.span,
                format!("a type annotation requires '=', found '{op}'"),
            ));
        }

        let value = self.parse_expr(0)?;
        let end = self.expect(TokenKind::Semicolon)?.span;

        Ok(Stmt::Assign(AssignStmt {
            target: AssignTarget::Name(Ident::new(name.lexeme, name.span)),
            ty,
            op,
            value,
            span: name.span.merge(end),
        }))
    }

    /// Grammar: `EXPR ';'` or `EXPR '.' IDENT ASSIGN_OP EXPR ';'`
    fn parse_expr_or_member_assignment(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let expr = self.parse_expr(0)?;

        if AssignOp::from_token(self.peek().kind).is_some() {
            let Expr::Member(member) = *expr else {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidSyntax,
                    expr.span(),
                    "invalid assignment target",
                ));
            };
            let op = self.parse_assign_op()?;
            let value = self.parse_expr(0)?;
            let end = self.expect(TokenKind::Semicolon)?.span;
            return Ok(Stmt::Assign(AssignStmt {
                target: AssignTarget::Member {
                    object: member.object,
                    member: member.member,
                },
                ty: None,
                op,
                value,
                span: expr.span().merge(end),
            }));
        }

        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(Stmt::Expr(ExprStmt {
            expr,
            span: expr.span().merge(end),
        }))
    }

    fn parse_assign_op(&mut self) -> Result<AssignOp, ParseError> {
        match AssignOp::from_token(self.peek().kind) {
            Some(op) => {
                self.advance();
                Ok(op)
            }
            None => Err(self.error_here(
                ParseErrorKind::ExpectedToken,
                format!("expected assignment operator, found {}", self.peek().kind),
            )),
        }
    }

    /// Grammar: `'return' EXPR? ';'`
    pub fn parse_return(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Return)?.span;
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: start.merge(end),
        }))
    }

    /// Grammar: `'{' STATEMENT* '}'`
    pub fn parse_block(&mut self) -> Result<Block<'ast>, ParseError> {
        let start = self.expect(TokenKind::LeftBrace)?.span;
        let mut stmts = BVec::new_in(self.arena);

        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        let end = self.expect(TokenKind::RightBrace)?.span;
        Ok(Block {
            stmts: stmts.into_bump_slice(),
            span: start.merge(end),
        })
    }
}
