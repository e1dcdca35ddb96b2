//! Expression parsing using Pratt parsing (precedence climbing).

use super::parser::Parser;
use super::type_parser::TYPE_ALIASES;
use crate::ast::expr::*;
use crate::ast::types::TypeExpr;
use crate::ast::{BinaryOp, Ident, UnaryOp};
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;
use nyalang_core::{ParseError, ParseErrorKind, Span};

/// Binding power of `as`.
const AS_BP: u8 = 17;
/// Binding power of calls and member access.
const POSTFIX_BP: u8 = 19;

impl<'ast> Parser<'ast> {
    /// Parse an expression whose operators bind at least as tightly as `min_bp`.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let kind = self.peek().kind;

            if kind == TokenKind::Dot {
                if POSTFIX_BP < min_bp {
                    break;
                }
                lhs = self.parse_member_access(lhs)?;
                continue;
            }

            if kind == TokenKind::LeftParen {
                if POSTFIX_BP < min_bp {
                    break;
                }
                lhs = self.parse_free_call(lhs)?;
                continue;
            }

            if kind == TokenKind::As {
                if AS_BP < min_bp {
                    break;
                }
                self.advance();
                let target = self.parse_type()?;
                let span = lhs.span().merge(target.span);
                lhs = self.arena.alloc(Expr::As(self.arena.alloc(AsExpr {
                    operand: lhs,
                    target,
                    span,
                })));
                continue;
            }

            if let Some(op) = BinaryOp::from_token(kind) {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let rhs = self.parse_expr(r_bp)?;
                let span = lhs.span().merge(rhs.span());
                lhs = self.arena.alloc(Expr::Binary(self.arena.alloc(BinaryExpr {
                    left: lhs,
                    op,
                    right: rhs,
                    span,
                })));
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let token = *self.peek();

        let literal = match token.kind {
            TokenKind::IntLiteral => Some(LiteralKind::Int),
            TokenKind::RealLiteral => Some(LiteralKind::Real),
            TokenKind::StringLiteral => Some(LiteralKind::String),
            TokenKind::RegexLiteral => Some(LiteralKind::Regex),
            TokenKind::True | TokenKind::False => Some(LiteralKind::Bool),
            TokenKind::Nil => Some(LiteralKind::Nil),
            _ => None,
        };
        if let Some(kind) = literal {
            self.advance();
            return Ok(self.arena.alloc(Expr::Literal(LiteralExpr {
                kind,
                text: token.lexeme,
                span: token.span,
            })));
        }

        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(self.arena.alloc(Expr::Ident(Ident::new(token.lexeme, token.span))))
            }

            TokenKind::This => {
                self.advance();
                Ok(self.arena.alloc(Expr::This(token.span)))
            }

            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_expr(UnaryOp::binding_power())?;
                let span = token.span.merge(operand.span());
                Ok(self.arena.alloc(Expr::Unary(self.arena.alloc(UnaryExpr {
                    op: UnaryOp::Neg,
                    operand,
                    span,
                }))))
            }

            TokenKind::New => self.parse_new(),

            TokenKind::LeftParen => {
                if let Some(cast) = self.try_parse_cast()? {
                    return Ok(cast);
                }
                self.advance();
                let inner = self.parse_expr(0)?;
                let end = self.expect(TokenKind::RightParen)?;
                Ok(self.arena.alloc(Expr::Paren(inner, token.span.merge(end.span))))
            }

            TokenKind::Eof => Err(ParseError::unexpected_eof(token.span)),

            _ => Err(ParseError::new(
                ParseErrorKind::ExpectedExpression,
                token.span,
                format!("expected expression, found {}", token.kind),
            )),
        }
    }

    /// `(Type) operand`, if the parenthesized text reads as a cast.
    fn try_parse_cast(&mut self) -> Result<Option<&'ast Expr<'ast>>, ParseError> {
        let saved = self.position;
        let open = self.advance();

        let Some(target) = self.try_parse_type() else {
            self.position = saved;
            return Ok(None);
        };
        if !self.check(TokenKind::RightParen) || !self.starts_cast_operand(&target) {
            self.position = saved;
            return Ok(None);
        }
        self.advance();

        let operand = self.parse_expr(UnaryOp::binding_power())?;
        let span = open.span.merge(operand.span());
        Ok(Some(self.arena.alloc(Expr::Cast(self.arena.alloc(CastExpr {
            target,
            operand,
            span,
        })))))
    }

    /// Whether the token after `(Type)` begins an operand.
    ///
    /// A leading `-` only makes a cast for names that cannot be variables.
    fn starts_cast_operand(&self, target: &TypeExpr<'ast>) -> bool {
        match self.peek_nth(1).kind {
            TokenKind::Identifier
            | TokenKind::IntLiteral
            | TokenKind::RealLiteral
            | TokenKind::StringLiteral
            | TokenKind::RegexLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
            | TokenKind::This
            | TokenKind::New
            | TokenKind::LeftParen => true,
            TokenKind::Minus => {
                TYPE_ALIASES.contains(&target.name) || target.is_generic() || target.is_array()
            }
            _ => false,
        }
    }

    fn parse_new(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let start = self.expect(TokenKind::New)?.span;
        let ty = self.parse_type()?;
        let (args, end) = self.parse_args()?;
        Ok(self.arena.alloc(Expr::New(self.arena.alloc(NewExpr {
            ty,
            args,
            span: start.merge(end),
        }))))
    }

    fn parse_member_access(&mut self, object: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::Dot)?;
        let name = self.expect(TokenKind::Identifier)?;
        let member = Ident::new(name.lexeme, name.span);

        if self.check(TokenKind::LeftParen) {
            let (args, end) = self.parse_args()?;
            return Ok(self.arena.alloc(Expr::Call(self.arena.alloc(CallExpr {
                receiver: Some(object),
                name: member,
                args,
                span: object.span().merge(end),
            }))));
        }

        Ok(self.arena.alloc(Expr::Member(self.arena.alloc(MemberExpr {
            object,
            member,
            span: object.span().merge(name.span),
        }))))
    }

    fn parse_free_call(&mut self, callee: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        let Expr::Ident(name) = *callee else {
            return Err(self.error_here(ParseErrorKind::InvalidSyntax, "only named methods can be called"));
        };
        let (args, end) = self.parse_args()?;
        Ok(self.arena.alloc(Expr::Call(self.arena.alloc(CallExpr {
            receiver: None,
            name,
            args,
            span: name.span.merge(end),
        }))))
    }

    /// `'(' (EXPR (',' EXPR)*)? ')'`, returning the closing paren span.
    fn parse_args(&mut self) -> Result<(&'ast [&'ast Expr<'ast>], Span), ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr(0)?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RightParen)?.span;
        Ok((args.into_bump_slice(), end))
    }
}
