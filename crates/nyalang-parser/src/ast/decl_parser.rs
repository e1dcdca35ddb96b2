//! Declaration parsing: build info, namespaces, classes, interfaces, enums,
//! fields, and methods.

use super::parser::Parser;
use crate::ast::decl::*;
use crate::ast::expr::{LiteralExpr, LiteralKind};
use crate::ast::Ident;
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;
use nyalang_core::{ParseError, ParseErrorKind};

impl<'ast> Parser<'ast> {
    pub fn parse_item(&mut self) -> Result<Item<'ast>, ParseError> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::Namespace => self.parse_namespace(),
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::Equal => {
                self.parse_build_info()
            }
            _ => {
                let start = self.peek().span;
                let modifiers = self.parse_modifiers()?;
                let next = self.peek().kind;
                match next {
                    TokenKind::Class => Ok(Item::Class(self.parse_class(modifiers, ClassKind::Class)?)),
                    TokenKind::Interface => {
                        Ok(Item::Class(self.parse_class(modifiers, ClassKind::Interface)?))
                    }
                    TokenKind::Enum => Ok(Item::Enum(self.parse_enum(modifiers)?)),
                    TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::LeftParen => {
                        let mut method = self.parse_method(modifiers)?;
                        method.span = start.merge(method.span);
                        Ok(Item::Method(method))
                    }
                    found => Err(self.error_here(
                        ParseErrorKind::ExpectedDeclaration,
                        format!("expected declaration, found {found}"),
                    )),
                }
            }
        }
    }

    /// Grammar: `IDENT '=' LITERAL ';'`
    fn parse_build_info(&mut self) -> Result<Item<'ast>, ParseError> {
        let key = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::Equal)?;
        let value = self.parse_literal_value()?;
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(Item::BuildInfo(BuildInfoDecl {
            key: Ident::new(key.lexeme, key.span),
            value,
            span: key.span.merge(end),
        }))
    }

    /// Grammar: `'namespace' IDENT ('.' IDENT)* '{' ITEM* '}'`
    fn parse_namespace(&mut self) -> Result<Item<'ast>, ParseError> {
        let start = self.expect(TokenKind::Namespace)?.span;
        let first = self.expect(TokenKind::Identifier)?;
        let mut name = String::from(first.lexeme);
        while self.eat(TokenKind::Dot).is_some() {
            name.push('.');
            name.push_str(self.expect(TokenKind::Identifier)?.lexeme);
        }
        self.expect(TokenKind::LeftBrace)?;
        let items = self.parse_items_until(TokenKind::RightBrace);
        let end = self.expect(TokenKind::RightBrace)?.span;
        Ok(Item::Namespace(NamespaceDecl {
            name: self.arena.alloc_str(&name),
            items,
            span: start.merge(end),
        }))
    }

    /// Grammar: `('@' IDENT | '!')*`
    fn parse_modifiers(&mut self) -> Result<Modifiers<'ast>, ParseError> {
        let mut attributes = BVec::new_in(self.arena);
        let mut is_static = false;
        loop {
            if let Some(at) = self.eat(TokenKind::At) {
                let name = self.expect(TokenKind::Identifier)?;
                attributes.push(Attribute {
                    name: Ident::new(name.lexeme, name.span),
                    span: at.span.merge(name.span),
                });
            } else if self.eat(TokenKind::Bang).is_some() {
                is_static = true;
            } else {
                break;
            }
        }
        Ok(Modifiers {
            attributes: attributes.into_bump_slice(),
            is_static,
        })
    }

    /// Grammar: `('class' | 'interface') IDENT (':' TYPE (',' TYPE)*)? '{' MEMBER* '}'`
    fn parse_class(&mut self, modifiers: Modifiers<'ast>, kind: ClassKind) -> Result<ClassDecl<'ast>, ParseError> {
        let start = self.advance().span;
        let name = self.expect(TokenKind::Identifier)?;

        let mut dependencies = BVec::new_in(self.arena);
        if self.eat(TokenKind::Colon).is_some() {
            loop {
                dependencies.push(self.parse_type()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        self.expect(TokenKind::LeftBrace)?;
        let mut members = BVec::new_in(self.arena);
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            match self.parse_member() {
                Ok(member) => members.push(member),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        let end = self.expect(TokenKind::RightBrace)?.span;

        Ok(ClassDecl {
            modifiers,
            kind,
            name: Ident::new(name.lexeme, name.span),
            dependencies: dependencies.into_bump_slice(),
            members: members.into_bump_slice(),
            span: start.merge(end),
        })
    }

    fn parse_member(&mut self) -> Result<ClassMember<'ast>, ParseError> {
        let start = self.peek().span;
        let modifiers = self.parse_modifiers()?;
        let name = self.expect(TokenKind::Identifier)?;

        let next = self.peek().kind;
        match next {
            TokenKind::LeftParen => {
                self.position -= 1;
                let mut method = self.parse_method(modifiers)?;
                method.span = start.merge(method.span);
                Ok(ClassMember::Method(method))
            }
            TokenKind::Colon => {
                self.advance();
                let ty = self.parse_type()?;
                let end = self.expect(TokenKind::Semicolon)?.span;
                Ok(ClassMember::Field(FieldDecl {
                    modifiers,
                    name: Ident::new(name.lexeme, name.span),
                    ty,
                    span: start.merge(end),
                }))
            }
            found => Err(self.error_here(
                ParseErrorKind::ExpectedDeclaration,
                format!("expected '(' or ':' after member name, found {found}"),
            )),
        }
    }

    /// Grammar: `IDENT '(' PARAMS? ')' (':' TYPE)? (BLOCK | ';')`
    fn parse_method(&mut self, modifiers: Modifiers<'ast>) -> Result<MethodDecl<'ast>, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::LeftParen)?;

        let mut params = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;

        let return_type = if self.eat(TokenKind::Colon).is_some() {
            Some(self.parse_type()?)
        } else {
            None
        };

        let (body, end) = match self.eat(TokenKind::Semicolon) {
            Some(semi) => (None, semi.span),
            None => {
                let block = self.parse_block()?;
                (Some(block), block.span)
            }
        };

        Ok(MethodDecl {
            modifiers,
            name: Ident::new(name.lexeme, name.span),
            params: params.into_bump_slice(),
            return_type,
            body,
            span: name.span.merge(end),
        })
    }

    /// Grammar: `IDENT '?'? ':' TYPE ('=' LITERAL)?`
    fn parse_param(&mut self) -> Result<Param<'ast>, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let optional = self.eat(TokenKind::Question).is_some();
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let default = if self.eat(TokenKind::Equal).is_some() {
            Some(self.parse_literal_value()?)
        } else {
            None
        };
        let end = default.map_or(ty.span, |d| d.span);
        Ok(Param {
            name: Ident::new(name.lexeme, name.span),
            ty,
            optional: optional || default.is_some(),
            default,
            span: name.span.merge(end),
        })
    }

    /// Grammar: `'enum' IDENT '{' (IDENT ('=' LITERAL)? ','?)* '}'`
    fn parse_enum(&mut self, modifiers: Modifiers<'ast>) -> Result<EnumDecl<'ast>, ParseError> {
        let start = self.expect(TokenKind::Enum)?.span;
        let name = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::LeftBrace)?;

        let mut values = BVec::new_in(self.arena);
        while !self.check(TokenKind::RightBrace) {
            let value_name = self.expect(TokenKind::Identifier)?;
            let value = if self.eat(TokenKind::Equal).is_some() {
                Some(self.parse_literal_value()?)
            } else {
                None
            };
            values.push(EnumValue {
                name: Ident::new(value_name.lexeme, value_name.span),
                value,
                span: value.map_or(value_name.span, |v| value_name.span.merge(v.span)),
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let end = self.expect(TokenKind::RightBrace)?.span;

        Ok(EnumDecl {
            modifiers,
            name: Ident::new(name.lexeme, name.span),
            values: values.into_bump_slice(),
            span: start.merge(end),
        })
    }

    /// A literal token, optionally preceded by `-` for numbers.
    fn parse_literal_value(&mut self) -> Result<LiteralExpr<'ast>, ParseError> {
        let minus = self.eat(TokenKind::Minus);
        let token = self.advance();
        let kind = match token.kind {
            TokenKind::IntLiteral => LiteralKind::Int,
            TokenKind::RealLiteral => LiteralKind::Real,
            TokenKind::StringLiteral if minus.is_none() => LiteralKind::String,
            TokenKind::RegexLiteral if minus.is_none() => LiteralKind::Regex,
            TokenKind::True | TokenKind::False if minus.is_none() => LiteralKind::Bool,
            TokenKind::Nil if minus.is_none() => LiteralKind::Nil,
            found => {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedExpression,
                    token.span,
                    format!("expected literal, found {found}"),
                ));
            }
        };

        Ok(match minus {
            Some(sign) => {
                let text = self.arena.alloc_str(&format!("-{}", token.lexeme));
                LiteralExpr {
                    kind,
                    text,
                    span: sign.span.merge(token.span),
                }
            }
            None => LiteralExpr {
                kind,
                text: token.lexeme,
                span: token.span,
            },
        })
    }
}
