//! Parsing of type expressions.
//!
//! Grammar: `IDENT ('.' IDENT)* ('<' TYPE (',' TYPE)* '>')? ('[' ']')*`

use super::parser::Parser;
use crate::ast::types::TypeExpr;
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;
use nyalang_core::{ParseError, ParseErrorKind};

/// Names that always denote a type, never a variable.
pub(crate) const TYPE_ALIASES: &[&str] = &[
    "object", "string", "bool", "byte", "sbyte", "short", "ushort", "int", "uint", "long", "ulong",
    "float", "double", "decimal",
];

impl<'ast> Parser<'ast> {
    pub fn parse_type(&mut self) -> Result<TypeExpr<'ast>, ParseError> {
        let first = self.peek();
        if first.kind != TokenKind::Identifier {
            return Err(self.error_here(
                ParseErrorKind::ExpectedType,
                format!("expected type, found {}", first.kind),
            ));
        }
        let first = self.advance();
        let mut span = first.span;
        let mut name: &'ast str = first.lexeme;

        if self.check(TokenKind::Dot) && self.peek_nth(1).kind == TokenKind::Identifier {
            let mut dotted = String::from(name);
            while self.check(TokenKind::Dot) && self.peek_nth(1).kind == TokenKind::Identifier {
                self.advance();
                let part = self.advance();
                dotted.push('.');
                dotted.push_str(part.lexeme);
                span = span.merge(part.span);
            }
            name = self.arena.alloc_str(&dotted);
        }

        let mut type_args: &'ast [TypeExpr<'ast>] = &[];
        if self.eat(TokenKind::Less).is_some() {
            let mut args = BVec::new_in(self.arena);
            loop {
                args.push(self.parse_type()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.split_shift_right();
            span = span.merge(self.expect(TokenKind::Greater)?.span);
            type_args = args.into_bump_slice();
        }

        let mut array_rank = 0;
        while self.check(TokenKind::LeftBracket) && self.peek_nth(1).kind == TokenKind::RightBracket {
            self.advance();
            span = span.merge(self.advance().span);
            array_rank += 1;
        }

        Ok(TypeExpr {
            name,
            type_args,
            array_rank,
            span,
        })
    }

    /// Try to parse a type, rewinding on failure.
    pub(super) fn try_parse_type(&mut self) -> Option<TypeExpr<'ast>> {
        let saved = self.position;
        match self.parse_type() {
            Ok(ty) => Some(ty),
            Err(_) => {
                self.position = saved;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    fn parse(source: &str) -> String {
        let arena = Bump::new();
        let mut parser = Parser::new(source, &arena);
        parser.parse_type().unwrap().to_string()
    }

    #[test]
    fn simple_and_qualified() {
        assert_eq!(parse("int"), "int");
        assert_eq!(parse("System.Text.StringBuilder"), "System.Text.StringBuilder");
    }

    #[test]
    fn generics_and_arrays() {
        assert_eq!(parse("List<int>"), "List<int>");
        assert_eq!(parse("Dictionary<string, int[]>"), "Dictionary<string, int[]>");
        assert_eq!(parse("string[][]"), "string[][]");
    }

    #[test]
    fn nested_generic_closes_with_shift_token() {
        assert_eq!(parse("List<List<int>>"), "List<List<int>>");
    }

    #[test]
    fn missing_type_is_an_error() {
        let arena = Bump::new();
        let mut parser = Parser::new("123", &arena);
        let err = parser.parse_type().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedType);
        assert!(parser.try_parse_type().is_none());
        assert_eq!(parser.position, 0);
    }
}
