//! Parser infrastructure: token navigation and error recovery.

use crate::ast::{Item, Script};
use crate::lexer::{Lexer, Token, TokenKind};
use bumpalo::Bump;
use bumpalo::collections::Vec as BVec;
use nyalang_core::{ParseError, ParseErrorKind, ParseErrors, Span};

/// Recursive-descent parser over a pre-tokenized buffer.
///
/// AST nodes and lexemes are allocated in the arena; the source string only
/// needs to live for the call to [`Parser::new`].
pub struct Parser<'ast> {
    pub(super) buffer: Vec<Token<'ast>>,
    pub(super) position: usize,
    pub(super) errors: ParseErrors,
    pub(super) arena: &'ast Bump,
}

impl<'ast> Parser<'ast> {
    pub fn new(source: &str, arena: &'ast Bump) -> Self {
        let mut lexer = Lexer::new(source, arena);
        let mut buffer = Vec::with_capacity((source.len() / 6).max(64));
        let mut errors = ParseErrors::new();

        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Error {
                for error in lexer.take_errors() {
                    errors.push(error.into());
                }
                continue;
            }
            let is_eof = token.kind == TokenKind::Eof;
            buffer.push(token);
            if is_eof {
                break;
            }
        }

        Self {
            buffer,
            position: 0,
            errors,
            arena,
        }
    }

    /// Parse a whole compilation unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<Script<'ast>, ParseErrors> {
        let mut parser = Parser::new(source, arena);
        let start = parser.peek().span;
        let items = parser.parse_items_until(TokenKind::Eof);
        let end = parser.peek().span;

        if parser.errors.is_empty() {
            Ok(Script::new(items, start.merge(end)))
        } else {
            Err(parser.errors)
        }
    }

    /// Parse items until `end` (not consumed) or EOF, recovering from errors.
    pub(super) fn parse_items_until(&mut self, end: TokenKind) -> &'ast [Item<'ast>] {
        let mut items = BVec::new_in(self.arena);
        while !self.check(end) && !self.is_eof() {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        items.into_bump_slice()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> ParseErrors {
        std::mem::take(&mut self.errors)
    }

    // ========================================================================
    // Token Navigation
    // ========================================================================

    pub fn peek(&self) -> &Token<'ast> {
        self.peek_nth(0)
    }

    /// Peek `n` tokens ahead. Past the end this keeps returning `Eof`.
    pub fn peek_nth(&self, n: usize) -> &Token<'ast> {
        let last = self.buffer.len() - 1;
        &self.buffer[(self.position + n).min(last)]
    }

    pub fn advance(&mut self) -> Token<'ast> {
        let token = *self.peek();
        if self.position < self.buffer.len() - 1 {
            self.position += 1;
        }
        token
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    pub fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) { Some(self.advance()) } else { None }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = *self.peek();
            if token.kind == TokenKind::Eof {
                return Err(ParseError::unexpected_eof(token.span));
            }
            Err(ParseError::expected_token(
                token.span,
                kind.description(),
                token.kind.description(),
            ))
        }
    }

    /// Split a `>>` token into two `>` so `List<List<int>>` closes correctly.
    pub(super) fn split_shift_right(&mut self) {
        let token = *self.peek();
        if token.kind == TokenKind::GreaterGreater {
            let second = Token::new(
                TokenKind::Greater,
                &token.lexeme[1..],
                Span::new(token.span.line, token.span.col + 1, 1),
            );
            self.buffer[self.position] = Token::new(
                TokenKind::Greater,
                &token.lexeme[..1],
                Span::new(token.span.line, token.span.col, 1),
            );
            self.buffer.insert(self.position + 1, second);
        }
    }

    // ========================================================================
    // Error Handling
    // ========================================================================

    pub(super) fn error_here(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, self.peek().span, message)
    }

    /// Skip tokens until just past a `;` or `}`, or up to a declaration start.
    ///
    /// Always consumes at least one token.
    pub fn synchronize(&mut self) {
        let start = self.position;
        while !self.is_eof() {
            match self.peek().kind {
                TokenKind::Semicolon | TokenKind::RightBrace => {
                    self.advance();
                    return;
                }
                TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Enum
                | TokenKind::Namespace
                | TokenKind::At
                | TokenKind::Return
                    if self.position > start =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_stops_at_eof() {
        let arena = Bump::new();
        let mut parser = Parser::new("a", &arena);
        assert_eq!(parser.advance().kind, TokenKind::Identifier);
        assert!(parser.is_eof());
        parser.advance();
        assert!(parser.is_eof());
        assert_eq!(parser.peek_nth(5).kind, TokenKind::Eof);
    }

    #[test]
    fn expect_reports_both_tokens() {
        let arena = Bump::new();
        let mut parser = Parser::new("}", &arena);
        let err = parser.expect(TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
        assert_eq!(err.message, "expected ';', found '}'");
    }

    #[test]
    fn lexer_errors_become_parse_errors() {
        let arena = Bump::new();
        let parser = Parser::new("a # b", &arena);
        assert!(parser.has_errors());
        assert_eq!(parser.buffer.len(), 3);
    }

    #[test]
    fn split_shift_right_makes_two_tokens() {
        let arena = Bump::new();
        let mut parser = Parser::new(">>", &arena);
        parser.split_shift_right();
        assert_eq!(parser.advance().kind, TokenKind::Greater);
        let second = parser.advance();
        assert_eq!(second.kind, TokenKind::Greater);
        assert_eq!(second.span.col, 2);
    }

    #[test]
    fn synchronize_skips_past_semicolon() {
        let arena = Bump::new();
        let mut parser = Parser::new("x y z; w", &arena);
        parser.synchronize();
        assert_eq!(parser.peek().lexeme, "w");
    }
}
