//! The [`Lexer`] turns NyaLang source text into [`Token`]s.
//!
//! Dispatch happens on the first character of each token. Lexemes are copied
//! into the arena so tokens outlive the source string.
//!
//! A `/` is ambiguous: after a token that can end an operand it is division,
//! anywhere else it starts a regex literal (`x = /ab+c/i;`).

use bumpalo::Bump;

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};
use nyalang_core::{LexError, Span};

pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
    /// Kind of the last token produced, for regex/division disambiguation.
    previous: TokenKind,
    errors: Vec<LexError>,
    finished: bool,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            previous: TokenKind::Eof,
            errors: Vec::new(),
            finished: false,
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume and return the next token. Returns `Eof` forever once done.
    pub fn next_token(&mut self) -> Token<'ast> {
        let token = self.scan_token();
        self.previous = token.kind;
        token
    }

    // =========================================
    // Token scanning
    // =========================================

    fn scan_token(&mut self) -> Token<'ast> {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());

            let line = self.cursor.line();
            let col = self.cursor.column();
            let start = self.cursor.offset();

            let Some(c) = self.cursor.peek() else {
                return Token::new(TokenKind::Eof, "", Span::point(line, col));
            };

            if c == '/' {
                match self.cursor.peek_nth(1) {
                    Some('/') => {
                        self.cursor.eat_while(|c| c != '\n');
                        continue;
                    }
                    Some('*') => {
                        if let Err(error) = self.skip_block_comment(line, col, start) {
                            return self.make_error(error);
                        }
                        continue;
                    }
                    _ if !self.previous.ends_operand() => {
                        return self.scan_regex(line, col, start);
                    }
                    _ => {}
                }
            }

            return match c {
                '"' => self.scan_string(line, col, start),
                c if c.is_ascii_digit() => self.scan_number(line, col, start),
                c if is_ident_start(c) => self.scan_identifier(line, col, start),
                _ => self.scan_operator(line, col, start),
            };
        }
    }

    /// Create a token covering `start..current`, copying the lexeme into the arena.
    fn make_token(&self, kind: TokenKind, line: u32, col: u32, start: u32) -> Token<'ast> {
        let text = self.cursor.slice_from(start);
        let lexeme = self.arena.alloc_str(text);
        Token::new(kind, lexeme, Span::new(line, col, text.len() as u32))
    }

    fn make_error(&mut self, error: LexError) -> Token<'ast> {
        let span = error.span();
        self.errors.push(error);
        Token::new(TokenKind::Error, "", span)
    }

    fn span_from(&self, line: u32, col: u32, start: u32) -> Span {
        Span::new(line, col, self.cursor.offset() - start)
    }

    fn skip_block_comment(&mut self, line: u32, col: u32, start: u32) -> Result<(), LexError> {
        self.cursor.advance();
        self.cursor.advance();
        loop {
            if self.cursor.check_str("*/") {
                self.cursor.advance();
                self.cursor.advance();
                return Ok(());
            }
            if self.cursor.advance().is_none() {
                return Err(LexError::UnterminatedComment {
                    span: self.span_from(line, col, start),
                });
            }
        }
    }

    // =========================================
    // Literals
    // =========================================

    fn scan_string(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(line, col, start);
                    return self.make_error(LexError::UnterminatedString { span });
                }
                Some('\\') => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some('"') => {
                    self.cursor.advance();
                    return self.make_token(TokenKind::StringLiteral, line, col, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    fn scan_regex(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(line, col, start);
                    return self.make_error(LexError::UnterminatedRegex { span });
                }
                Some('\\') => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some('/') => {
                    self.cursor.advance();
                    self.cursor.eat_while(|c| c.is_ascii_alphabetic());
                    return self.make_token(TokenKind::RegexLiteral, line, col, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Scan `digits ('.' digits)? (e [+-]? digits)? suffix?`.
    ///
    /// The suffix is kept in the lexeme; only `f`, `d` and `m` make an
    /// otherwise integral number a real. Suffix validation happens when the
    /// literal is evaluated.
    fn scan_number(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        let mut real = false;
        self.cursor.eat_while(|c| c.is_ascii_digit());

        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            real = true;
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            let exponent_follows = match self.cursor.peek_nth(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.cursor.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent_follows {
                real = true;
                self.cursor.advance();
                if matches!(self.cursor.peek(), Some('+' | '-')) {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
        }

        let suffix = self.cursor.eat_while(is_ident_continue);
        let real_suffix = matches!(suffix.to_ascii_lowercase().as_str(), "f" | "d" | "m");

        if real && !suffix.is_empty() && !real_suffix {
            let span = self.span_from(line, col, start);
            return self.make_error(LexError::InvalidNumber {
                span,
                detail: format!("'{suffix}' is not a real suffix"),
            });
        }

        let kind = if real || real_suffix {
            TokenKind::RealLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.make_token(kind, line, col, start)
    }

    fn scan_identifier(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        let text = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, line, col, start)
    }

    // =========================================
    // Operators and punctuation
    // =========================================

    fn scan_operator(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        use TokenKind::*;

        let Some(c) = self.cursor.advance() else {
            return Token::new(Eof, "", Span::point(line, col));
        };

        let kind = match c {
            '+' => self.with_equal(Plus, PlusEqual),
            '-' => self.with_equal(Minus, MinusEqual),
            '*' => self.with_equal(Star, StarEqual),
            '/' => self.with_equal(Slash, SlashEqual),
            '%' => self.with_equal(Percent, PercentEqual),
            '&' => self.with_equal(Amp, AmpEqual),
            '|' => self.with_equal(Pipe, PipeEqual),
            '^' => self.with_equal(Caret, CaretEqual),
            '<' => {
                if self.cursor.eat('<') {
                    self.with_equal(LessLess, LessLessEqual)
                } else {
                    Less
                }
            }
            '>' => {
                if self.cursor.eat('>') {
                    self.with_equal(GreaterGreater, GreaterGreaterEqual)
                } else {
                    Greater
                }
            }
            '?' => {
                if self.cursor.eat('?') {
                    QuestionQuestion
                } else if self.cursor.eat('=') {
                    QuestionEqual
                } else {
                    Question
                }
            }
            '!' => Bang,
            '=' => Equal,
            ':' => Colon,
            '.' => Dot,
            '@' => At,
            '(' => LeftParen,
            ')' => RightParen,
            '[' => LeftBracket,
            ']' => RightBracket,
            '{' => LeftBrace,
            '}' => RightBrace,
            ';' => Semicolon,
            ',' => Comma,
            ch => {
                let span = self.span_from(line, col, start);
                return self.make_error(LexError::UnexpectedChar { ch, span });
            }
        };

        self.make_token(kind, line, col, start)
    }

    fn with_equal(&mut self, plain: TokenKind, compound: TokenKind) -> TokenKind {
        if self.cursor.eat('=') { compound } else { plain }
    }
}

impl<'src, 'ast> Iterator for Lexer<'src, 'ast> {
    type Item = Token<'ast>;

    /// Yields tokens up to and including the first `Eof`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        Lexer::new(source, &arena).map(|t| t.kind).collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        let arena = Bump::new();
        Lexer::new(source, &arena)
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.lexeme.to_string())
            .collect()
    }

    #[test]
    fn assignment_statement() {
        use TokenKind::*;
        assert_eq!(
            kinds("a: int = 12;"),
            vec![Identifier, Colon, Identifier, Equal, IntLiteral, Semicolon, Eof]
        );
    }

    #[test]
    fn numeric_suffixes_stay_in_lexeme() {
        assert_eq!(lexemes("12b 5L 7.4f 13e-3m 0.5d 12lu"), vec!["12b", "5L", "7.4f", "13e-3m", "0.5d", "12lu"]);
        use TokenKind::*;
        assert_eq!(
            kinds("12b 5L 7.4f 13e-3m 2d 3"),
            vec![IntLiteral, IntLiteral, RealLiteral, RealLiteral, RealLiteral, IntLiteral, Eof]
        );
    }

    #[test]
    fn member_access_after_integer_is_not_real() {
        use TokenKind::*;
        assert_eq!(kinds("1.x"), vec![IntLiteral, Dot, Identifier, Eof]);
    }

    #[test]
    fn real_with_integer_suffix_is_an_error() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("5.5u", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert!(matches!(lexer.take_errors()[0], LexError::InvalidNumber { .. }));
    }

    #[test]
    fn slash_is_division_after_operand() {
        use TokenKind::*;
        assert_eq!(kinds("a / b"), vec![Identifier, Slash, Identifier, Eof]);
        assert_eq!(kinds("(a) /= 2"), vec![LeftParen, Identifier, RightParen, SlashEqual, IntLiteral, Eof]);
    }

    #[test]
    fn slash_starts_regex_elsewhere() {
        use TokenKind::*;
        assert_eq!(kinds("r = /a\\/b+/im;"), vec![Identifier, Equal, RegexLiteral, Semicolon, Eof]);
        assert_eq!(lexemes("r = /a\\/b+/im;")[2], "/a\\/b+/im");
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("a // line\n/* block\n */ b"), vec![Identifier, Identifier, Eof]);
    }

    #[test]
    fn compound_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("?= ?? ? <<= >> < @ !"),
            vec![QuestionEqual, QuestionQuestion, Question, LessLessEqual, GreaterGreater, Less, At, Bang, Eof]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("class Cat new nil this as"),
            vec![Class, Identifier, New, Nil, This, As, Eof]
        );
    }

    #[test]
    fn spans_are_one_based() {
        let arena = Bump::new();
        let tokens: Vec<_> = Lexer::new("a\n  bb", &arena).collect();
        assert_eq!(tokens[1].span, Span::new(2, 3, 2));
    }

    #[test]
    fn unterminated_string() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("\"abc\nx", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert!(lexer.has_errors());
        assert!(matches!(lexer.take_errors()[0], LexError::UnterminatedString { .. }));
    }

    #[test]
    fn unexpected_character() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("#", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(
            lexer.take_errors(),
            vec![LexError::UnexpectedChar { ch: '#', span: Span::new(1, 1, 1) }]
        );
    }
}
