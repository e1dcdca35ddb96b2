//! Token types produced by the NyaLang lexer.

use nyalang_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The lexeme lives in the AST arena, so the source string may be dropped
/// once lexing has finished.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    pub kind: TokenKind,
    /// The source text of this token (allocated in arena).
    pub lexeme: &'ast str,
    pub span: Span,
}

impl<'ast> Token<'ast> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// Every token kind in NyaLang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Integer with an optional type suffix: `12`, `12b`, `5lu`
    IntLiteral,
    /// Real with an optional `f`/`d`/`m` suffix: `5.4`, `0.5d`, `13e-3m`
    RealLiteral,
    /// `"..."` with C-style escapes
    StringLiteral,
    /// `/pattern/flags`
    RegexLiteral,
    Identifier,

    // =========================================
    // Keywords
    // =========================================
    Class,
    Interface,
    Enum,
    Namespace,
    Return,
    New,
    This,
    Nil,
    True,
    False,
    As,

    // =========================================
    // Operators
    // =========================================
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `<<`
    LessLess,
    /// `>>`
    GreaterGreater,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `??`
    QuestionQuestion,
    /// `?`
    Question,
    /// `!`
    Bang,
    /// `=`
    Equal,
    /// `+=`
    PlusEqual,
    /// `-=`
    MinusEqual,
    /// `*=`
    StarEqual,
    /// `/=`
    SlashEqual,
    /// `%=`
    PercentEqual,
    /// `&=`
    AmpEqual,
    /// `|=`
    PipeEqual,
    /// `^=`
    CaretEqual,
    /// `<<=`
    LessLessEqual,
    /// `>>=`
    GreaterGreaterEqual,
    /// `?=`
    QuestionEqual,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `@`
    At,

    // =========================================
    // Delimiters
    // =========================================
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comma,

    Eof,
    /// Unrecognized input; the error itself is recorded by the lexer.
    Error,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Class | Interface | Enum | Namespace | Return | New | This | Nil | True | False | As
        )
    }

    pub fn is_literal(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            IntLiteral | RealLiteral | StringLiteral | RegexLiteral | Nil | True | False
        )
    }

    pub fn is_assignment(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal
                | PlusEqual
                | MinusEqual
                | StarEqual
                | SlashEqual
                | PercentEqual
                | AmpEqual
                | PipeEqual
                | CaretEqual
                | LessLessEqual
                | GreaterGreaterEqual
                | QuestionEqual
        )
    }

    /// Whether a value can end with this token.
    ///
    /// A `/` directly after such a token divides; anywhere else it opens a
    /// regex literal.
    pub fn ends_operand(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            IntLiteral
                | RealLiteral
                | StringLiteral
                | RegexLiteral
                | Identifier
                | This
                | Nil
                | True
                | False
                | RightParen
                | RightBracket
        )
    }

    pub fn description(self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral => "integer literal",
            RealLiteral => "real literal",
            StringLiteral => "string literal",
            RegexLiteral => "regex literal",
            Identifier => "identifier",
            Class => "'class'",
            Interface => "'interface'",
            Enum => "'enum'",
            Namespace => "'namespace'",
            Return => "'return'",
            New => "'new'",
            This => "'this'",
            Nil => "'nil'",
            True => "'true'",
            False => "'false'",
            As => "'as'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Amp => "'&'",
            Pipe => "'|'",
            Caret => "'^'",
            LessLess => "'<<'",
            GreaterGreater => "'>>'",
            Less => "'<'",
            Greater => "'>'",
            QuestionQuestion => "'??'",
            Question => "'?'",
            Bang => "'!'",
            Equal => "'='",
            PlusEqual => "'+='",
            MinusEqual => "'-='",
            StarEqual => "'*='",
            SlashEqual => "'/='",
            PercentEqual => "'%='",
            AmpEqual => "'&='",
            PipeEqual => "'|='",
            CaretEqual => "'^='",
            LessLessEqual => "'<<='",
            GreaterGreaterEqual => "'>>='",
            QuestionEqual => "'?='",
            Colon => "':'",
            Dot => "'.'",
            At => "'@'",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBracket => "'['",
            RightBracket => "']'",
            LeftBrace => "'{'",
            RightBrace => "'}'",
            Semicolon => "';'",
            Comma => "','",
            Eof => "end of file",
            Error => "invalid token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Map an identifier to its keyword kind, if it is one.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "class" => TokenKind::Class,
        "interface" => TokenKind::Interface,
        "enum" => TokenKind::Enum,
        "namespace" => TokenKind::Namespace,
        "return" => TokenKind::Return,
        "new" => TokenKind::New,
        "this" => TokenKind::This,
        "nil" => TokenKind::Nil,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "as" => TokenKind::As,
        _ => return None,
    };
    Some(kind)
}
