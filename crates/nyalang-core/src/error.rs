//! Error types for every phase of NyaLang processing.
//!
//! ## Error Hierarchy
//!
//! ```text
//! NyaError (top-level wrapper)
//! ├── LexError          - tokenization errors
//! ├── ParseErrors       - one or more ParseError (with ParseErrorKind)
//! ├── CompilationError  - metadata, declaration and codegen failures
//! ├── RuntimeError      - failures while executing a program image
//! └── Io                - reading sources or saving images
//! ```
//!
//! Every compilation failure is terminal: passes return the first error they
//! hit and the driver abandons the whole compilation.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur while turning source text into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    #[error("unterminated regex literal at {span}")]
    UnterminatedRegex { span: Span },

    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedRegex { span } => *span,
            LexError::UnterminatedComment { span } => *span,
            LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    ExpectedToken,
    UnexpectedToken,
    UnexpectedEof,
    ExpectedExpression,
    ExpectedType,
    ExpectedStatement,
    ExpectedDeclaration,
    ExpectedIdentifier,
    InvalidSyntax,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedDeclaration => "expected declaration",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::InvalidSyntax => "invalid syntax",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected X, found Y" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    pub fn unexpected_eof(span: Span) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, span, "unexpected end of file")
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(ParseErrorKind::InvalidSyntax, err.span(), err.to_string())
    }
}

/// All errors collected while parsing one source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn first(&self) -> Option<&ParseError> {
        self.errors.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<ParseError> {
        self.errors
    }
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// Errors raised by the metadata, declaration and codegen passes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// The class dependency graph contains a cycle.
    #[error("at {span}: cyclic dependency between types: {path}")]
    CyclicDependency {
        /// The cycle, rendered as `A -> B -> A`.
        path: String,
        span: Span,
    },

    /// A type name could not be found among declared or host types.
    #[error("at {span}: unresolved type '{name}'")]
    UnresolvedType { name: String, span: Span },

    /// No method with the requested name and argument types exists anywhere
    /// in the resolution chain.
    #[error("at {span}: unresolved method '{type_name}.{name}({args})'")]
    UnresolvedMethod {
        type_name: String,
        name: String,
        args: String,
        span: Span,
    },

    /// No implicit or explicit conversion path exists between two types.
    #[error("at {span}: cannot convert '{from}' to '{to}'")]
    Conversion { from: String, to: String, span: Span },

    /// An override or constructor chain breaks the visibility rules.
    #[error("at {span}: '{name}' {reason}")]
    Visibility {
        name: String,
        reason: String,
        span: Span,
    },

    /// Operand stack bookkeeping did not return to zero at method exit.
    #[error("stack imbalance in '{method}': depth {depth} at return")]
    StackImbalance { method: String, depth: i32 },

    /// A second method was marked `@entry`.
    #[error("at {span}: entry point '{second}' conflicts with '{first}'")]
    DuplicateEntryPoint {
        first: String,
        second: String,
        span: Span,
    },

    #[error("at {span}: undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    #[error("at {span}: invalid literal '{text}': {reason}")]
    InvalidLiteral {
        text: String,
        reason: String,
        span: Span,
    },

    #[error("at {span}: invalid build info '{key}': {reason}")]
    InvalidBuildInfo {
        key: String,
        reason: String,
        span: Span,
    },

    #[error("at {span}: invalid declaration of '{name}': {reason}")]
    InvalidDeclaration {
        name: String,
        reason: String,
        span: Span,
    },

    /// A non-void method can reach its end without returning a value.
    #[error("at {span}: method '{method}' must end with a return statement")]
    MissingReturn { method: String, span: Span },

    #[error("at {span}: cannot instantiate abstract type '{type_name}'")]
    AbstractInstantiation { type_name: String, span: Span },

    #[error("at {span}: '{type_name}' does not implement '{interface}.{method}'")]
    UnimplementedInterfaceMethod {
        type_name: String,
        interface: String,
        method: String,
        span: Span,
    },

    #[error("at {span}: '{name}' is already defined")]
    DuplicateDefinition { name: String, span: Span },

    /// Invariant violation inside the compiler.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Where the error occurred. Synthetic for errors without a source location.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::CyclicDependency { span, .. } => *span,
            CompilationError::UnresolvedType { span, .. } => *span,
            CompilationError::UnresolvedMethod { span, .. } => *span,
            CompilationError::Conversion { span, .. } => *span,
            CompilationError::Visibility { span, .. } => *span,
            CompilationError::StackImbalance { .. } => Span::default(),
            CompilationError::DuplicateEntryPoint { span, .. } => *span,
            CompilationError::UndefinedVariable { span, .. } => *span,
            CompilationError::InvalidLiteral { span, .. } => *span,
            CompilationError::InvalidBuildInfo { span, .. } => *span,
            CompilationError::InvalidDeclaration { span, .. } => *span,
            CompilationError::MissingReturn { span, .. } => *span,
            CompilationError::AbstractInstantiation { span, .. } => *span,
            CompilationError::UnimplementedInterfaceMethod { span, .. } => *span,
            CompilationError::DuplicateDefinition { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Errors raised while executing a program image.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("operand stack underflow in '{method}'")]
    StackUnderflow { method: String },

    #[error("type mismatch in {operation}: {detail}")]
    TypeMismatch { operation: String, detail: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("null reference in {operation}")]
    NullReference { operation: String },

    #[error("invalid opcode {byte:#04x} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    #[error("method '{name}' has no body")]
    MissingBody { name: String },

    #[error("no method named '{name}'")]
    UnknownMethod { name: String },

    #[error("program has no entry point")]
    NoEntryPoint,

    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Top-level error for the whole pipeline.
#[derive(Debug, Error)]
pub enum NyaError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseErrors),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NyaError {
    pub fn is_parse(&self) -> bool {
        matches!(self, NyaError::Parse(_) | NyaError::Lex(_))
    }

    pub fn is_compilation(&self) -> bool {
        matches!(self, NyaError::Compilation(_))
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, NyaError::Runtime(_))
    }

    /// The compilation error inside, if this is one.
    pub fn as_compilation(&self) -> Option<&CompilationError> {
        match self {
            NyaError::Compilation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for NyaError {
    fn from(error: ParseError) -> Self {
        NyaError::Parse(error.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
