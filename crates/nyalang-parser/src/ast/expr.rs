//! Expression nodes.
//!
//! Precedence, lowest first:
//! 1. `??` (right associative)
//! 2. `|`
//! 3. `^`
//! 4. `&`
//! 5. `<<` `>>`
//! 6. `+` `-`
//! 7. `*` `/` `%`
//! 8. prefix `-` and C-style casts
//! 9. `as`
//! 10. calls and member access

use crate::ast::types::TypeExpr;
use crate::ast::{BinaryOp, Ident, UnaryOp};
use nyalang_core::Span;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    Literal(LiteralExpr<'ast>),
    /// A bare name: a variable, or a type used as a static receiver.
    Ident(Ident<'ast>),
    This(Span),
    Binary(&'ast BinaryExpr<'ast>),
    Unary(&'ast UnaryExpr<'ast>),
    /// `(Type) expr`
    Cast(&'ast CastExpr<'ast>),
    /// `expr as Type`
    As(&'ast AsExpr<'ast>),
    /// `new Type(args)`
    New(&'ast NewExpr<'ast>),
    /// `name(args)` or `receiver.name(args)`
    Call(&'ast CallExpr<'ast>),
    /// `object.member`
    Member(&'ast MemberExpr<'ast>),
    Paren(&'ast Expr<'ast>, Span),
}

impl<'ast> Expr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::This(span) => *span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Cast(e) => e.span,
            Self::As(e) => e.span,
            Self::New(e) => e.span,
            Self::Call(e) => e.span,
            Self::Member(e) => e.span,
            Self::Paren(_, span) => *span,
        }
    }

    /// Flatten `A.B.C` into its dotted name, if the expression is only names.
    pub fn as_dotted_name(&self) -> Option<String> {
        match self {
            Self::Ident(ident) => Some(ident.name.to_string()),
            Self::Member(member) => {
                let mut prefix = member.object.as_dotted_name()?;
                prefix.push('.');
                prefix.push_str(member.member.name);
                Some(prefix)
            }
            _ => None,
        }
    }
}

/// A literal token, kept as raw source text.
///
/// Turning the text into a value (suffixes, escapes, regex flags) is the
/// compiler's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub kind: LiteralKind,
    pub text: &'ast str,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Real,
    String,
    Regex,
    Bool,
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub target: TypeExpr<'ast>,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsExpr<'ast> {
    pub operand: &'ast Expr<'ast>,
    pub target: TypeExpr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewExpr<'ast> {
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    /// `None` for free calls (intrinsics, globals, or implicit `this`).
    pub receiver: Option<&'ast Expr<'ast>>,
    pub name: Ident<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub member: Ident<'ast>,
    pub span: Span,
}
