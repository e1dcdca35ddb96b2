//! Statement nodes: assignment, return, and expression statements.

use crate::ast::expr::Expr;
use crate::ast::types::TypeExpr;
use crate::ast::{AssignOp, Ident};
use nyalang_core::Span;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    Assign(AssignStmt<'ast>),
    Return(ReturnStmt<'ast>),
    Expr(ExprStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Assign(s) => s.span,
            Self::Return(s) => s.span,
            Self::Expr(s) => s.span,
        }
    }
}

/// What an assignment writes to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignTarget<'ast> {
    /// A local, parameter, or field of the current type.
    Name(Ident<'ast>),
    /// `object.field`
    Member {
        object: &'ast Expr<'ast>,
        member: Ident<'ast>,
    },
}

/// `name (: type)? op value;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignStmt<'ast> {
    pub target: AssignTarget<'ast>,
    /// Explicit annotation on a first assignment.
    pub ty: Option<TypeExpr<'ast>>,
    pub op: AssignOp,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

impl<'ast> Block<'ast> {
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Whether the last statement is a `return`.
    pub fn ends_with_return(&self) -> bool {
        matches!(self.stmts.last(), Some(Stmt::Return(_)))
    }
}
