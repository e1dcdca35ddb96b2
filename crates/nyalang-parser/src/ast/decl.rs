//! Top-level and member declarations.

use crate::ast::expr::LiteralExpr;
use crate::ast::stmt::Block;
use crate::ast::types::TypeExpr;
use crate::ast::Ident;
use nyalang_core::Span;

/// A top-level item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    /// `Key = literal;`
    BuildInfo(BuildInfoDecl<'ast>),
    Namespace(NamespaceDecl<'ast>),
    Class(ClassDecl<'ast>),
    Enum(EnumDecl<'ast>),
    /// A global function, always static.
    Method(MethodDecl<'ast>),
}

impl<'ast> Item<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::BuildInfo(d) => d.span,
            Self::Namespace(d) => d.span,
            Self::Class(d) => d.span,
            Self::Enum(d) => d.span,
            Self::Method(d) => d.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildInfoDecl<'ast> {
    pub key: Ident<'ast>,
    pub value: LiteralExpr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamespaceDecl<'ast> {
    /// Dotted namespace name.
    pub name: &'ast str,
    pub items: &'ast [Item<'ast>],
    pub span: Span,
}

/// `@name`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attribute<'ast> {
    pub name: Ident<'ast>,
    pub span: Span,
}

/// Attributes plus the `!` staticness marker, in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Modifiers<'ast> {
    pub attributes: &'ast [Attribute<'ast>],
    pub is_static: bool,
}

impl<'ast> Modifiers<'ast> {
    pub fn has(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
}

/// A class or interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDecl<'ast> {
    pub modifiers: Modifiers<'ast>,
    pub kind: ClassKind,
    pub name: Ident<'ast>,
    /// Base class first (if any), then interfaces, as written.
    pub dependencies: &'ast [TypeExpr<'ast>],
    pub members: &'ast [ClassMember<'ast>],
    pub span: Span,
}

impl<'ast> ClassDecl<'ast> {
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl<'ast>> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Method(method) => Some(method),
            ClassMember::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl<'ast>> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Field(field) => Some(field),
            ClassMember::Method(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassMember<'ast> {
    Field(FieldDecl<'ast>),
    Method(MethodDecl<'ast>),
}

/// `name: type;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl<'ast> {
    pub modifiers: Modifiers<'ast>,
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// `modifiers Name(params): type { body }` or `...;` without a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodDecl<'ast> {
    pub modifiers: Modifiers<'ast>,
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    /// `None` means void.
    pub return_type: Option<TypeExpr<'ast>>,
    pub body: Option<Block<'ast>>,
    pub span: Span,
}

/// `a: T`, `b?: T`, or `c: T = literal`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub optional: bool,
    pub default: Option<LiteralExpr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumDecl<'ast> {
    pub modifiers: Modifiers<'ast>,
    pub name: Ident<'ast>,
    pub values: &'ast [EnumValue<'ast>],
    pub span: Span,
}

/// `Name` or `Name = literal`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumValue<'ast> {
    pub name: Ident<'ast>,
    pub value: Option<LiteralExpr<'ast>>,
    pub span: Span,
}
