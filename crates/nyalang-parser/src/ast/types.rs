//! Type expressions as written in source: `int`, `Zoo.Cat`, `List<int>`, `string[]`.

use nyalang_core::Span;
use std::fmt;

/// A written type reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeExpr<'ast> {
    /// The (possibly dotted) name, e.g. `System.Text.StringBuilder`.
    pub name: &'ast str,
    /// Generic arguments, empty for non-generic types.
    pub type_args: &'ast [TypeExpr<'ast>],
    /// Number of `[]` suffixes.
    pub array_rank: u32,
    pub span: Span,
}

impl<'ast> TypeExpr<'ast> {
    pub fn simple(name: &'ast str, span: Span) -> Self {
        Self {
            name,
            type_args: &[],
            array_rank: 0,
            span,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_args.is_empty()
    }

    pub fn is_array(&self) -> bool {
        self.array_rank > 0
    }
}

impl fmt::Display for TypeExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if !self.type_args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.type_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.array_rank {
            f.write_str("[]")?;
        }
        Ok(())
    }
}
