//! Abstract syntax tree for NyaLang.
//!
//! All nodes live in a [`bumpalo::Bump`] arena and borrow from it, so a
//! whole [`Script`] is dropped at once together with the arena.
//!
//! # Example
//!
//! ```
//! use nyalang_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     @public class Cat {
//!         @public !@entry Main(): int { a = 12; return a; }
//!     }
//! "#;
//!
//! let script = Parser::parse(source, &arena).unwrap();
//! assert_eq!(script.items().len(), 1);
//! ```

pub mod ops;
pub mod types;

mod parser;
mod type_parser;

pub mod expr;
mod expr_parser;

pub mod stmt;
mod stmt_parser;

pub mod decl;
mod decl_parser;

pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use parser::Parser;
pub use stmt::*;
pub use types::*;

use nyalang_core::Span;

/// A name with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}

/// A parsed compilation unit.
#[derive(Debug)]
pub struct Script<'ast> {
    items: &'ast [Item<'ast>],
    span: Span,
}

impl<'ast> Script<'ast> {
    pub(crate) fn new(items: &'ast [Item<'ast>], span: Span) -> Self {
        Self { items, span }
    }

    pub fn items(&self) -> &'ast [Item<'ast>] {
        self.items
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_program() {
        let arena = bumpalo::Bump::new();
        let source = r#"
            Title = "NyaTest";
            namespace Zoo {
                @public interface Dog { DoThing(): int; }
                @public @abstract class Animal { @public @virtual Speak(): string { return "..."; } }
                @public class Cat : Animal, Dog {
                    lives: int;
                    @public New() { lives = 9; }
                    @public DoThing(): int { return 10; }
                    @public Foo(a: string, b?: string, c: string = "bacon"): string { b ?= c; return a ?? b; }
                    @public !@entry Main(args: string[]): double { a = 12; return a + 0.5d; }
                }
                enum Mood { Happy, Grumpy = 5 }
            }
            Helper(x: int): int { return x * 2; }
        "#;
        let script = Parser::parse(source, &arena).unwrap();
        assert_eq!(script.items().len(), 3);
        let Item::Namespace(zoo) = script.items()[1] else { panic!() };
        assert_eq!(zoo.items.len(), 4);
    }

    #[test]
    fn parse_reports_errors() {
        let arena = bumpalo::Bump::new();
        let errors = Parser::parse("class Cat { Foo( }", &arena).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn empty_source() {
        let arena = bumpalo::Bump::new();
        let script = Parser::parse("// nothing here\n", &arena).unwrap();
        assert!(script.items().is_empty());
    }
}
