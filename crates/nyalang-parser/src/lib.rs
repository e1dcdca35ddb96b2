//! Lexer and parser for NyaLang source code.
//!
//! Produces an arena-allocated [`ast::Script`] that the compiler passes walk.
//! Literal tokens keep their raw text; evaluating suffixes and escapes is left
//! to the compiler.

pub mod ast;
pub mod lexer;

pub use ast::{Parser, Script};
pub use lexer::{Lexer, Token, TokenKind};
