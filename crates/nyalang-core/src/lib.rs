//! Core types shared by every NyaLang crate.
//!
//! - [`Span`] for source positions
//! - [`TypeId`], [`MethodId`], [`FieldId`] indices into the program image
//! - [`TypeHash`] for name and signature lookup tables
//! - the error hierarchy rooted at [`NyaError`]

mod error;
mod ids;
mod span;
mod type_hash;

pub use error::{
    CompilationError, LexError, NyaError, ParseError, ParseErrorKind, ParseErrors, RuntimeError,
};
pub use ids::{FieldId, MethodId, TypeId};
pub use span::Span;
pub use type_hash::TypeHash;
