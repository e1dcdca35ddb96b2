//! Compiler passes.
//!
//! - [`metadata`]: Stage 0 - build-info declarations to image metadata
//! - [`declaration`]: Stage 1 - declare types, fields and method signatures
//!   in dependency order
//! - [`codegen`]: Stage 2 - emit method bodies and finalize types

pub mod codegen;
pub mod declaration;
pub mod metadata;

pub use codegen::{CodegenOutput, CodegenPass};
pub use declaration::DeclarationPass;
pub use metadata::MetadataPass;
