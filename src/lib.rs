//! NyaLang
//!
//! Compile NyaLang scripts into program images and run them.
//!
//! ```text
//! source ──► nyalang_parser ──► nyalang_compiler ──► ProgramImage ──► Vm
//! ```
//!
//! - [`Unit`]: add sources, build, run
//! - [`vm`]: the stack machine executing an image
//!
//! The member crates are re-exported as [`core`], [`parser`] and
//! [`compiler`].

pub mod unit;
pub mod vm;

pub use nyalang_compiler as compiler;
pub use nyalang_core as core;
pub use nyalang_parser as parser;

pub use nyalang_compiler::{CompileOptions, ProgramImage};
pub use nyalang_core::{CompilationError, NyaError, RuntimeError};
pub use unit::{Unit, UnitError};
pub use vm::{Value, Vm};
