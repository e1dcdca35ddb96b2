//! Bytecode types for the NyaLang compiler.
//!
//! - [`OpCode`] - The instruction set of the stack machine
//! - [`BytecodeChunk`] - Compiled bytecode for a method
//! - [`Constant`] and [`ConstantPool`] - Image-wide constant storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::{BytecodeChunk, Instruction};
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
