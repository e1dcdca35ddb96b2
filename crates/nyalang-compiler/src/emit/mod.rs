//! Bytecode emitter for NyaLang method bodies.
//!
//! The [`MethodEmitter`] appends instructions to a single method body and
//! keeps a running count of the evaluation stack depth, so codegen can check
//! that every statement leaves the stack balanced.
//!
//! # Example
//!
//! ```
//! use nyalang_compiler::bytecode::{ConstantPool, OpCode};
//! use nyalang_compiler::emit::MethodEmitter;
//!
//! let mut constants = ConstantPool::new();
//! let mut emitter = MethodEmitter::new();
//!
//! emitter.emit_i32(&mut constants, 42);
//! emitter.emit_i32(&mut constants, 10);
//! emitter.emit(OpCode::Add);
//! assert_eq!(emitter.stack_depth(), 1);
//! emitter.emit(OpCode::Pop);
//!
//! let body = emitter.finish().unwrap();
//! assert_eq!(body.max_stack, 2);
//! ```

mod labels;

use nyalang_core::{FieldId, MethodId, TypeId};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
use crate::image::MethodBody;

pub use labels::{Label, LabelError, LabelManager};

/// Emits bytecode for one method.
///
/// Constants go to the image-wide pool passed to each constant-emitting call.
#[derive(Debug)]
pub struct MethodEmitter {
    chunk: BytecodeChunk,
    labels: LabelManager,
    /// Declared local slots and their types.
    locals: Vec<TypeId>,
    stack_depth: i32,
    max_stack: i32,
    current_line: u32,
}

impl Default for MethodEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodEmitter {
    pub fn new() -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            labels: LabelManager::new(),
            locals: Vec::new(),
            stack_depth: 0,
            max_stack: 0,
            current_line: 1,
        }
    }

    /// Set current source line for diagnostics.
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    // ==========================================================================
    // Stack Bookkeeping
    // ==========================================================================

    /// Current tracked evaluation stack depth.
    pub fn stack_depth(&self) -> i32 {
        self.stack_depth
    }

    /// High-water mark of the evaluation stack.
    pub fn max_stack(&self) -> i32 {
        self.max_stack
    }

    /// Adjust the tracked depth without emitting anything.
    ///
    /// Used where control leaves the straight-line path, such as a `return`
    /// branching to the shared exit with its value.
    pub fn adjust_depth(&mut self, delta: i32) {
        self.stack_depth += delta;
        self.max_stack = self.max_stack.max(self.stack_depth);
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit an opcode with no operands.
    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
        self.adjust_depth(op.stack_effect().unwrap_or(0));
    }

    fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.emit(op);
        self.chunk.write_u16(value, self.current_line);
    }

    fn emit_u32(&mut self, op: OpCode, value: u32) {
        self.emit(op);
        self.chunk.write_u32(value, self.current_line);
    }

    /// Emit a constant load, narrow or wide depending on the pool index.
    pub fn emit_constant(&mut self, constants: &mut ConstantPool, constant: Constant) {
        let index = constants.add(constant);
        if index < 256 {
            self.emit(OpCode::Constant);
            self.chunk.write_byte(index as u8, self.current_line);
        } else {
            self.emit_u16(OpCode::ConstantWide, index as u16);
        }
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Emit a 32-bit integer. 0 and 1 use `PushZero` and `PushOne`.
    pub fn emit_i32(&mut self, constants: &mut ConstantPool, value: i32) {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            _ => self.emit_constant(constants, Constant::Int32(value)),
        }
    }

    pub fn emit_i64(&mut self, constants: &mut ConstantPool, value: i64) {
        self.emit_constant(constants, Constant::Int64(value));
    }

    pub fn emit_f32(&mut self, constants: &mut ConstantPool, value: f32) {
        self.emit_constant(constants, Constant::Float32(value.into()));
    }

    pub fn emit_f64(&mut self, constants: &mut ConstantPool, value: f64) {
        self.emit_constant(constants, Constant::Float64(value.into()));
    }

    pub fn emit_string(&mut self, constants: &mut ConstantPool, value: &str) {
        self.emit_constant(constants, Constant::String(value.to_string()));
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    pub fn emit_null(&mut self) {
        self.emit(OpCode::PushNull);
    }

    // ==========================================================================
    // Locals, Arguments and Fields
    // ==========================================================================

    /// Declare a new local slot of the given type.
    pub fn declare_local(&mut self, ty: TypeId) -> u16 {
        self.locals.push(ty);
        (self.locals.len() - 1) as u16
    }

    pub fn local_type(&self, slot: u16) -> Option<TypeId> {
        self.locals.get(slot as usize).copied()
    }

    pub fn emit_get_local(&mut self, slot: u16) {
        self.emit_u16(OpCode::GetLocal, slot);
    }

    pub fn emit_set_local(&mut self, slot: u16) {
        self.emit_u16(OpCode::SetLocal, slot);
    }

    pub fn emit_load_arg(&mut self, index: u16) {
        self.emit_u16(OpCode::LoadArg, index);
    }

    pub fn emit_store_arg(&mut self, index: u16) {
        self.emit_u16(OpCode::StoreArg, index);
    }

    /// Emit one of `GetField`, `SetField`, `GetStatic`, `SetStatic`.
    pub fn emit_field(&mut self, op: OpCode, field: FieldId) {
        self.emit_u32(op, field.as_u32());
    }

    /// Emit `IsInst` or `CastClass`.
    pub fn emit_type_check(&mut self, op: OpCode, ty: TypeId) {
        self.emit_u32(op, ty.as_u32());
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Emit `Call`, `CallVirt` or `NewObj`.
    ///
    /// `pops` counts every value the call consumes, including the receiver;
    /// `pushes` is 1 for a value-returning call or a constructor.
    pub fn emit_call(&mut self, op: OpCode, method: MethodId, pops: u32, pushes: u32) {
        self.emit_u32(op, method.as_u32());
        self.adjust_depth(pushes as i32 - pops as i32);
    }

    // ==========================================================================
    // Labels and Branches
    // ==========================================================================

    pub fn define_label(&mut self) -> Label {
        self.labels.define()
    }

    /// Bind a label to the current offset.
    pub fn mark_label(&mut self, label: Label) -> Result<(), LabelError> {
        self.labels.mark(label, self.chunk.current_offset())
    }

    /// Emit `Br` or `BrTrue` to a label, patched when the body is finished.
    pub fn emit_branch(&mut self, op: OpCode, label: Label) -> Result<(), LabelError> {
        self.emit(op);
        self.labels.add_fixup(label, self.chunk.current_offset())?;
        self.chunk.write_u32(u32::MAX, self.current_line);
        Ok(())
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    /// Resolve branches and produce the finished body.
    pub fn finish(mut self) -> Result<MethodBody, LabelError> {
        self.labels.resolve(&mut self.chunk)?;
        Ok(MethodBody {
            code: self.chunk,
            locals: self.locals,
            max_stack: self.max_stack.clamp(0, u16::MAX as i32) as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_use_dedicated_opcodes() {
        let mut pool = ConstantPool::new();
        let mut emitter = MethodEmitter::new();
        emitter.emit_i32(&mut pool, 0);
        emitter.emit_i32(&mut pool, 1);
        emitter.emit_i32(&mut pool, 12);

        emitter
            .chunk()
            .assert_opcodes(&[OpCode::PushZero, OpCode::PushOne, OpCode::Constant]);
        assert_eq!(pool.len(), 1);
        assert_eq!(emitter.stack_depth(), 3);
    }

    #[test]
    fn wide_constant_index() {
        let mut pool = ConstantPool::new();
        for i in 0..256 {
            pool.add_i32(i + 1000);
        }
        let mut emitter = MethodEmitter::new();
        emitter.emit_string(&mut pool, "wide");
        emitter.chunk().assert_opcodes(&[OpCode::ConstantWide]);
    }

    #[test]
    fn stack_depth_tracks_calls() {
        let mut pool = ConstantPool::new();
        let mut emitter = MethodEmitter::new();
        emitter.emit(OpCode::LoadThis);
        emitter.emit_f64(&mut pool, 2.0);
        emitter.emit_call(OpCode::CallVirt, MethodId::new(3), 2, 1);
        assert_eq!(emitter.stack_depth(), 1);
        emitter.emit(OpCode::Pop);
        assert_eq!(emitter.stack_depth(), 0);
        assert_eq!(emitter.max_stack(), 2);
    }

    #[test]
    fn locals_get_sequential_slots() {
        let mut emitter = MethodEmitter::new();
        let a = emitter.declare_local(TypeId::new(7));
        let b = emitter.declare_local(TypeId::new(9));
        assert_eq!((a, b), (0, 1));
        assert_eq!(emitter.local_type(b), Some(TypeId::new(9)));
        assert_eq!(emitter.local_type(5), None);
    }

    #[test]
    fn branch_to_shared_exit() {
        let mut emitter = MethodEmitter::new();
        let exit = emitter.define_label();
        emitter.emit(OpCode::PushOne);
        emitter.adjust_depth(-1);
        emitter.emit_branch(OpCode::Br, exit).unwrap();
        emitter.mark_label(exit).unwrap();
        emitter.emit(OpCode::Ret);

        assert_eq!(emitter.stack_depth(), 0);
        let body = emitter.finish().unwrap();
        body.code.assert_opcodes(&[OpCode::PushOne, OpCode::Br, OpCode::Ret]);
        assert_eq!(body.code.decode(1).unwrap().operand, 6);
    }

    #[test]
    fn finish_fails_on_unmarked_label() {
        let mut emitter = MethodEmitter::new();
        let label = emitter.define_label();
        emitter.emit_branch(OpCode::Br, label).unwrap();
        assert!(matches!(emitter.finish(), Err(LabelError::Unmarked(_))));
    }
}
