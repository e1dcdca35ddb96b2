//! Bytecode operation codes.
//!
//! This module defines the instruction set of the NyaLang stack machine.
//! Each opcode is a single byte, with big-endian operands following inline.

use num_enum::TryFromPrimitive;

/// Bytecode operation codes.
///
/// Most operations pop their operands from the evaluation stack and push
/// the result back. Arithmetic opcodes are untyped: the operand values carry
/// their primitive kind and the machine applies the operation in that width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    /// Do nothing.
    Nop = 0,

    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool (8-bit index).
    /// Operand: u8 constant index
    Constant,
    /// Push constant from pool (16-bit index).
    /// Operand: u16 constant index
    ConstantWide,
    /// Push null reference.
    PushNull,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,
    /// Push int 0.
    PushZero,
    /// Push int 1.
    PushOne,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    /// Pop top of stack.
    Pop,
    /// Duplicate top of stack.
    Dup,
    /// Swap the two topmost values.
    Swap,

    // =========================================================================
    // Locals and Arguments
    // =========================================================================
    /// Load local variable.
    /// Operand: u16 slot
    GetLocal,
    /// Store to local variable.
    /// Operand: u16 slot
    SetLocal,
    /// Load argument. Instance methods do not count `this`.
    /// Operand: u16 argument index
    LoadArg,
    /// Store to argument.
    /// Operand: u16 argument index
    StoreArg,
    /// Push the receiver of the current instance method.
    LoadThis,

    // =========================================================================
    // Fields
    // =========================================================================
    /// Pop object, push field value.
    /// Operand: u32 field id
    GetField,
    /// Pop value and object, store field.
    /// Operand: u32 field id
    SetField,
    /// Push static field value.
    /// Operand: u32 field id
    GetStatic,
    /// Pop value into static field.
    /// Operand: u32 field id
    SetStatic,

    // =========================================================================
    // Arithmetic and Bitwise
    // =========================================================================
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Neg,

    // =========================================================================
    // Numeric Conversions
    // =========================================================================
    ConvI1,
    ConvI2,
    ConvI4,
    ConvI8,
    ConvU1,
    ConvU2,
    ConvU4,
    ConvU8,
    ConvR4,
    ConvR8,
    /// Reinterpret an unsigned integer as a floating value.
    ConvRUn,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Unconditional branch.
    /// Operand: u32 absolute offset
    Br,
    /// Pop value, branch if it is non-null, non-zero or true.
    /// Operand: u32 absolute offset
    BrTrue,
    /// Return from the current method. A non-void method returns the top value.
    Ret,

    // =========================================================================
    // Calls and Objects
    // =========================================================================
    /// Call a method directly.
    /// Operand: u32 method id
    Call,
    /// Call a method through the receiver's runtime type.
    /// Operand: u32 method id
    CallVirt,
    /// Allocate an object and run a constructor on it.
    /// Operand: u32 constructor method id
    NewObj,
    /// Pop value, push it back if it is an instance of the type, else null.
    /// Operand: u32 type id
    IsInst,
    /// Pop value, push it back if it is an instance of the type, else fail.
    /// Operand: u32 type id
    CastClass,
}

impl OpCode {
    /// Convert from u8, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from_primitive(value).ok()
    }

    /// Get the size of operands for this opcode in bytes.
    ///
    /// This does NOT include the opcode byte itself.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::Constant => 1,

            OpCode::ConstantWide
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::LoadArg
            | OpCode::StoreArg => 2,

            OpCode::GetField
            | OpCode::SetField
            | OpCode::GetStatic
            | OpCode::SetStatic
            | OpCode::Br
            | OpCode::BrTrue
            | OpCode::Call
            | OpCode::CallVirt
            | OpCode::NewObj
            | OpCode::IsInst
            | OpCode::CastClass => 4,

            _ => 0,
        }
    }

    /// Net change of the evaluation stack depth, or `None` when it depends
    /// on the signature of the called method.
    pub fn stack_effect(&self) -> Option<i32> {
        let effect = match self {
            OpCode::Nop | OpCode::Swap | OpCode::Br | OpCode::Ret => 0,
            OpCode::Constant
            | OpCode::ConstantWide
            | OpCode::PushNull
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::PushZero
            | OpCode::PushOne
            | OpCode::Dup
            | OpCode::GetLocal
            | OpCode::LoadArg
            | OpCode::LoadThis
            | OpCode::GetStatic => 1,
            OpCode::Pop
            | OpCode::SetLocal
            | OpCode::StoreArg
            | OpCode::SetStatic
            | OpCode::BrTrue => -1,
            OpCode::GetField | OpCode::IsInst | OpCode::CastClass | OpCode::Neg => 0,
            OpCode::SetField => -2,
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Rem
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::Shl
            | OpCode::Shr => -1,
            OpCode::ConvI1
            | OpCode::ConvI2
            | OpCode::ConvI4
            | OpCode::ConvI8
            | OpCode::ConvU1
            | OpCode::ConvU2
            | OpCode::ConvU4
            | OpCode::ConvU8
            | OpCode::ConvR4
            | OpCode::ConvR8
            | OpCode::ConvRUn => 0,
            OpCode::Call | OpCode::CallVirt | OpCode::NewObj => return None,
        };
        Some(effect)
    }

    /// Whether the operand is a branch target.
    pub fn is_branch(&self) -> bool {
        matches!(self, OpCode::Br | OpCode::BrTrue)
    }

    /// Get the opcode name for disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Constant => "ldc",
            OpCode::ConstantWide => "ldc.w",
            OpCode::PushNull => "ldnull",
            OpCode::PushTrue => "ldc.true",
            OpCode::PushFalse => "ldc.false",
            OpCode::PushZero => "ldc.0",
            OpCode::PushOne => "ldc.1",
            OpCode::Pop => "pop",
            OpCode::Dup => "dup",
            OpCode::Swap => "swap",
            OpCode::GetLocal => "ldloc",
            OpCode::SetLocal => "stloc",
            OpCode::LoadArg => "ldarg",
            OpCode::StoreArg => "starg",
            OpCode::LoadThis => "ldthis",
            OpCode::GetField => "ldfld",
            OpCode::SetField => "stfld",
            OpCode::GetStatic => "ldsfld",
            OpCode::SetStatic => "stsfld",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Rem => "rem",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Xor => "xor",
            OpCode::Shl => "shl",
            OpCode::Shr => "shr",
            OpCode::Neg => "neg",
            OpCode::ConvI1 => "conv.i1",
            OpCode::ConvI2 => "conv.i2",
            OpCode::ConvI4 => "conv.i4",
            OpCode::ConvI8 => "conv.i8",
            OpCode::ConvU1 => "conv.u1",
            OpCode::ConvU2 => "conv.u2",
            OpCode::ConvU4 => "conv.u4",
            OpCode::ConvU8 => "conv.u8",
            OpCode::ConvR4 => "conv.r4",
            OpCode::ConvR8 => "conv.r8",
            OpCode::ConvRUn => "conv.r.un",
            OpCode::Br => "br",
            OpCode::BrTrue => "brtrue",
            OpCode::Ret => "ret",
            OpCode::Call => "call",
            OpCode::CallVirt => "callvirt",
            OpCode::NewObj => "newobj",
            OpCode::IsInst => "isinst",
            OpCode::CastClass => "castclass",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
