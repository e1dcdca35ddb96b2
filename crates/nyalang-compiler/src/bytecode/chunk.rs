//! Bytecode chunk for compiled methods.
//!
//! A `BytecodeChunk` contains the compiled bytecode for a single method,
//! along with line number information for diagnostics.

use super::OpCode;
use std::fmt::Write as _;

/// A decoded instruction: opcode plus its operand widened to `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub op: OpCode,
    pub operand: u32,
}

/// A chunk of compiled bytecode for a single method.
///
/// Constants are stored in the image-wide `ConstantPool`, not per-method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    /// The bytecode instructions.
    code: Vec<u8>,
    /// Line numbers, one per byte of `code`.
    lines: Vec<u32>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op as u8);
        self.lines.push(line);
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Write a 32-bit operand (big-endian).
    pub fn write_u32(&mut self, value: u32, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Overwrite a previously written 32-bit operand.
    ///
    /// Returns `false` if the operand lies outside the chunk.
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> bool {
        match self.code.get_mut(offset..offset + 4) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_be_bytes());
                true
            }
            None => false,
        }
    }

    /// Current code offset, the position of the next written byte.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Big-endian operand of `width` bytes at `offset`.
    fn read_operand(&self, offset: usize, width: usize) -> Option<u32> {
        let bytes = self.code.get(offset..offset + width)?;
        Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Decode the instruction starting at `offset`.
    pub fn decode(&self, offset: usize) -> Option<Instruction> {
        let op = OpCode::from_u8(self.read_byte(offset)?)?;
        let operand = self.read_operand(offset + 1, op.operand_size())?;
        Some(Instruction {
            offset,
            op,
            operand,
        })
    }

    /// Iterate over all decodable instructions in order.
    pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
        let mut offset = 0;
        std::iter::from_fn(move || {
            let instruction = self.decode(offset)?;
            offset += 1 + instruction.op.operand_size();
            Some(instruction)
        })
    }

    /// The opcode sequence, operands dropped.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions().map(|i| i.op).collect()
    }

    /// Render a human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for Instruction { offset, op, operand } in self.instructions() {
            if op.operand_size() == 0 {
                let _ = writeln!(out, "{offset:04} {op}");
            } else {
                let _ = writeln!(out, "{offset:04} {op} {operand}");
            }
        }
        out
    }

    /// Panics with both listings when the opcode sequence differs.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }
}
