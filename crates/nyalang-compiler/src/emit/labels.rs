//! Branch labels with forward-reference fixups.
//!
//! A label may be referenced by branches before its position is known.
//! Each reference records the offset of its 32-bit operand; once every
//! label is marked the operands are patched with absolute offsets.

use crate::bytecode::BytecodeChunk;
use thiserror::Error;

/// A branch target within one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label {0} marked twice")]
    AlreadyMarked(u32),
    #[error("label {0} is referenced but never marked")]
    Unmarked(u32),
    #[error("label {0} was not defined by this emitter")]
    Unknown(u32),
}

impl From<LabelError> for nyalang_core::CompilationError {
    fn from(err: LabelError) -> Self {
        nyalang_core::CompilationError::internal(err.to_string())
    }
}

#[derive(Debug, Default)]
struct LabelState {
    target: Option<usize>,
    fixups: Vec<usize>,
}

/// Tracks label positions and pending branch operands.
#[derive(Debug, Default)]
pub struct LabelManager {
    labels: Vec<LabelState>,
}

impl LabelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(LabelState::default());
        label
    }

    pub fn mark(&mut self, label: Label, offset: usize) -> Result<(), LabelError> {
        let state = self.state(label)?;
        if state.target.is_some() {
            return Err(LabelError::AlreadyMarked(label.0));
        }
        state.target = Some(offset);
        Ok(())
    }

    /// Record a branch operand at `operand_offset` that must point at `label`.
    pub fn add_fixup(&mut self, label: Label, operand_offset: usize) -> Result<(), LabelError> {
        self.state(label)?.fixups.push(operand_offset);
        Ok(())
    }

    pub fn is_marked(&self, label: Label) -> bool {
        self.labels
            .get(label.0 as usize)
            .is_some_and(|state| state.target.is_some())
    }

    /// Patch every recorded branch operand in `chunk`.
    pub fn resolve(&self, chunk: &mut BytecodeChunk) -> Result<(), LabelError> {
        for (index, state) in self.labels.iter().enumerate() {
            if state.fixups.is_empty() {
                continue;
            }
            let target = state.target.ok_or(LabelError::Unmarked(index as u32))?;
            for &operand in &state.fixups {
                chunk.patch_u32(operand, target as u32);
            }
        }
        Ok(())
    }

    fn state(&mut self, label: Label) -> Result<&mut LabelState, LabelError> {
        self.labels
            .get_mut(label.0 as usize)
            .ok_or(LabelError::Unknown(label.0))
    }
}
