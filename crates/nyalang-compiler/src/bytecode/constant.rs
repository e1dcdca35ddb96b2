//! Constant pool for program images.
//!
//! The constant pool stores the literal values referenced by `ldc`
//! instructions: 32/64-bit integers, floats and strings.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Values stored in the constant pool.
///
/// Floats are wrapped in [`OrderedFloat`] so constants can key the
/// deduplication index directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int32(i32),
    /// The wide integer constant used for `long`/`ulong` literals.
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    String(String),
}

impl Constant {
    /// Tag byte used by the image writer.
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Int32(_) => 1,
            Constant::Int64(_) => 2,
            Constant::Float32(_) => 3,
            Constant::Float64(_) => 4,
            Constant::String(_) => 5,
        }
    }
}

/// Image-wide constant pool with deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<Constant, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant.clone());
        self.index.insert(constant, idx);
        idx
    }

    pub fn add_i32(&mut self, value: i32) -> u32 {
        self.add(Constant::Int32(value))
    }

    pub fn add_i64(&mut self, value: i64) -> u32 {
        self.add(Constant::Int64(value))
    }

    pub fn add_f32(&mut self, value: f32) -> u32 {
        self.add(Constant::Float32(OrderedFloat(value)))
    }

    pub fn add_f64(&mut self, value: f64) -> u32 {
        self.add(Constant::Float64(OrderedFloat(value)))
    }

    pub fn add_string(&mut self, value: impl Into<String>) -> u32 {
        self.add(Constant::String(value.into()))
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// Get all constants (for serialization).
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}
