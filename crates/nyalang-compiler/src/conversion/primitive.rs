//! Primitive type conversions.
//!
//! A data-driven table from (source kind, target kind) to the conversion
//! instructions that produce the target representation.

use crate::bytecode::OpCode;
use crate::image::PrimitiveKind;

/// Instructions converting a `from` value to `to`, or `None` if the pair
/// has no primitive conversion.
///
/// `bool` converts to nothing. Unsigned integers cannot become `double`.
pub fn find_primitive_conversion(from: PrimitiveKind, to: PrimitiveKind) -> Option<&'static [OpCode]> {
    if from == to {
        return Some(&[]);
    }
    if !from.is_numeric() || !to.is_numeric() {
        return None;
    }

    match to {
        PrimitiveKind::F32 if from.is_unsigned() => Some(&[OpCode::ConvRUn, OpCode::ConvR4]),
        PrimitiveKind::F32 => Some(&[OpCode::ConvR4]),
        PrimitiveKind::F64 if from.is_unsigned() => None,
        PrimitiveKind::F64 => Some(&[OpCode::ConvR8]),
        PrimitiveKind::I8 => Some(&[OpCode::ConvI1]),
        PrimitiveKind::I16 => Some(&[OpCode::ConvI2]),
        PrimitiveKind::I32 => Some(&[OpCode::ConvI4]),
        PrimitiveKind::I64 => Some(&[OpCode::ConvI8]),
        PrimitiveKind::U8 => Some(&[OpCode::ConvU1]),
        PrimitiveKind::U16 => Some(&[OpCode::ConvU2]),
        PrimitiveKind::U32 => Some(&[OpCode::ConvU4]),
        PrimitiveKind::U64 => Some(&[OpCode::ConvU8]),
        PrimitiveKind::Bool => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PrimitiveKind::*;

    #[test]
    fn to_float_depends_on_signedness() {
        assert_eq!(find_primitive_conversion(I32, F32), Some(&[OpCode::ConvR4][..]));
        assert_eq!(find_primitive_conversion(F64, F32), Some(&[OpCode::ConvR4][..]));
        assert_eq!(find_primitive_conversion(U32, F32), Some(&[OpCode::ConvRUn, OpCode::ConvR4][..]));
    }

    #[test]
    fn to_double_only_from_signed_or_floating() {
        assert_eq!(find_primitive_conversion(I64, F64), Some(&[OpCode::ConvR8][..]));
        assert_eq!(find_primitive_conversion(F32, F64), Some(&[OpCode::ConvR8][..]));
        for unsigned in [U8, U16, U32, U64] {
            assert_eq!(find_primitive_conversion(unsigned, F64), None);
        }
    }

    #[test]
    fn integer_targets_use_their_opcode() {
        assert_eq!(find_primitive_conversion(F64, I32), Some(&[OpCode::ConvI4][..]));
        assert_eq!(find_primitive_conversion(I32, U8), Some(&[OpCode::ConvU1][..]));
        assert_eq!(find_primitive_conversion(U64, I16), Some(&[OpCode::ConvI2][..]));
    }

    #[test]
    fn bool_is_not_numeric() {
        assert_eq!(find_primitive_conversion(Bool, I32), None);
        assert_eq!(find_primitive_conversion(I32, Bool), None);
        assert_eq!(find_primitive_conversion(Bool, Bool), Some(&[][..]));
    }
}
