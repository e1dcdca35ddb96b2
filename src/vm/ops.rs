//! Arithmetic, bitwise and conversion instructions.
//!
//! Both operands of a binary instruction already have the same primitive
//! type; the compiler inserts the conversions. Integer arithmetic wraps at
//! the operand width.

use nyalang_compiler::bytecode::OpCode;
use nyalang_core::RuntimeError;

use super::value::{Number, Value};

type Result<T> = std::result::Result<T, RuntimeError>;

fn mismatch(op: OpCode, detail: String) -> RuntimeError {
    RuntimeError::TypeMismatch {
        operation: op.name().to_string(),
        detail,
    }
}

macro_rules! int_binary {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {
        Value::$variant(match $op {
            OpCode::Add => $a.wrapping_add($b),
            OpCode::Sub => $a.wrapping_sub($b),
            OpCode::Mul => $a.wrapping_mul($b),
            OpCode::Div | OpCode::Rem if $b == 0 => return Err(RuntimeError::DivisionByZero),
            OpCode::Div => $a.wrapping_div($b),
            OpCode::Rem => $a.wrapping_rem($b),
            OpCode::And => $a & $b,
            OpCode::Or => $a | $b,
            OpCode::Xor => $a ^ $b,
            _ => return Err(mismatch($op, "not an arithmetic instruction".to_string())),
        })
    };
}

macro_rules! float_binary {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {
        Value::$variant(match $op {
            OpCode::Add => $a + $b,
            OpCode::Sub => $a - $b,
            OpCode::Mul => $a * $b,
            OpCode::Div => $a / $b,
            OpCode::Rem => $a % $b,
            _ => return Err(mismatch($op, "bitwise operation on a floating point value".to_string())),
        })
    };
}

/// Evaluate `left op right` for `Add` through `Shr`.
pub fn binary(op: OpCode, left: Value, right: Value) -> Result<Value> {
    if matches!(op, OpCode::Shl | OpCode::Shr) {
        return shift(op, left, &right);
    }

    Ok(match (left, right) {
        (Value::I8(a), Value::I8(b)) => int_binary!(op, a, b, I8),
        (Value::U8(a), Value::U8(b)) => int_binary!(op, a, b, U8),
        (Value::I16(a), Value::I16(b)) => int_binary!(op, a, b, I16),
        (Value::U16(a), Value::U16(b)) => int_binary!(op, a, b, U16),
        (Value::I32(a), Value::I32(b)) => int_binary!(op, a, b, I32),
        (Value::U32(a), Value::U32(b)) => int_binary!(op, a, b, U32),
        (Value::I64(a), Value::I64(b)) => int_binary!(op, a, b, I64),
        (Value::U64(a), Value::U64(b)) => int_binary!(op, a, b, U64),
        (Value::F32(a), Value::F32(b)) => float_binary!(op, a, b, F32),
        (Value::F64(a), Value::F64(b)) => float_binary!(op, a, b, F64),
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(match op {
            OpCode::And => a & b,
            OpCode::Or => a | b,
            OpCode::Xor => a ^ b,
            _ => return Err(mismatch(op, "arithmetic on bool".to_string())),
        }),
        (left, right) => {
            return Err(mismatch(
                op,
                format!("operands are {} and {}", left.kind_name(), right.kind_name()),
            ));
        }
    })
}

fn shift(op: OpCode, left: Value, right: &Value) -> Result<Value> {
    let amount = match right.to_number() {
        Some(Number::Int(n)) => n as u32,
        _ => return Err(mismatch(op, format!("shift amount is {}", right.kind_name()))),
    };

    macro_rules! shifted {
        ($a:expr, $variant:ident) => {
            Value::$variant(if op == OpCode::Shl {
                $a.wrapping_shl(amount)
            } else {
                $a.wrapping_shr(amount)
            })
        };
    }

    Ok(match left {
        Value::I8(a) => shifted!(a, I8),
        Value::U8(a) => shifted!(a, U8),
        Value::I16(a) => shifted!(a, I16),
        Value::U16(a) => shifted!(a, U16),
        Value::I32(a) => shifted!(a, I32),
        Value::U32(a) => shifted!(a, U32),
        Value::I64(a) => shifted!(a, I64),
        Value::U64(a) => shifted!(a, U64),
        other => return Err(mismatch(op, format!("cannot shift {}", other.kind_name()))),
    })
}

pub fn negate(value: Value) -> Result<Value> {
    Ok(match value {
        Value::I8(a) => Value::I8(a.wrapping_neg()),
        Value::U8(a) => Value::U8(a.wrapping_neg()),
        Value::I16(a) => Value::I16(a.wrapping_neg()),
        Value::U16(a) => Value::U16(a.wrapping_neg()),
        Value::I32(a) => Value::I32(a.wrapping_neg()),
        Value::U32(a) => Value::U32(a.wrapping_neg()),
        Value::I64(a) => Value::I64(a.wrapping_neg()),
        Value::U64(a) => Value::U64(a.wrapping_neg()),
        Value::F32(a) => Value::F32(-a),
        Value::F64(a) => Value::F64(-a),
        other => return Err(mismatch(OpCode::Neg, format!("cannot negate {}", other.kind_name()))),
    })
}

/// Apply a `Conv*` instruction. Integer targets truncate to their width.
pub fn convert(op: OpCode, value: Value) -> Result<Value> {
    let number = value
        .to_number()
        .ok_or_else(|| mismatch(op, format!("cannot convert {}", value.kind_name())))?;

    let int = |n: Number| match n {
        Number::Int(i) => i,
        Number::Float(f) => f as i128,
    };
    let float = |n: Number| match n {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    };

    Ok(match op {
        OpCode::ConvI1 => Value::I8(int(number) as i8),
        OpCode::ConvI2 => Value::I16(int(number) as i16),
        OpCode::ConvI4 => Value::I32(int(number) as i32),
        OpCode::ConvI8 => Value::I64(int(number) as i64),
        OpCode::ConvU1 => Value::U8(int(number) as u8),
        OpCode::ConvU2 => Value::U16(int(number) as u16),
        OpCode::ConvU4 => Value::U32(int(number) as u32),
        OpCode::ConvU8 => Value::U64(int(number) as u64),
        OpCode::ConvR4 => Value::F32(float(number) as f32),
        OpCode::ConvR8 | OpCode::ConvRUn => Value::F64(float(number)),
        other => return Err(mismatch(other, "not a conversion".to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_wraps_at_width() {
        assert_eq!(binary(OpCode::Add, Value::U8(250), Value::U8(10)).unwrap(), Value::U8(4));
        assert_eq!(binary(OpCode::Mul, Value::I32(6), Value::I32(7)).unwrap(), Value::I32(42));
        assert_eq!(binary(OpCode::Rem, Value::I64(-7), Value::I64(3)).unwrap(), Value::I64(-1));
    }

    #[test]
    fn integer_division_by_zero() {
        let err = binary(OpCode::Div, Value::I32(1), Value::I32(0)).unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
        assert_eq!(binary(OpCode::Div, Value::F64(1.0), Value::F64(0.0)).unwrap(), Value::F64(f64::INFINITY));
    }

    #[test]
    fn mixed_operands_are_rejected() {
        let err = binary(OpCode::Add, Value::I32(1), Value::I64(1)).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { ref detail, .. } if detail == "operands are int and long"));
    }

    #[test]
    fn bitwise_on_bools_and_shifts() {
        assert_eq!(binary(OpCode::Xor, Value::Bool(true), Value::Bool(true)).unwrap(), Value::Bool(false));
        assert_eq!(binary(OpCode::Shl, Value::I64(1), Value::I32(40)).unwrap(), Value::I64(1 << 40));
        assert_eq!(binary(OpCode::Shr, Value::I32(-8), Value::I32(1)).unwrap(), Value::I32(-4));
        assert!(binary(OpCode::And, Value::F64(1.0), Value::F64(1.0)).is_err());
    }

    #[test]
    fn conversions_truncate() {
        assert_eq!(convert(OpCode::ConvU4, Value::I32(-1)).unwrap(), Value::U32(u32::MAX));
        assert_eq!(convert(OpCode::ConvI1, Value::I32(300)).unwrap(), Value::I8(44));
        assert_eq!(convert(OpCode::ConvI4, Value::F64(-2.9)).unwrap(), Value::I32(-2));
        assert_eq!(convert(OpCode::ConvR4, Value::I32(3)).unwrap(), Value::F32(3.0));
        assert_eq!(convert(OpCode::ConvRUn, Value::U32(7)).unwrap(), Value::F64(7.0));
    }

    #[test]
    fn negation() {
        assert_eq!(negate(Value::I16(5)).unwrap(), Value::I16(-5));
        assert_eq!(negate(Value::F32(1.5)).unwrap(), Value::F32(-1.5));
        assert!(negate(Value::from("x")).is_err());
    }
}
