//! Native implementations of host methods.

use nyalang_compiler::image::{ArithOp, HostOp, PrimitiveKind};
use nyalang_compiler::literal::RegexOptions;
use nyalang_core::{RuntimeError, TypeId};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::Vm;
use super::value::{Object, ObjectData, Value};

type Result<T> = std::result::Result<T, RuntimeError>;

fn mismatch(operation: &str, detail: impl Into<String>) -> RuntimeError {
    RuntimeError::TypeMismatch {
        operation: operation.to_string(),
        detail: detail.into(),
    }
}

fn null(operation: &str) -> RuntimeError {
    RuntimeError::NullReference {
        operation: operation.to_string(),
    }
}

fn arg(args: &[Value], index: usize, operation: &str) -> Result<Value> {
    args.get(index)
        .cloned()
        .ok_or_else(|| mismatch(operation, format!("missing argument {index}")))
}

fn int_arg(args: &[Value], index: usize, operation: &str) -> Result<i64> {
    let value = arg(args, index, operation)?;
    value
        .as_i64()
        .ok_or_else(|| mismatch(operation, format!("argument {index} is {}", value.kind_name())))
}

fn float_arg(args: &[Value], index: usize, operation: &str) -> Result<f64> {
    let value = arg(args, index, operation)?;
    value
        .as_f64()
        .ok_or_else(|| mismatch(operation, format!("argument {index} is {}", value.kind_name())))
}

fn decimal_arg(args: &[Value], index: usize, operation: &str) -> Result<Decimal> {
    match arg(args, index, operation)? {
        Value::Decimal(d) => Ok(d),
        other => Err(mismatch(operation, format!("argument {index} is {}", other.kind_name()))),
    }
}

/// Strings treat null as empty.
fn string_arg(args: &[Value], index: usize, operation: &str) -> Result<String> {
    match arg(args, index, operation)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.to_string()),
        other => Err(mismatch(operation, format!("argument {index} is {}", other.kind_name()))),
    }
}

// ============================================================================
// Calls
// ============================================================================

/// Run a host method called with `call`/`callvirt`.
pub(super) fn call(vm: &mut Vm<'_>, op: HostOp, this: Option<Value>, args: Vec<Value>) -> Result<Option<Value>> {
    let result = match op {
        HostOp::ObjectCtor | HostOp::ListCtor | HostOp::DictionaryCtor => return Ok(None),
        HostOp::ObjectToString => {
            let this = this.filter(|v| !v.is_null()).ok_or_else(|| null("ToString"))?;
            Value::string(to_string(vm, &this))
        }
        HostOp::StringConcat => {
            let mut s = string_arg(&args, 0, "String.Concat")?;
            s.push_str(&string_arg(&args, 1, "String.Concat")?);
            Value::string(s)
        }
        HostOp::StringLength => match this {
            Some(Value::String(s)) => Value::I32(s.encode_utf16().count() as i32),
            _ => return Err(null("String.Length")),
        },
        HostOp::DecimalCtor => Value::Decimal(decimal_from_parts(&args)?),
        HostOp::DecimalArith(arith) => decimal_arith(arith, &args)?,
        HostOp::DecimalNeg => Value::Decimal(-decimal_arg(&args, 0, "Decimal.Negate")?),
        HostOp::DecimalFrom(kind) => Value::Decimal(decimal_from(kind, &args)?),
        HostOp::DecimalTo(kind) => decimal_to(kind, decimal_arg(&args, 0, "Decimal.Convert")?)?,
        HostOp::MathSqrt => Value::F64(float_arg(&args, 0, "Math.Sqrt")?.sqrt()),
        HostOp::MathLog10 => Value::F64(float_arg(&args, 0, "Math.Log10")?.log10()),
        HostOp::ConsoleWriteLine => {
            let line = string_arg(&args, 0, "Console.WriteLine")?;
            vm.output.write_line(&line);
            return Ok(None);
        }
        HostOp::RegexCtor => return Err(mismatch("Regex", "constructor called without new")),
        HostOp::RegexIsMatch => {
            let input = match arg(&args, 0, "Regex.IsMatch")? {
                Value::String(s) => s,
                _ => return Err(null("Regex.IsMatch")),
            };
            let this = this.ok_or_else(|| null("Regex.IsMatch"))?;
            let obj = this.as_object().ok_or_else(|| null("Regex.IsMatch"))?.borrow();
            match &obj.data {
                ObjectData::Regex(regex) => Value::Bool(regex.is_match(&input)),
                _ => return Err(mismatch("Regex.IsMatch", "receiver is not a regex")),
            }
        }
        HostOp::ListAdd => {
            let item = arg(&args, 0, "List.Add")?;
            with_data(this, "List.Add", |data| match data {
                ObjectData::List(items) => {
                    items.push(item);
                    Ok(())
                }
                _ => Err(mismatch("List.Add", "receiver is not a list")),
            })?;
            return Ok(None);
        }
        HostOp::DictionaryAdd => {
            let key = arg(&args, 0, "Dictionary.Add")?;
            let value = arg(&args, 1, "Dictionary.Add")?;
            if key.is_null() {
                return Err(null("Dictionary.Add"));
            }
            with_data(this, "Dictionary.Add", |data| match data {
                ObjectData::Dictionary(entries) if entries.iter().any(|(k, _)| *k == key) => {
                    Err(mismatch("Dictionary.Add", format!("duplicate key '{key}'")))
                }
                ObjectData::Dictionary(entries) => {
                    entries.push((key, value));
                    Ok(())
                }
                _ => Err(mismatch("Dictionary.Add", "receiver is not a dictionary")),
            })?;
            return Ok(None);
        }
        HostOp::CollectionCount | HostOp::ArrayLength => {
            let len = with_data(this, "Count", |data| match data {
                ObjectData::List(items) | ObjectData::Array(items) => Ok(items.len()),
                ObjectData::Dictionary(entries) => Ok(entries.len()),
                _ => Err(mismatch("Count", "receiver is not a collection")),
            })?;
            Value::I32(len as i32)
        }
    };
    Ok(Some(result))
}

fn with_data<T>(
    this: Option<Value>,
    operation: &str,
    f: impl FnOnce(&mut ObjectData) -> Result<T>,
) -> Result<T> {
    let this = this.ok_or_else(|| null(operation))?;
    let obj = this.as_object().ok_or_else(|| null(operation))?;
    f(&mut obj.borrow_mut().data)
}

/// Create the value of a host type for `newobj`. `None` for constructors
/// that run on a plain allocated object.
pub(super) fn construct(op: HostOp, ty: TypeId, args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(match op {
        HostOp::DecimalCtor => Value::Decimal(decimal_from_parts(args)?),
        HostOp::RegexCtor => {
            let pattern = match arg(args, 0, "Regex")? {
                Value::String(s) => s,
                _ => return Err(null("Regex")),
            };
            let bits = int_arg(args, 1, "Regex")?;
            let regex = RegexOptions::from_bits_truncate(bits as u32)
                .build(&pattern)
                .map_err(|err| RuntimeError::InvalidRegex {
                    pattern: pattern.to_string(),
                    reason: err.to_string(),
                })?;
            Object::new(ty, ObjectData::Regex(regex)).into_value()
        }
        HostOp::ListCtor => Object::new(ty, ObjectData::List(Vec::new())).into_value(),
        HostOp::DictionaryCtor => Object::new(ty, ObjectData::Dictionary(Vec::new())).into_value(),
        _ => return Ok(None),
    }))
}

/// `Object.ToString`: primitives format themselves, objects print their
/// type name.
pub(super) fn to_string(vm: &Vm<'_>, value: &Value) -> String {
    match value {
        Value::Object(obj) => vm.image.type_name(obj.borrow().ty),
        other => other.to_string(),
    }
}

// ============================================================================
// Decimal
// ============================================================================

fn decimal_from_parts(args: &[Value]) -> Result<Decimal> {
    const OP: &str = "Decimal";
    let lo = int_arg(args, 0, OP)? as u32;
    let mid = int_arg(args, 1, OP)? as u32;
    let hi = int_arg(args, 2, OP)? as u32;
    let negative = matches!(arg(args, 3, OP)?, Value::Bool(true));
    let scale = int_arg(args, 4, OP)? as u32;
    if scale > 28 {
        return Err(mismatch(OP, format!("scale {scale} is out of range")));
    }
    Ok(Decimal::from_parts(lo, mid, hi, negative, scale))
}

fn decimal_arith(op: ArithOp, args: &[Value]) -> Result<Value> {
    const OP: &str = "Decimal arithmetic";
    let a = decimal_arg(args, 0, OP)?;
    let b = decimal_arg(args, 1, OP)?;
    if matches!(op, ArithOp::Div | ArithOp::Rem) && b.is_zero() {
        return Err(RuntimeError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => a.checked_div(b),
        ArithOp::Rem => a.checked_rem(b),
    };
    result
        .map(Value::Decimal)
        .ok_or_else(|| mismatch(OP, "decimal overflow"))
}

fn decimal_from(kind: PrimitiveKind, args: &[Value]) -> Result<Decimal> {
    const OP: &str = "Decimal conversion";
    let converted = if kind.is_floating() {
        Decimal::from_f64(float_arg(args, 0, OP)?)
    } else {
        let value = arg(args, 0, OP)?;
        match value {
            Value::U64(v) => Some(Decimal::from(v)),
            other => other.as_i64().map(Decimal::from),
        }
    };
    converted.ok_or_else(|| mismatch(OP, format!("value does not fit a decimal from {}", kind.alias())))
}

fn decimal_to(kind: PrimitiveKind, d: Decimal) -> Result<Value> {
    let overflow = || mismatch("Decimal conversion", format!("{d} does not fit {}", kind.alias()));
    let t = d.trunc();
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(!d.is_zero()),
        PrimitiveKind::I8 => Value::I8(t.to_i8().ok_or_else(overflow)?),
        PrimitiveKind::U8 => Value::U8(t.to_u8().ok_or_else(overflow)?),
        PrimitiveKind::I16 => Value::I16(t.to_i16().ok_or_else(overflow)?),
        PrimitiveKind::U16 => Value::U16(t.to_u16().ok_or_else(overflow)?),
        PrimitiveKind::I32 => Value::I32(t.to_i32().ok_or_else(overflow)?),
        PrimitiveKind::U32 => Value::U32(t.to_u32().ok_or_else(overflow)?),
        PrimitiveKind::I64 => Value::I64(t.to_i64().ok_or_else(overflow)?),
        PrimitiveKind::U64 => Value::U64(t.to_u64().ok_or_else(overflow)?),
        PrimitiveKind::F32 => Value::F32(d.to_f32().ok_or_else(overflow)?),
        PrimitiveKind::F64 => Value::F64(d.to_f64().ok_or_else(overflow)?),
    })
}
