//! Runtime values.
//!
//! Primitives are kept at their declared width so arithmetic wraps the way
//! the compiled types say it should. Reference values share their object
//! through `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use nyalang_compiler::image::{PrimitiveKind, ProgramImage, TypeKind, host};
use nyalang_core::{FieldId, TypeId};
use regex::Regex;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

pub type ObjectRef = Rc<RefCell<Object>>;

/// A value on the operand stack, in a local, a field or an argument.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(Rc<str>),
    Object(ObjectRef),
}

/// A heap object: a script class instance or a host object.
#[derive(Debug)]
pub struct Object {
    pub ty: TypeId,
    pub fields: FxHashMap<FieldId, Value>,
    pub data: ObjectData,
}

/// Native payload of host objects.
#[derive(Debug)]
pub enum ObjectData {
    Plain,
    Regex(Regex),
    List(Vec<Value>),
    Dictionary(Vec<(Value, Value)>),
    Array(Vec<Value>),
}

impl Object {
    pub fn new(ty: TypeId, data: ObjectData) -> Self {
        Self {
            ty,
            fields: FxHashMap::default(),
            data,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(Rc::new(RefCell::new(self)))
    }
}

/// A numeric value widened for conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i128),
    Float(f64),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    /// The zero value of a type: `0` of the right width for numbers, `false`,
    /// zero decimal, and null for references.
    pub fn default_for(image: &ProgramImage, ty: TypeId) -> Value {
        let Some(entry) = image.get_type(ty) else {
            return Value::Null;
        };
        match entry.kind {
            TypeKind::Primitive(kind) => Value::zero(kind),
            TypeKind::Enum => Value::I32(0),
            _ if ty == host::DECIMAL => Value::Decimal(Decimal::ZERO),
            _ => Value::Null,
        }
    }

    pub fn zero(kind: PrimitiveKind) -> Value {
        match kind {
            PrimitiveKind::Bool => Value::Bool(false),
            PrimitiveKind::I8 => Value::I8(0),
            PrimitiveKind::U8 => Value::U8(0),
            PrimitiveKind::I16 => Value::I16(0),
            PrimitiveKind::U16 => Value::U16(0),
            PrimitiveKind::I32 => Value::I32(0),
            PrimitiveKind::U32 => Value::U32(0),
            PrimitiveKind::I64 => Value::I64(0),
            PrimitiveKind::U64 => Value::U64(0),
            PrimitiveKind::F32 => Value::F32(0.0),
            PrimitiveKind::F64 => Value::F64(0.0),
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::Bool(_) => PrimitiveKind::Bool,
            Value::I8(_) => PrimitiveKind::I8,
            Value::U8(_) => PrimitiveKind::U8,
            Value::I16(_) => PrimitiveKind::I16,
            Value::U16(_) => PrimitiveKind::U16,
            Value::I32(_) => PrimitiveKind::I32,
            Value::U32(_) => PrimitiveKind::U32,
            Value::I64(_) => PrimitiveKind::I64,
            Value::U64(_) => PrimitiveKind::U64,
            Value::F32(_) => PrimitiveKind::F32,
            Value::F64(_) => PrimitiveKind::F64,
            _ => return None,
        })
    }

    /// The type used for virtual dispatch and type tests. Null has none.
    pub fn runtime_type(&self) -> Option<TypeId> {
        match self {
            Value::Null => None,
            Value::Decimal(_) => Some(host::DECIMAL),
            Value::String(_) => Some(host::STRING),
            Value::Object(obj) => Some(obj.borrow().ty),
            other => other.primitive_kind().map(host::primitive_type),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Branch condition: false, zero and null are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::F32(f) => *f != 0.0,
            Value::F64(f) => *f != 0.0,
            other => match other.to_number() {
                Some(Number::Int(i)) => i != 0,
                _ => true,
            },
        }
    }

    pub(crate) fn to_number(&self) -> Option<Number> {
        Some(match *self {
            Value::Bool(b) => Number::Int(i128::from(b)),
            Value::I8(v) => Number::Int(v.into()),
            Value::U8(v) => Number::Int(v.into()),
            Value::I16(v) => Number::Int(v.into()),
            Value::U16(v) => Number::Int(v.into()),
            Value::I32(v) => Number::Int(v.into()),
            Value::U32(v) => Number::Int(v.into()),
            Value::I64(v) => Number::Int(v.into()),
            Value::U64(v) => Number::Int(v.into()),
            Value::F32(v) => Number::Float(v.into()),
            Value::F64(v) => Number::Float(v),
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.to_number()? {
            Number::Int(i) => Some(i as f64),
            Number::Float(f) => Some(f),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.to_number()? {
            Number::Int(i) => i64::try_from(i).ok(),
            Number::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short name of the value's shape, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            other => other.primitive_kind().map_or("value", PrimitiveKind::alias),
        }
    }
}

/// Reference values compare by identity; everything else by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Object(obj) => write!(f, "<object {}>", obj.borrow().ty),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_declared_type() {
        let image = ProgramImage::new();
        assert_eq!(Value::default_for(&image, host::BYTE), Value::U8(0));
        assert_eq!(Value::default_for(&image, host::DOUBLE), Value::F64(0.0));
        assert_eq!(Value::default_for(&image, host::DECIMAL), Value::Decimal(Decimal::ZERO));
        assert_eq!(Value::default_for(&image, host::STRING), Value::Null);
    }

    #[test]
    fn runtime_types() {
        assert_eq!(Value::I16(3).runtime_type(), Some(host::INT16));
        assert_eq!(Value::from("cat").runtime_type(), Some(host::STRING));
        assert_eq!(Value::Null.runtime_type(), None);
        let obj = Object::new(host::OBJECT, ObjectData::Plain).into_value();
        assert_eq!(obj.runtime_type(), Some(host::OBJECT));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::U64(0).is_truthy());
        assert!(Value::I8(-1).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(!Value::F32(0.0).is_truthy());
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Object::new(host::OBJECT, ObjectData::Plain).into_value();
        let b = Object::new(host::OBJECT, ObjectData::Plain).into_value();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn display_matches_host_formatting() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::F64(2.5).to_string(), "2.5");
        assert_eq!(Value::Decimal(Decimal::new(13, 3)).to_string(), "0.013");
        assert_eq!(Value::Null.to_string(), "");
    }
}
