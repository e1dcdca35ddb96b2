//! Type and field entries of a program image.

use bitflags::bitflags;
use nyalang_core::{FieldId, MethodId, Span, TypeId};

use crate::bytecode::OpCode;

/// Machine-level primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveKind {
    pub const NUMERIC: [PrimitiveKind; 10] = [
        PrimitiveKind::I8,
        PrimitiveKind::I16,
        PrimitiveKind::I32,
        PrimitiveKind::I64,
        PrimitiveKind::U8,
        PrimitiveKind::U16,
        PrimitiveKind::U32,
        PrimitiveKind::U64,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
    ];

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::I8 | PrimitiveKind::I16 | PrimitiveKind::I32 | PrimitiveKind::I64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveKind::U8 | PrimitiveKind::U16 | PrimitiveKind::U32 | PrimitiveKind::U64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::F32 | PrimitiveKind::F64)
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Signed, unsigned or floating. `Bool` is primitive but not numeric.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating()
    }

    /// The conversion opcode that produces a value of this kind from an
    /// integer or signed source.
    pub fn conv_opcode(self) -> Option<OpCode> {
        Some(match self {
            PrimitiveKind::I8 => OpCode::ConvI1,
            PrimitiveKind::I16 => OpCode::ConvI2,
            PrimitiveKind::I32 => OpCode::ConvI4,
            PrimitiveKind::I64 => OpCode::ConvI8,
            PrimitiveKind::U8 => OpCode::ConvU1,
            PrimitiveKind::U16 => OpCode::ConvU2,
            PrimitiveKind::U32 => OpCode::ConvU4,
            PrimitiveKind::U64 => OpCode::ConvU8,
            PrimitiveKind::F32 => OpCode::ConvR4,
            PrimitiveKind::F64 => OpCode::ConvR8,
            PrimitiveKind::Bool => return None,
        })
    }

    /// Source-level alias, e.g. `int` for `I32`.
    pub fn alias(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::I8 => "sbyte",
            PrimitiveKind::I16 => "short",
            PrimitiveKind::I32 => "int",
            PrimitiveKind::I64 => "long",
            PrimitiveKind::U8 => "byte",
            PrimitiveKind::U16 => "ushort",
            PrimitiveKind::U32 => "uint",
            PrimitiveKind::U64 => "ulong",
            PrimitiveKind::F32 => "float",
            PrimitiveKind::F64 => "double",
        }
    }
}

/// What kind of type an entry describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// The return type of methods that return nothing.
    Void,
    Primitive(PrimitiveKind),
    Class,
    Interface,
    /// An enumeration backed by `int`.
    Enum,
    Array { element: TypeId },
    /// An open generic host type such as ``List`1``.
    GenericDefinition { arity: u32 },
    GenericInstance { definition: TypeId, args: Vec<TypeId> },
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u16 {
        const PUBLIC = 1 << 0;
        const ABSTRACT = 1 << 1;
        const SEALED = 1 << 2;
        /// Provided by the runtime rather than declared in source.
        const HOST = 1 << 3;
        /// Values are copied, never null.
        const VALUE_TYPE = 1 << 4;
        /// Only static members; cannot be instantiated.
        const STATIC = 1 << 5;
        /// `finalize_type` has run.
        const FINALIZED = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        const PUBLIC = 1 << 0;
        const STATIC = 1 << 1;
        /// A compile-time constant; enum members.
        const LITERAL = 1 << 2;
    }
}

/// A type in the image.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub id: TypeId,
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub flags: TypeFlags,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
    pub span: Span,
}

impl TypeEntry {
    /// Namespace-qualified name, the key used by type lookup.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeFlags::ABSTRACT) || self.is_interface()
    }

    pub fn is_host(&self) -> bool {
        self.flags.contains(TypeFlags::HOST)
    }

    /// Whether values of this type can be null.
    pub fn is_reference(&self) -> bool {
        !self.flags.contains(TypeFlags::VALUE_TYPE)
            && !matches!(
                self.kind,
                TypeKind::Void | TypeKind::Primitive(_) | TypeKind::Enum
            )
    }
}

/// A field in the image.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub id: FieldId,
    pub name: String,
    pub owner: TypeId,
    pub ty: TypeId,
    pub flags: FieldFlags,
    /// Value of a literal field.
    pub literal: Option<i32>,
    pub span: Span,
}

impl FieldEntry {
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }
}
