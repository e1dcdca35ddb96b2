//! The host type universe every image starts with.
//!
//! Host types are registered in a fixed order so their ids are constants the
//! compiler and the VM can refer to directly. Host methods carry a [`HostOp`]
//! instead of a body.

use nyalang_core::{Span, TypeId};

use super::{
    ArithOp, HostOp, MethodAttributes, MethodDef, MethodKind, ParamEntry, PrimitiveKind,
    ProgramImage, TypeDef, TypeFlags, TypeKind,
};

pub const VOID: TypeId = TypeId::new(0);
pub const OBJECT: TypeId = TypeId::new(1);
pub const BOOL: TypeId = TypeId::new(2);
pub const SBYTE: TypeId = TypeId::new(3);
pub const BYTE: TypeId = TypeId::new(4);
pub const INT16: TypeId = TypeId::new(5);
pub const UINT16: TypeId = TypeId::new(6);
pub const INT32: TypeId = TypeId::new(7);
pub const UINT32: TypeId = TypeId::new(8);
pub const INT64: TypeId = TypeId::new(9);
pub const UINT64: TypeId = TypeId::new(10);
pub const SINGLE: TypeId = TypeId::new(11);
pub const DOUBLE: TypeId = TypeId::new(12);
pub const STRING: TypeId = TypeId::new(13);
pub const DECIMAL: TypeId = TypeId::new(14);
pub const MATH: TypeId = TypeId::new(15);
pub const CONSOLE: TypeId = TypeId::new(16);
pub const REGEX: TypeId = TypeId::new(17);
pub const LIST: TypeId = TypeId::new(18);
pub const DICTIONARY: TypeId = TypeId::new(19);

const SYSTEM: &str = "System";
const REGULAR_EXPRESSIONS: &str = "System.Text.RegularExpressions";
const COLLECTIONS: &str = "System.Collections.Generic";

/// The host type of a primitive kind.
pub fn primitive_type(kind: PrimitiveKind) -> TypeId {
    match kind {
        PrimitiveKind::Bool => BOOL,
        PrimitiveKind::I8 => SBYTE,
        PrimitiveKind::U8 => BYTE,
        PrimitiveKind::I16 => INT16,
        PrimitiveKind::U16 => UINT16,
        PrimitiveKind::I32 => INT32,
        PrimitiveKind::U32 => UINT32,
        PrimitiveKind::I64 => INT64,
        PrimitiveKind::U64 => UINT64,
        PrimitiveKind::F32 => SINGLE,
        PrimitiveKind::F64 => DOUBLE,
    }
}

/// Resolve a source alias such as `int` or `string`.
pub fn alias(name: &str) -> Option<TypeId> {
    Some(match name {
        "void" => VOID,
        "object" => OBJECT,
        "bool" => BOOL,
        "sbyte" => SBYTE,
        "byte" => BYTE,
        "short" => INT16,
        "ushort" => UINT16,
        "int" => INT32,
        "uint" => UINT32,
        "long" => INT64,
        "ulong" => UINT64,
        "float" => SINGLE,
        "double" => DOUBLE,
        "string" => STRING,
        "decimal" => DECIMAL,
        _ => return None,
    })
}

// ============================================================================
// Registration Helpers
// ============================================================================

struct HostBuilder<'a> {
    image: &'a mut ProgramImage,
}

impl HostBuilder<'_> {
    fn ty(&mut self, namespace: &str, name: &str, kind: TypeKind, flags: TypeFlags, base: Option<TypeId>) -> TypeId {
        self.image.push_type(TypeDef {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
            flags: flags | TypeFlags::PUBLIC | TypeFlags::HOST | TypeFlags::FINALIZED,
            base,
            interfaces: Vec::new(),
            span: Span::default(),
        })
    }

    fn method(
        &mut self,
        owner: TypeId,
        name: &str,
        attributes: MethodAttributes,
        params: &[TypeId],
        ret: TypeId,
        op: HostOp,
    ) {
        let kind = if name == MethodKind::CTOR {
            MethodKind::Constructor
        } else {
            MethodKind::Normal
        };
        let params = params
            .iter()
            .enumerate()
            .map(|(i, &ty)| ParamEntry::new(format!("arg{i}"), ty))
            .collect();
        self.image.push_method(
            MethodDef {
                name: name.to_string(),
                owner: Some(owner),
                kind,
                attributes: attributes | MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG,
                params,
                return_type: ret,
                span: Span::default(),
            },
            Some(op),
        );
    }

    fn ctor(&mut self, owner: TypeId, params: &[TypeId], op: HostOp) {
        self.method(owner, MethodKind::CTOR, MethodAttributes::SPECIAL_NAME, params, VOID, op);
    }

    fn static_method(&mut self, owner: TypeId, name: &str, params: &[TypeId], ret: TypeId, op: HostOp) {
        self.method(owner, name, MethodAttributes::STATIC, params, ret, op);
    }

    fn operator(&mut self, owner: TypeId, name: &str, params: &[TypeId], ret: TypeId, op: HostOp) {
        self.method(
            owner,
            name,
            MethodAttributes::STATIC | MethodAttributes::SPECIAL_NAME,
            params,
            ret,
            op,
        );
    }

    fn getter(&mut self, owner: TypeId, name: &str, ret: TypeId, op: HostOp) {
        self.method(owner, name, MethodAttributes::SPECIAL_NAME, &[], ret, op);
    }
}

// ============================================================================
// Seeding
// ============================================================================

/// Register the host types and their members. Must run on an empty image.
pub(crate) fn seed(image: &mut ProgramImage) {
    let mut b = HostBuilder { image };

    b.ty(SYSTEM, "Void", TypeKind::Void, TypeFlags::VALUE_TYPE, None);
    b.ty(SYSTEM, "Object", TypeKind::Class, TypeFlags::empty(), None);

    let primitives = [
        ("Boolean", PrimitiveKind::Bool),
        ("SByte", PrimitiveKind::I8),
        ("Byte", PrimitiveKind::U8),
        ("Int16", PrimitiveKind::I16),
        ("UInt16", PrimitiveKind::U16),
        ("Int32", PrimitiveKind::I32),
        ("UInt32", PrimitiveKind::U32),
        ("Int64", PrimitiveKind::I64),
        ("UInt64", PrimitiveKind::U64),
        ("Single", PrimitiveKind::F32),
        ("Double", PrimitiveKind::F64),
    ];
    for (name, kind) in primitives {
        let id = b.ty(
            SYSTEM,
            name,
            TypeKind::Primitive(kind),
            TypeFlags::VALUE_TYPE | TypeFlags::SEALED,
            Some(OBJECT),
        );
        debug_assert_eq!(id, primitive_type(kind));
    }

    b.ty(SYSTEM, "String", TypeKind::Class, TypeFlags::SEALED, Some(OBJECT));
    b.ty(
        SYSTEM,
        "Decimal",
        TypeKind::Class,
        TypeFlags::VALUE_TYPE | TypeFlags::SEALED,
        Some(OBJECT),
    );
    b.ty(SYSTEM, "Math", TypeKind::Class, TypeFlags::STATIC | TypeFlags::ABSTRACT | TypeFlags::SEALED, Some(OBJECT));
    b.ty(SYSTEM, "Console", TypeKind::Class, TypeFlags::STATIC | TypeFlags::ABSTRACT | TypeFlags::SEALED, Some(OBJECT));
    b.ty(REGULAR_EXPRESSIONS, "Regex", TypeKind::Class, TypeFlags::empty(), Some(OBJECT));
    b.ty(COLLECTIONS, "List`1", TypeKind::GenericDefinition { arity: 1 }, TypeFlags::empty(), Some(OBJECT));
    b.ty(
        COLLECTIONS,
        "Dictionary`2",
        TypeKind::GenericDefinition { arity: 2 },
        TypeFlags::empty(),
        Some(OBJECT),
    );

    // Object
    b.ctor(OBJECT, &[], HostOp::ObjectCtor);
    b.method(OBJECT, "ToString", MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT, &[], STRING, HostOp::ObjectToString);

    // String
    b.operator(STRING, "op_Addition", &[STRING, STRING], STRING, HostOp::StringConcat);
    b.getter(STRING, "get_Length", INT32, HostOp::StringLength);

    // Decimal
    b.ctor(DECIMAL, &[INT32, INT32, INT32, BOOL, BYTE], HostOp::DecimalCtor);
    let arith = [
        ("op_Addition", ArithOp::Add),
        ("op_Subtraction", ArithOp::Sub),
        ("op_Multiply", ArithOp::Mul),
        ("op_Division", ArithOp::Div),
        ("op_Modulus", ArithOp::Rem),
    ];
    for (name, op) in arith {
        b.operator(DECIMAL, name, &[DECIMAL, DECIMAL], DECIMAL, HostOp::DecimalArith(op));
    }
    b.operator(DECIMAL, "op_UnaryNegation", &[DECIMAL], DECIMAL, HostOp::DecimalNeg);
    for kind in PrimitiveKind::NUMERIC {
        let ty = primitive_type(kind);
        let from = if kind.is_integer() { "op_Implicit" } else { "op_Explicit" };
        b.operator(DECIMAL, from, &[ty], DECIMAL, HostOp::DecimalFrom(kind));
    }
    for kind in PrimitiveKind::NUMERIC {
        b.operator(DECIMAL, "op_Explicit", &[DECIMAL], primitive_type(kind), HostOp::DecimalTo(kind));
    }

    // Math and Console
    b.static_method(MATH, "Sqrt", &[DOUBLE], DOUBLE, HostOp::MathSqrt);
    b.static_method(MATH, "Log10", &[DOUBLE], DOUBLE, HostOp::MathLog10);
    b.static_method(CONSOLE, "WriteLine", &[STRING], VOID, HostOp::ConsoleWriteLine);

    // Regex
    b.ctor(REGEX, &[STRING, INT32], HostOp::RegexCtor);
    b.method(REGEX, "IsMatch", MethodAttributes::empty(), &[STRING], BOOL, HostOp::RegexIsMatch);
}

/// Members of an array type.
pub(crate) fn seed_array_members(image: &mut ProgramImage, array: TypeId) {
    HostBuilder { image }.getter(array, "get_Length", INT32, HostOp::ArrayLength);
}

/// Members of a closed generic collection type.
pub(crate) fn seed_instance_members(image: &mut ProgramImage, instance: TypeId, definition: TypeId, args: &[TypeId]) {
    let mut b = HostBuilder { image };
    match (definition, args) {
        (LIST, &[element]) => {
            b.ctor(instance, &[], HostOp::ListCtor);
            b.method(instance, "Add", MethodAttributes::empty(), &[element], VOID, HostOp::ListAdd);
        }
        (DICTIONARY, &[key, value]) => {
            b.ctor(instance, &[], HostOp::DictionaryCtor);
            b.method(instance, "Add", MethodAttributes::empty(), &[key, value], VOID, HostOp::DictionaryAdd);
        }
        _ => return,
    }
    b.getter(instance, "get_Count", INT32, HostOp::CollectionCount);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_registration_order() {
        let image = ProgramImage::new();
        for kind in PrimitiveKind::NUMERIC {
            let id = primitive_type(kind);
            assert_eq!(image.ty(id).primitive(), Some(kind));
        }
        assert_eq!(image.ty(STRING).full_name(), "System.String");
        assert_eq!(image.ty(REGEX).full_name(), "System.Text.RegularExpressions.Regex");
        assert_eq!(image.ty(DICTIONARY).full_name(), "System.Collections.Generic.Dictionary`2");
    }

    #[test]
    fn aliases() {
        assert_eq!(alias("int"), Some(INT32));
        assert_eq!(alias("decimal"), Some(DECIMAL));
        assert_eq!(alias("Int32"), None);
    }

    #[test]
    fn decimal_has_one_explicit_conversion_per_target() {
        let image = ProgramImage::new();
        let explicit: Vec<_> = image
            .methods_named(Some(DECIMAL), "op_Explicit")
            .into_iter()
            .filter(|&m| image.method(m).param_types() == [DECIMAL])
            .map(|m| image.method(m).return_type)
            .collect();
        assert_eq!(explicit.len(), PrimitiveKind::NUMERIC.len());
        assert!(explicit.contains(&DOUBLE));
        assert!(image.find_method(Some(DECIMAL), "op_Implicit", &[INT32]).is_some());
        assert!(image.find_method(Some(DECIMAL), "op_Implicit", &[DOUBLE]).is_none());
    }

    #[test]
    fn host_methods_are_public_and_bodiless() {
        let image = ProgramImage::new();
        let write = image.find_method(Some(CONSOLE), "WriteLine", &[STRING]).unwrap();
        let entry = image.method(write);
        assert!(entry.is_public() && entry.is_static());
        assert_eq!(entry.host, Some(HostOp::ConsoleWriteLine));
        assert!(entry.body.is_none());
    }
}
