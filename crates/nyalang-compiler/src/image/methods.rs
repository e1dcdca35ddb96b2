//! Method entries of a program image.

use bitflags::bitflags;
use nyalang_core::{MethodId, Span, TypeId};

use super::types::PrimitiveKind;
use crate::bytecode::BytecodeChunk;
use crate::literal::LiteralValue;

bitflags! {
    /// Method attributes, modeled on the runtime's method metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodAttributes: u16 {
        const PUBLIC = 1 << 0;
        const STATIC = 1 << 1;
        const VIRTUAL = 1 << 2;
        const ABSTRACT = 1 << 3;
        /// Cannot be overridden further.
        const FINAL = 1 << 4;
        /// Occupies a new virtual slot instead of reusing the base slot.
        const NEW_SLOT = 1 << 5;
        /// Constructors and other runtime-recognized names.
        const SPECIAL_NAME = 1 << 6;
        const HIDE_BY_SIG = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Normal,
    Constructor,
    StaticConstructor,
}

impl MethodKind {
    /// Image-level name of constructors.
    pub const CTOR: &'static str = ".ctor";
    pub const CCTOR: &'static str = ".cctor";
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
    /// Constant default bound from a default literal.
    pub default: Option<LiteralValue>,
}

impl ParamEntry {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
        }
    }
}

/// Compiled body of a source method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    pub code: BytecodeChunk,
    /// Local slot types, indexed by slot.
    pub locals: Vec<TypeId>,
    pub max_stack: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Operations implemented natively by the runtime for host methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    ObjectCtor,
    ObjectToString,
    StringConcat,
    StringLength,
    /// `Decimal(int lo, int mid, int hi, bool negative, byte scale)`.
    DecimalCtor,
    DecimalArith(ArithOp),
    DecimalNeg,
    DecimalFrom(PrimitiveKind),
    DecimalTo(PrimitiveKind),
    MathSqrt,
    MathLog10,
    ConsoleWriteLine,
    /// `Regex(string pattern, int options)`.
    RegexCtor,
    RegexIsMatch,
    ListCtor,
    ListAdd,
    DictionaryCtor,
    DictionaryAdd,
    CollectionCount,
    ArrayLength,
}

impl HostOp {
    /// Tag and payload bytes used by the image writer.
    pub fn encode(self) -> (u8, u8) {
        fn arith(op: ArithOp) -> u8 {
            op as u8
        }
        fn prim(kind: PrimitiveKind) -> u8 {
            kind as u8
        }
        match self {
            HostOp::ObjectCtor => (1, 0),
            HostOp::ObjectToString => (2, 0),
            HostOp::StringConcat => (3, 0),
            HostOp::StringLength => (4, 0),
            HostOp::DecimalCtor => (5, 0),
            HostOp::DecimalArith(op) => (6, arith(op)),
            HostOp::DecimalNeg => (7, 0),
            HostOp::DecimalFrom(kind) => (8, prim(kind)),
            HostOp::DecimalTo(kind) => (9, prim(kind)),
            HostOp::MathSqrt => (10, 0),
            HostOp::MathLog10 => (11, 0),
            HostOp::ConsoleWriteLine => (12, 0),
            HostOp::RegexCtor => (13, 0),
            HostOp::RegexIsMatch => (14, 0),
            HostOp::ListCtor => (15, 0),
            HostOp::ListAdd => (16, 0),
            HostOp::DictionaryCtor => (17, 0),
            HostOp::DictionaryAdd => (18, 0),
            HostOp::CollectionCount => (19, 0),
            HostOp::ArrayLength => (20, 0),
        }
    }
}

/// A method in the image. Global functions have no owner.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub id: MethodId,
    pub name: String,
    pub owner: Option<TypeId>,
    pub kind: MethodKind,
    pub attributes: MethodAttributes,
    pub params: Vec<ParamEntry>,
    pub return_type: TypeId,
    /// Base or interface methods whose slot this method fills.
    pub overrides: Vec<MethodId>,
    pub body: Option<MethodBody>,
    pub host: Option<HostOp>,
    pub span: Span,
}

impl MethodEntry {
    pub fn is_static(&self) -> bool {
        self.attributes.contains(MethodAttributes::STATIC)
    }

    pub fn is_virtual(&self) -> bool {
        self.attributes.contains(MethodAttributes::VIRTUAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.attributes.contains(MethodAttributes::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.attributes.contains(MethodAttributes::FINAL)
    }

    pub fn is_public(&self) -> bool {
        self.attributes.contains(MethodAttributes::PUBLIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    pub fn param_types(&self) -> Vec<TypeId> {
        self.params.iter().map(|p| p.ty).collect()
    }

    /// Number of leading parameters without a default.
    pub fn required_params(&self) -> usize {
        self.params.iter().take_while(|p| !p.optional).count()
    }

    /// Values consumed from the stack by `Call`/`CallVirt`, including the
    /// receiver. `NewObj` consumes only the parameters.
    pub fn stack_inputs(&self) -> u32 {
        self.params.len() as u32 + u32::from(!self.is_static())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(attributes: MethodAttributes, kind: MethodKind) -> MethodEntry {
        MethodEntry {
            id: MethodId::new(0),
            name: "Foo".into(),
            owner: Some(TypeId::new(1)),
            kind,
            attributes,
            params: vec![
                ParamEntry::new("a", TypeId::new(2)),
                ParamEntry {
                    optional: true,
                    ..ParamEntry::new("b", TypeId::new(2))
                },
            ],
            return_type: TypeId::new(0),
            overrides: Vec::new(),
            body: None,
            host: None,
            span: Span::default(),
        }
    }

    #[test]
    fn instance_calls_consume_the_receiver() {
        let instance = method(MethodAttributes::PUBLIC, MethodKind::Normal);
        assert_eq!(instance.stack_inputs(), 3);
        let stat = method(MethodAttributes::STATIC, MethodKind::Normal);
        assert_eq!(stat.stack_inputs(), 2);
        let ctor = method(MethodAttributes::SPECIAL_NAME, MethodKind::Constructor);
        assert_eq!(ctor.stack_inputs(), 3);
    }

    #[test]
    fn required_params_stop_at_first_optional() {
        let m = method(MethodAttributes::PUBLIC, MethodKind::Normal);
        assert_eq!(m.required_params(), 1);
        assert_eq!(m.param_types(), vec![TypeId::new(2), TypeId::new(2)]);
    }

    #[test]
    fn host_op_encoding_carries_payload() {
        assert_eq!(HostOp::DecimalArith(ArithOp::Mul).encode(), (6, 2));
        assert_eq!(HostOp::DecimalFrom(PrimitiveKind::I32).encode(), (8, 3));
        assert_eq!(HostOp::ArrayLength.encode().1, 0);
    }
}
