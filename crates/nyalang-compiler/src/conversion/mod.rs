//! Type conversion system.
//!
//! Determines how a value of one type becomes a value of another and emits
//! the instructions that do it. Conversions are checked in this order:
//!
//! 1. Identity (unknown types, the null type, or the same type)
//! 2. Reference (upcast to a base class, interface or `object`; enum to `int`)
//! 3. User-defined (`op_Implicit` / `op_Explicit` on the source, then the target)
//! 4. Primitive (numeric conversion instructions)
//!
//! Casts additionally allow a checked downcast.

use nyalang_core::{CompilationError, MethodId, Span, TypeId};
use tracing::trace;

use crate::bytecode::OpCode;
use crate::emit::MethodEmitter;
use crate::image::{ProgramImage, host};

mod operators;
mod primitive;
mod user_defined;

pub use operators::{do_math, do_unary};
pub use primitive::find_primitive_conversion;
pub use user_defined::find_user_conversion;

/// A planned conversion with its cost for overload ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub kind: ConversionKind,
    /// Lower is better.
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionKind {
    /// Nothing to emit.
    Identity,
    /// Same value seen through a wider reference type.
    Reference,
    /// Call a static conversion operator.
    Operator(MethodId),
    /// Run a fixed sequence of conversion instructions.
    Primitive(&'static [OpCode]),
    /// `castclass` to a more derived type.
    Downcast(TypeId),
}

impl Conversion {
    pub const COST_IDENTITY: u32 = 0;
    pub const COST_REFERENCE: u32 = 1;
    pub const COST_PRIMITIVE: u32 = 2;
    pub const COST_OPERATOR: u32 = 3;
    pub const COST_DOWNCAST: u32 = 4;

    pub fn identity() -> Self {
        Self {
            kind: ConversionKind::Identity,
            cost: Self::COST_IDENTITY,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.kind == ConversionKind::Identity
    }
}

/// Find the implicit conversion from `src` to `dst`.
///
/// `None` on either side means the type is unknown (for example `nil`), and
/// converts as identity.
pub fn plan(image: &ProgramImage, src: Option<TypeId>, dst: Option<TypeId>) -> Option<Conversion> {
    let (Some(src), Some(dst)) = (src, dst) else {
        return Some(Conversion::identity());
    };
    if src == dst {
        return Some(Conversion::identity());
    }
    if src == host::VOID || dst == host::VOID {
        return None;
    }

    let enum_to_int = (image.ty(src).is_enum() && dst == host::INT32)
        || (src == host::INT32 && image.ty(dst).is_enum());
    if dst == host::OBJECT || enum_to_int || image.is_subtype(src, dst) {
        return Some(Conversion {
            kind: ConversionKind::Reference,
            cost: Conversion::COST_REFERENCE,
        });
    }

    if let Some(method) = find_user_conversion(image, src, dst) {
        return Some(Conversion {
            kind: ConversionKind::Operator(method),
            cost: Conversion::COST_OPERATOR,
        });
    }

    let (from, to) = (image.ty(src).primitive()?, image.ty(dst).primitive()?);
    find_primitive_conversion(from, to).map(|ops| Conversion {
        kind: ConversionKind::Primitive(ops),
        cost: Conversion::COST_PRIMITIVE,
    })
}

/// Like [`plan`], but also allows a checked downcast between reference types.
pub fn plan_cast(image: &ProgramImage, src: Option<TypeId>, dst: Option<TypeId>) -> Option<Conversion> {
    if let Some(conversion) = plan(image, src, dst) {
        return Some(conversion);
    }
    let (src, dst) = (src?, dst?);
    let (from, to) = (image.ty(src), image.ty(dst));
    let related = image.is_subtype(dst, src) || from.is_interface() || to.is_interface();
    (from.is_reference() && to.is_reference() && related).then(|| Conversion {
        kind: ConversionKind::Downcast(dst),
        cost: Conversion::COST_DOWNCAST,
    })
}

/// Emit a planned conversion. The value to convert is on top of the stack.
pub fn apply(em: &mut MethodEmitter, conversion: &Conversion) {
    match &conversion.kind {
        ConversionKind::Identity | ConversionKind::Reference => {}
        ConversionKind::Operator(method) => em.emit_call(OpCode::Call, *method, 1, 1),
        ConversionKind::Primitive(ops) => ops.iter().for_each(|&op| em.emit(op)),
        ConversionKind::Downcast(ty) => em.emit_type_check(OpCode::CastClass, *ty),
    }
}

fn conversion_error(image: &ProgramImage, src: Option<TypeId>, dst: Option<TypeId>, span: Span) -> CompilationError {
    CompilationError::Conversion {
        from: image.type_name_opt(src),
        to: image.type_name_opt(dst),
        span,
    }
}

/// Convert the value on top of the stack from `src` to `dst`, failing with
/// a conversion error when no path exists.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn try_convert(
    em: &mut MethodEmitter,
    image: &ProgramImage,
    src: Option<TypeId>,
    dst: Option<TypeId>,
    span: Span,
) -> Result<(), CompilationError> {
    let conversion = plan(image, src, dst).ok_or_else(|| conversion_error(image, src, dst, span))?;
    if !conversion.is_identity() {
        trace!(
            from = %image.type_name_opt(src),
            to = %image.type_name_opt(dst),
            kind = ?conversion.kind,
            "conversion"
        );
    }
    apply(em, &conversion);
    Ok(())
}

/// [`try_convert`] for an explicit cast.
pub fn try_cast(
    em: &mut MethodEmitter,
    image: &ProgramImage,
    src: Option<TypeId>,
    dst: Option<TypeId>,
    span: Span,
) -> Result<(), CompilationError> {
    let conversion = plan_cast(image, src, dst).ok_or_else(|| conversion_error(image, src, dst, span))?;
    trace!(to = %image.type_name_opt(dst), kind = ?conversion.kind, "cast");
    apply(em, &conversion);
    Ok(())
}
