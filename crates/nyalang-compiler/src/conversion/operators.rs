//! Binary and unary operator dispatch.
//!
//! Both operands are already on the stack, left below right, when
//! [`do_math`] runs. Resolution tries, in order:
//!
//! 1. An operator method `op_X(L, L)` on the left type. The right operand is
//!    converted to `L` in place.
//! 2. An operator method `op_X(R, R)` on the right type. The right operand is
//!    stashed in a temporary so the left one can be converted to `R`.
//! 3. The native instruction. Mismatched operands are unified by converting
//!    the left operand to the right operand's type, again through a
//!    temporary. Shifts instead convert the shift count to `int`.
//!
//! Operand evaluation order is never changed; only conversions are
//! interleaved.

use nyalang_core::{CompilationError, MethodId, Span, TypeId};
use nyalang_parser::ast::{BinaryOp, UnaryOp};
use tracing::trace;

use super::try_convert;
use crate::bytecode::OpCode;
use crate::emit::MethodEmitter;
use crate::image::{PrimitiveKind, ProgramImage, host};

fn native_opcode(op: BinaryOp) -> Option<OpCode> {
    Some(match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Rem => OpCode::Rem,
        BinaryOp::BitAnd => OpCode::And,
        BinaryOp::BitOr => OpCode::Or,
        BinaryOp::BitXor => OpCode::Xor,
        BinaryOp::Shl => OpCode::Shl,
        BinaryOp::Shr => OpCode::Shr,
        BinaryOp::Coalesce => return None,
    })
}

/// A static operator method on `owner` taking `params`.
fn find_operator(image: &ProgramImage, owner: TypeId, name: &str, params: &[TypeId]) -> Option<MethodId> {
    image
        .find_method(Some(owner), name, params)
        .filter(|&m| image.method(m).is_static())
}

fn unresolved(image: &ProgramImage, owner: Option<TypeId>, name: &str, args: &[Option<TypeId>], span: Span) -> CompilationError {
    CompilationError::UnresolvedMethod {
        type_name: image.type_name_opt(owner),
        name: name.to_string(),
        args: args
            .iter()
            .map(|&a| image.type_name_opt(a))
            .collect::<Vec<_>>()
            .join(", "),
        span,
    }
}

/// Whether the native instruction accepts two operands of `ty`.
fn native_supports(image: &ProgramImage, ty: TypeId, op: BinaryOp) -> bool {
    match image.ty(ty).primitive() {
        Some(PrimitiveKind::Bool) => matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor),
        Some(kind) if matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr) => {
            kind.is_integer()
        }
        Some(kind) => kind.is_numeric(),
        None => image.ty(ty).is_enum() && matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor),
    }
}

/// Combine the two operands on top of the stack with `op`.
///
/// Returns the type of the result left on the stack: the operator method's
/// return type, or the common operand type for native instructions.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn do_math(
    em: &mut MethodEmitter,
    image: &ProgramImage,
    left: Option<TypeId>,
    right: Option<TypeId>,
    op: BinaryOp,
    span: Span,
) -> Result<Option<TypeId>, CompilationError> {
    let (Some(name), Some(native)) = (op.method_name(), native_opcode(op)) else {
        return Err(CompilationError::internal(format!("'{op}' is not an arithmetic operator")));
    };
    let (Some(l), Some(r)) = (left, right) else {
        return Err(unresolved(image, left.or(right), name, &[left, right], span));
    };

    if let Some(method) = find_operator(image, l, name, &[l, l]) {
        trace!(operator = name, owner = %image.type_name(l), "left operator");
        try_convert(em, image, Some(r), Some(l), span)?;
        em.emit_call(OpCode::Call, method, 2, 1);
        return Ok(Some(image.method(method).return_type));
    }

    if let Some(method) = find_operator(image, r, name, &[r, r]) {
        trace!(operator = name, owner = %image.type_name(r), "right operator");
        let temp = em.declare_local(r);
        em.emit_set_local(temp);
        try_convert(em, image, Some(l), Some(r), span)?;
        em.emit_get_local(temp);
        em.emit_call(OpCode::Call, method, 2, 1);
        return Ok(Some(image.method(method).return_type));
    }

    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        if !native_supports(image, l, op) {
            return Err(unresolved(image, Some(l), name, &[left, right], span));
        }
        try_convert(em, image, Some(r), Some(host::INT32), span)?;
        em.emit(native);
        return Ok(Some(l));
    }

    let common = if l == r {
        l
    } else {
        trace!(from = %image.type_name(l), to = %image.type_name(r), "unify operands");
        let temp = em.declare_local(r);
        em.emit_set_local(temp);
        try_convert(em, image, Some(l), Some(r), span)?;
        em.emit_get_local(temp);
        r
    };

    if !native_supports(image, common, op) {
        return Err(unresolved(image, Some(common), name, &[left, right], span));
    }
    em.emit(native);
    Ok(Some(common))
}

/// Apply a prefix operator to the value on top of the stack.
pub fn do_unary(
    em: &mut MethodEmitter,
    image: &ProgramImage,
    operand: Option<TypeId>,
    op: UnaryOp,
    span: Span,
) -> Result<Option<TypeId>, CompilationError> {
    let name = op.method_name();
    let Some(ty) = operand else {
        return Err(unresolved(image, None, name, &[None], span));
    };

    if let Some(method) = find_operator(image, ty, name, &[ty]) {
        em.emit_call(OpCode::Call, method, 1, 1);
        return Ok(Some(image.method(method).return_type));
    }
    match image.ty(ty).primitive() {
        Some(kind) if kind.is_numeric() => {
            em.emit(OpCode::Neg);
            Ok(Some(ty))
        }
        _ => Err(unresolved(image, Some(ty), name, &[operand], span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{MethodAttributes, MethodDef, MethodKind, ParamEntry, TypeDef, TypeFlags, TypeKind};

    fn push(em: &mut MethodEmitter) {
        em.emit(OpCode::PushOne);
    }

    #[test]
    fn same_primitive_types_use_native_opcode() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::INT32), Some(host::INT32), BinaryOp::Mul, Span::default()).unwrap();
        assert_eq!(ty, Some(host::INT32));
        em.chunk().assert_opcodes(&[OpCode::PushOne, OpCode::PushOne, OpCode::Mul]);
        assert_eq!(em.stack_depth(), 1);
    }

    #[test]
    fn mismatched_primitives_convert_left_through_temporary() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::INT32), Some(host::SINGLE), BinaryOp::Add, Span::default()).unwrap();
        assert_eq!(ty, Some(host::SINGLE));
        em.chunk().assert_opcodes(&[
            OpCode::PushOne,
            OpCode::PushOne,
            OpCode::SetLocal,
            OpCode::ConvR4,
            OpCode::GetLocal,
            OpCode::Add,
        ]);
        assert_eq!(em.local_type(0), Some(host::SINGLE));
        assert_eq!(em.stack_depth(), 1);
    }

    #[test]
    fn wider_left_operand_narrows_to_right_type() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::DOUBLE), Some(host::INT32), BinaryOp::Add, Span::default()).unwrap();
        assert_eq!(ty, Some(host::INT32));
        em.chunk().assert_opcodes(&[
            OpCode::PushOne,
            OpCode::PushOne,
            OpCode::SetLocal,
            OpCode::ConvI4,
            OpCode::GetLocal,
            OpCode::Add,
        ]);
        assert_eq!(em.local_type(0), Some(host::INT32));
    }

    #[test]
    fn left_operator_converts_right_operand() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::DECIMAL), Some(host::INT32), BinaryOp::Add, Span::default()).unwrap();
        assert_eq!(ty, Some(host::DECIMAL));
        em.chunk()
            .assert_opcodes(&[OpCode::PushOne, OpCode::PushOne, OpCode::Call, OpCode::Call]);
        assert_eq!(em.stack_depth(), 1);
    }

    #[test]
    fn right_operator_converts_left_operand_only() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::INT32), Some(host::DECIMAL), BinaryOp::Sub, Span::default()).unwrap();
        assert_eq!(ty, Some(host::DECIMAL));
        em.chunk().assert_opcodes(&[
            OpCode::PushOne,
            OpCode::PushOne,
            OpCode::SetLocal,
            OpCode::Call,
            OpCode::GetLocal,
            OpCode::Call,
        ]);
        assert_eq!(em.local_type(0), Some(host::DECIMAL));
    }

    #[test]
    fn user_operator_on_declared_class() {
        let mut image = ProgramImage::new();
        let money = image
            .declare_type(TypeDef {
                name: "Money".into(),
                namespace: String::new(),
                kind: TypeKind::Class,
                flags: TypeFlags::PUBLIC,
                base: Some(host::OBJECT),
                interfaces: Vec::new(),
                span: Span::default(),
            })
            .unwrap();
        let add = image
            .declare_method(MethodDef {
                name: "op_Addition".into(),
                owner: Some(money),
                kind: MethodKind::Normal,
                attributes: MethodAttributes::PUBLIC | MethodAttributes::STATIC,
                params: vec![ParamEntry::new("a", money), ParamEntry::new("b", money)],
                return_type: money,
                span: Span::default(),
            })
            .unwrap();

        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        do_math(&mut em, &image, Some(money), Some(money), BinaryOp::Add, Span::default()).unwrap();
        let last = em.chunk().instructions().last().unwrap();
        assert_eq!((last.op, last.operand), (OpCode::Call, add.as_u32()));
    }

    #[test]
    fn shift_count_becomes_int() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::INT64), Some(host::BYTE), BinaryOp::Shl, Span::default()).unwrap();
        assert_eq!(ty, Some(host::INT64));
        em.chunk()
            .assert_opcodes(&[OpCode::PushOne, OpCode::PushOne, OpCode::ConvI4, OpCode::Shl]);
    }

    #[test]
    fn strings_without_operator_fail() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let err = do_math(&mut em, &image, Some(host::BOOL), Some(host::BOOL), BinaryOp::Add, Span::default()).unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedMethod { name, .. } if name == "op_Addition"));
    }

    #[test]
    fn string_concatenation_uses_operator() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        push(&mut em);
        let ty = do_math(&mut em, &image, Some(host::STRING), Some(host::STRING), BinaryOp::Add, Span::default()).unwrap();
        assert_eq!(ty, Some(host::STRING));
    }

    #[test]
    fn negation() {
        let image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        push(&mut em);
        assert_eq!(do_unary(&mut em, &image, Some(host::DOUBLE), UnaryOp::Neg, Span::default()).unwrap(), Some(host::DOUBLE));
        assert_eq!(do_unary(&mut em, &image, Some(host::DECIMAL), UnaryOp::Neg, Span::default()).unwrap(), Some(host::DECIMAL));
        em.chunk().assert_opcodes(&[OpCode::PushOne, OpCode::Neg, OpCode::Call]);
        assert!(do_unary(&mut em, &image, Some(host::STRING), UnaryOp::Neg, Span::default()).is_err());
    }
}
