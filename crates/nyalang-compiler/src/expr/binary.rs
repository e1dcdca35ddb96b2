//! Binary operators and null coalescing.

use nyalang_core::{CompilationError, TypeId};
use nyalang_parser::ast::{BinaryExpr, BinaryOp};

use super::ExprCompiler;
use crate::bytecode::OpCode;
use crate::conversion;

type Result<T> = std::result::Result<T, CompilationError>;

/// Both operands are pushed left first, then the operator is dispatched.
pub fn compile_binary(compiler: &mut ExprCompiler<'_, '_>, binary: &BinaryExpr<'_>) -> Result<Option<TypeId>> {
    if binary.op == BinaryOp::Coalesce {
        return compile_coalesce(compiler, binary);
    }
    let left = compiler.compile_value(binary.left)?;
    let right = compiler.compile_value(binary.right)?;
    conversion::do_math(compiler.emitter, compiler.image, left, right, binary.op, binary.span)
}

/// `left ?? right`
///
/// ```text
///     <left>
///     dup
///     brtrue END
///     pop
///     <right>        converted to the left type
/// END:
/// ```
fn compile_coalesce(compiler: &mut ExprCompiler<'_, '_>, binary: &BinaryExpr<'_>) -> Result<Option<TypeId>> {
    let left = compiler.compile_value(binary.left)?;
    if let Some(ty) = left
        && !compiler.image.ty(ty).is_reference()
    {
        return Err(CompilationError::Conversion {
            from: compiler.image.type_name(ty),
            to: "nil".to_string(),
            span: binary.left.span(),
        });
    }

    let end = compiler.emitter.define_label();
    compiler.emitter.emit(OpCode::Dup);
    compiler.emitter.emit_branch(OpCode::BrTrue, end)?;
    compiler.emitter.emit(OpCode::Pop);

    let right = compiler.compile_value(binary.right)?;
    if left.is_some() {
        conversion::try_convert(compiler.emitter, compiler.image, right, left, binary.right.span())?;
    }
    compiler.emitter.mark_label(end)?;
    Ok(left.or(right))
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::expr::test_support::{compile, opcodes};
    use nyalang_core::CompilationError;

    #[test]
    fn coalesce_keeps_one_value_on_both_paths() {
        let image = compile(r#"F(a: string): string { return a ?? "none"; }"#).unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![
                OpCode::LoadArg,
                OpCode::Dup,
                OpCode::BrTrue,
                OpCode::Pop,
                OpCode::Constant,
                OpCode::Br,
                OpCode::Ret
            ]
        );
    }

    #[test]
    fn coalesce_needs_a_nullable_left_side() {
        let err = compile("F(a: int): int { return a ?? 2; }").unwrap_err();
        assert!(matches!(err, CompilationError::Conversion { ref to, .. } if to == "nil"));
    }

    #[test]
    fn string_concatenation_uses_operator_method() {
        let image = compile(r#"F(a: string): string { return a + "!"; }"#).unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![OpCode::LoadArg, OpCode::Constant, OpCode::Call, OpCode::Br, OpCode::Ret]
        );
    }

    #[test]
    fn arithmetic_result_type_is_the_common_type() {
        let image = compile("F(a: int, b: double): double { return a * b; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![
                OpCode::LoadArg,
                OpCode::LoadArg,
                OpCode::SetLocal,
                OpCode::ConvR8,
                OpCode::GetLocal,
                OpCode::Mul,
                OpCode::Br,
                OpCode::Ret
            ]
        );
    }

    #[test]
    fn unsupported_operand_types() {
        let err = compile("class Cat { } F(a: Cat): Cat { return a + a; }").unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedMethod { ref name, .. } if name == "op_Addition"));
    }
}
