//! Explicit casts and `as`.

use nyalang_core::{CompilationError, TypeId};
use nyalang_parser::ast::{AsExpr, CastExpr};

use super::ExprCompiler;
use crate::bytecode::OpCode;
use crate::conversion;

type Result<T> = std::result::Result<T, CompilationError>;

/// `(Type) expr`: any implicit or explicit conversion, or a checked downcast.
pub fn compile_cast(compiler: &mut ExprCompiler<'_, '_>, cast: &CastExpr<'_>) -> Result<Option<TypeId>> {
    let source = compiler.compile_value(cast.operand)?;
    let target = compiler.ctx.resolver.resolve(compiler.image, &cast.target)?;
    conversion::try_cast(compiler.emitter, compiler.image, source, Some(target), cast.span)?;
    Ok(Some(target))
}

/// `expr as Type`: the value if it is a `Type`, else nil.
pub fn compile_as(compiler: &mut ExprCompiler<'_, '_>, as_expr: &AsExpr<'_>) -> Result<Option<TypeId>> {
    let source = compiler.compile_value(as_expr.operand)?;
    let target = compiler.ctx.resolver.resolve(compiler.image, &as_expr.target)?;
    if !compiler.image.ty(target).is_reference() {
        return Err(CompilationError::Conversion {
            from: compiler.image.type_name_opt(source),
            to: compiler.image.type_name(target),
            span: as_expr.span,
        });
    }
    compiler.emitter.emit_type_check(OpCode::IsInst, target);
    Ok(Some(target))
}
