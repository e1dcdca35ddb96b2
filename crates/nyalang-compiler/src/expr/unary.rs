//! Prefix operators.

use nyalang_core::{CompilationError, TypeId};
use nyalang_parser::ast::UnaryExpr;

use super::ExprCompiler;
use crate::conversion;

type Result<T> = std::result::Result<T, CompilationError>;

pub fn compile_unary(compiler: &mut ExprCompiler<'_, '_>, unary: &UnaryExpr<'_>) -> Result<Option<TypeId>> {
    let operand = compiler.compile_value(unary.operand)?;
    conversion::do_unary(compiler.emitter, compiler.image, operand, unary.op, unary.span)
}
