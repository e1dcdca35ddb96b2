//! Member access.
//!
//! This module handles:
//! - Field access: `obj.field`, `Type.staticField`
//! - Enum members: `Mood.Happy`, pushed as their literal value
//! - Property access: `obj.Length` through a `get_Length` method
//!
//! A receiver that names a type instead of a value selects static members.

use nyalang_core::{CompilationError, Span, TypeId};
use nyalang_parser::ast::{Expr, MemberExpr};

use super::ExprCompiler;
use crate::bytecode::OpCode;
use crate::image::FieldEntry;
use crate::overload;

type Result<T> = std::result::Result<T, CompilationError>;

pub fn compile_member(compiler: &mut ExprCompiler<'_, '_>, member: &MemberExpr<'_>) -> Result<Option<TypeId>> {
    let name = member.member.name;
    if let Some(ty) = named_type(compiler, member.object) {
        return compiler.with_calling_type(ty, |c| compile_static_member(c, name, member.span));
    }

    let receiver = compiler.compile_value(member.object)?;
    let Some(ty) = receiver else {
        return Err(ExprCompiler::undefined(format!("nil.{name}"), member.span));
    };
    compiler.with_calling_type(ty, |c| compile_instance_member(c, name, member.span))
}

/// The type `expr` names, when it is a (dotted) type name rather than a
/// value. Variables take precedence over types.
pub(crate) fn named_type(compiler: &ExprCompiler<'_, '_>, expr: &Expr<'_>) -> Option<TypeId> {
    let dotted = expr.as_dotted_name()?;
    let first = dotted.split('.').next()?;
    if compiler.scopes.find(first).is_some() {
        return None;
    }
    compiler.ctx.resolver.lookup(compiler.image, &dotted, 0)
}

fn calling_type(compiler: &ExprCompiler<'_, '_>) -> Result<TypeId> {
    compiler
        .calling_type()
        .ok_or_else(|| CompilationError::internal("member access without a calling type"))
}

fn member_name(compiler: &ExprCompiler<'_, '_>, ty: TypeId, name: &str) -> String {
    format!("{}.{name}", compiler.image.type_name(ty))
}

fn compile_static_member(compiler: &mut ExprCompiler<'_, '_>, name: &str, span: Span) -> Result<Option<TypeId>> {
    let ty = calling_type(compiler)?;

    if let Some(field) = compiler.image.find_field(ty, name) {
        let field = compiler.image.field(field).clone();
        return match field.literal {
            Some(value) => {
                compiler.emitter.emit_i32(compiler.image.constants_mut(), value);
                Ok(Some(field.ty))
            }
            None if field.is_static() => {
                compiler.emitter.emit_field(OpCode::GetStatic, field.id);
                Ok(Some(field.ty))
            }
            None => Err(ExprCompiler::undefined(member_name(compiler, ty, name), span)),
        };
    }

    let getter = format!("get_{name}");
    let found = overload::resolve(compiler.image, &overload::search_order(compiler.image, ty), &getter, &[])
        .filter(|m| compiler.image.method(m.method).is_static());
    match found {
        Some(m) => {
            compiler.emitter.emit_call(OpCode::Call, m.method, 0, 1);
            Ok(Some(compiler.image.method(m.method).return_type))
        }
        None => Err(ExprCompiler::undefined(member_name(compiler, ty, name), span)),
    }
}

/// The receiver is on the stack.
fn compile_instance_member(compiler: &mut ExprCompiler<'_, '_>, name: &str, span: Span) -> Result<Option<TypeId>> {
    let ty = calling_type(compiler)?;

    if let Some(field) = compiler.image.find_field(ty, name) {
        let field: FieldEntry = compiler.image.field(field).clone();
        if let Some(value) = field.literal {
            compiler.emitter.emit(OpCode::Pop);
            compiler.emitter.emit_i32(compiler.image.constants_mut(), value);
        } else if field.is_static() {
            compiler.emitter.emit(OpCode::Pop);
            compiler.emitter.emit_field(OpCode::GetStatic, field.id);
        } else {
            compiler.emitter.emit_field(OpCode::GetField, field.id);
        }
        return Ok(Some(field.ty));
    }

    let getter = format!("get_{name}");
    let Some(found) = overload::resolve(compiler.image, &overload::search_order(compiler.image, ty), &getter, &[]) else {
        return Err(ExprCompiler::undefined(member_name(compiler, ty, name), span));
    };
    let method = compiler.image.method(found.method);
    let return_type = method.return_type;
    if method.is_static() {
        compiler.emitter.emit(OpCode::Pop);
        compiler.emitter.emit_call(OpCode::Call, found.method, 0, 1);
    } else {
        let op = if method.is_virtual() { OpCode::CallVirt } else { OpCode::Call };
        compiler.emitter.emit_call(op, found.method, 1, 1);
    }
    Ok(Some(return_type))
}
