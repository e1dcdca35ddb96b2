//! Calls, constructor calls and intrinsics.
//!
//! This module handles all call-like expressions:
//! - Intrinsics: `sqrt(x)`, `log(x)`, `print(x)`
//! - Unqualified calls: `Foo(args)` on the enclosing type, then globals
//! - Method calls: `obj.Foo(args)`
//! - Static calls through a type name: `Cat.Create(args)`
//! - Constructor calls: `new Cat(args)`
//!
//! Arguments are evaluated left to right before the target is chosen. When
//! the chosen overload needs an argument converted, the arguments above it
//! are stashed in temporaries, the argument is converted in place, and the
//! stashed ones are reloaded (and converted) in order.

use nyalang_core::{CompilationError, Span, TypeId};
use nyalang_parser::ast::{CallExpr, Expr, NewExpr};
use tracing::trace;

use super::{ExprCompiler, member};
use crate::bytecode::OpCode;
use crate::conversion;
use crate::image::{MethodKind, ParamEntry, TypeFlags, host};
use crate::literal;
use crate::overload::{self, OverloadMatch};

type Result<T> = std::result::Result<T, CompilationError>;

/// Built-in free functions backed by host methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intrinsic {
    /// `Math.Sqrt(double)`
    Sqrt,
    /// `Math.Log10(double)`, spelled `log` or `log10`.
    Log,
    /// `Console.WriteLine(string)`, with `ToString` for other values.
    Print,
}

impl Intrinsic {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Self::Sqrt),
            "log" | "log10" => Some(Self::Log),
            "print" => Some(Self::Print),
            _ => None,
        }
    }
}

/// How the receiver of a call reaches the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    /// No receiver; only static methods can be called.
    Absent,
    /// Pushed before the arguments, explicitly or as the implicit `this`.
    Pushed,
}

pub fn compile_call(compiler: &mut ExprCompiler<'_, '_>, call: &CallExpr<'_>) -> Result<Option<TypeId>> {
    let Some(receiver) = call.receiver else {
        if let Some(intrinsic) = Intrinsic::from_name(call.name.name) {
            return compile_intrinsic(compiler, intrinsic, call);
        }
        return compile_unqualified_call(compiler, call);
    };

    if let Some(ty) = member::named_type(compiler, receiver) {
        return compiler.with_calling_type(ty, |c| finish_call(c, call, Receiver::Absent, false));
    }

    let Some(ty) = compiler.compile_value(receiver)? else {
        return Err(ExprCompiler::undefined(format!("nil.{}", call.name.name), call.span));
    };
    compiler.with_calling_type(ty, |c| finish_call(c, call, Receiver::Pushed, false))
}

/// `Foo(args)`: the enclosing type's methods with an implicit `this`, then
/// the global functions.
fn compile_unqualified_call(compiler: &mut ExprCompiler<'_, '_>, call: &CallExpr<'_>) -> Result<Option<TypeId>> {
    let receiver = if compiler.ctx.owner.is_some() && !compiler.ctx.is_static {
        compiler.emitter.emit(OpCode::LoadThis);
        Receiver::Pushed
    } else {
        Receiver::Absent
    };
    finish_call(compiler, call, receiver, true)
}

/// Evaluate the arguments, pick the overload on the calling type and emit
/// the call.
fn finish_call(
    compiler: &mut ExprCompiler<'_, '_>,
    call: &CallExpr<'_>,
    receiver: Receiver,
    include_globals: bool,
) -> Result<Option<TypeId>> {
    let name = call.name.name;
    let calling_type = compiler.calling_type();
    let mut owners = calling_type
        .map(|ty| overload::search_order(compiler.image, ty))
        .unwrap_or_default();
    if include_globals {
        owners.push(None);
    }

    let args = compile_args(compiler, call.args)?;
    let found = overload::resolve(compiler.image, &owners, name, &args)
        .ok_or_else(|| unresolved(compiler, calling_type, name, &args, call.span))?;

    let method = compiler.image.method(found.method);
    let (is_static, is_virtual, return_type) = (method.is_static(), method.is_virtual(), method.return_type);
    let params = method.params.len() as u32;
    if !is_static && receiver == Receiver::Absent {
        return Err(unresolved(compiler, calling_type, name, &args, call.span));
    }

    coerce_arguments(compiler, &found, &args, call.span)?;
    let pushes = u32::from(return_type != host::VOID);
    trace!(method = %compiler.image.method_display(found.method), cost = found.cost, "call");

    if is_static {
        compiler.emitter.emit_call(OpCode::Call, found.method, params, pushes);
        if receiver == Receiver::Pushed {
            if pushes == 1 {
                compiler.emitter.emit(OpCode::Swap);
            }
            compiler.emitter.emit(OpCode::Pop);
        }
    } else {
        let op = if is_virtual { OpCode::CallVirt } else { OpCode::Call };
        compiler.emitter.emit_call(op, found.method, params + 1, pushes);
    }
    Ok(Some(return_type))
}

/// `new Type(args)`
pub fn compile_new(compiler: &mut ExprCompiler<'_, '_>, new: &NewExpr<'_>) -> Result<Option<TypeId>> {
    let ty = compiler.ctx.resolver.resolve(compiler.image, &new.ty)?;
    let entry = compiler.image.ty(ty);
    if entry.is_abstract() || entry.flags.contains(TypeFlags::STATIC) {
        return Err(CompilationError::AbstractInstantiation {
            type_name: compiler.image.type_name(ty),
            span: new.span,
        });
    }

    let args = compile_args(compiler, new.args)?;
    let found = overload::resolve(compiler.image, &[Some(ty)], MethodKind::CTOR, &args)
        .ok_or_else(|| unresolved(compiler, Some(ty), MethodKind::CTOR, &args, new.span))?;
    let params = compiler.image.method(found.method).params.len() as u32;

    coerce_arguments(compiler, &found, &args, new.span)?;
    compiler.emitter.emit_call(OpCode::NewObj, found.method, params, 1);
    Ok(Some(ty))
}

fn compile_intrinsic(compiler: &mut ExprCompiler<'_, '_>, intrinsic: Intrinsic, call: &CallExpr<'_>) -> Result<Option<TypeId>> {
    let [arg] = call.args else {
        let args = compile_args(compiler, call.args)?;
        return Err(unresolved(compiler, None, call.name.name, &args, call.span));
    };

    match intrinsic {
        Intrinsic::Sqrt | Intrinsic::Log => {
            let name = if intrinsic == Intrinsic::Sqrt { "Sqrt" } else { "Log10" };
            compiler.compile_as_type(arg, host::DOUBLE)?;
            let method = host_method(compiler, host::MATH, name, &[host::DOUBLE])?;
            compiler.emitter.emit_call(OpCode::Call, method, 1, 1);
            Ok(Some(host::DOUBLE))
        }
        Intrinsic::Print => {
            let ty = compiler.compile_value(arg)?;
            if let Some(ty) = ty
                && ty != host::STRING
            {
                let to_string = host_method(compiler, host::OBJECT, "ToString", &[])?;
                compiler.emitter.emit_call(OpCode::CallVirt, to_string, 1, 1);
            }
            let write = host_method(compiler, host::CONSOLE, "WriteLine", &[host::STRING])?;
            compiler.emitter.emit_call(OpCode::Call, write, 1, 0);
            Ok(Some(host::VOID))
        }
    }
}

fn host_method(compiler: &ExprCompiler<'_, '_>, owner: TypeId, name: &str, params: &[TypeId]) -> Result<nyalang_core::MethodId> {
    compiler
        .image
        .find_method(Some(owner), name, params)
        .ok_or_else(|| CompilationError::internal(format!("host method {name} is missing")))
}

fn compile_args(compiler: &mut ExprCompiler<'_, '_>, args: &[&Expr<'_>]) -> Result<Vec<Option<TypeId>>> {
    args.iter().map(|arg| compiler.compile_value(arg)).collect()
}

/// Convert the pushed arguments to the chosen parameter types and push the
/// defaults of omitted optional parameters.
fn coerce_arguments(compiler: &mut ExprCompiler<'_, '_>, found: &OverloadMatch, args: &[Option<TypeId>], span: Span) -> Result<()> {
    if let Some(first) = found.arg_conversions.iter().position(|c| !c.is_identity()) {
        let mut stashed = Vec::new();
        for i in (first + 1..args.len()).rev() {
            let slot = compiler.emitter.declare_local(args[i].unwrap_or(host::OBJECT));
            compiler.emitter.emit_set_local(slot);
            stashed.push((i, slot));
        }
        conversion::apply(compiler.emitter, &found.arg_conversions[first]);
        for (i, slot) in stashed.into_iter().rev() {
            compiler.emitter.emit_get_local(slot);
            conversion::apply(compiler.emitter, &found.arg_conversions[i]);
        }
    }

    let omitted: Vec<ParamEntry> = compiler.image.method(found.method).params[args.len()..].to_vec();
    for param in omitted {
        match &param.default {
            Some(value) => {
                let ty = literal::emit_literal(compiler.emitter, compiler.image, value)?;
                conversion::try_convert(compiler.emitter, compiler.image, ty, Some(param.ty), span)?;
            }
            None => emit_default(compiler, param.ty, span)?,
        }
    }
    Ok(())
}

/// The zero value of `ty` for an optional parameter without a default.
fn emit_default(compiler: &mut ExprCompiler<'_, '_>, ty: TypeId, span: Span) -> Result<()> {
    if compiler.image.ty(ty).is_reference() {
        compiler.emitter.emit_null();
    } else if ty == host::BOOL {
        compiler.emitter.emit_bool(false);
    } else {
        compiler.emitter.emit(OpCode::PushZero);
        conversion::try_convert(compiler.emitter, compiler.image, Some(host::INT32), Some(ty), span)?;
    }
    Ok(())
}

fn unresolved(compiler: &ExprCompiler<'_, '_>, owner: Option<TypeId>, name: &str, args: &[Option<TypeId>], span: Span) -> CompilationError {
    let image = &*compiler.image;
    CompilationError::UnresolvedMethod {
        type_name: owner.map_or_else(String::new, |ty| image.type_name(ty)),
        name: name.to_string(),
        args: args
            .iter()
            .map(|&arg| image.type_name_opt(arg))
            .collect::<Vec<_>>()
            .join(", "),
        span,
    }
}
