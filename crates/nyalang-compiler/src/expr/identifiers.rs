//! Names and `this`.

use nyalang_core::{CompilationError, Span, TypeId};

use super::ExprCompiler;
use crate::bytecode::OpCode;
use crate::scope::Variable;

type Result<T> = std::result::Result<T, CompilationError>;

/// Load a local, parameter or field by name.
pub fn compile_ident(compiler: &mut ExprCompiler<'_, '_>, name: &str, span: Span) -> Result<Option<TypeId>> {
    let variable = lookup_variable(compiler, name, span)?;
    variable.load(compiler.emitter);
    Ok(Some(variable.ty()))
}

pub fn compile_this(compiler: &mut ExprCompiler<'_, '_>, span: Span) -> Result<Option<TypeId>> {
    let owner = match compiler.ctx.owner {
        Some(owner) if !compiler.ctx.is_static => owner,
        _ => return Err(ExprCompiler::undefined("this", span)),
    };
    compiler.emitter.emit(OpCode::LoadThis);
    Ok(Some(owner))
}

/// Find a variable visible from the current method. Instance fields are
/// invisible to static methods.
pub(crate) fn lookup_variable(compiler: &ExprCompiler<'_, '_>, name: &str, span: Span) -> Result<Variable> {
    match compiler.scopes.find(name) {
        Some(variable) if variable.needs_receiver() && compiler.ctx.is_static => Err(ExprCompiler::undefined(name, span)),
        Some(variable) => Ok(variable),
        None => Err(ExprCompiler::undefined(name, span)),
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::expr::test_support::{compile, opcodes};
    use nyalang_core::CompilationError;

    #[test]
    fn parameters_shadow_fields() {
        let image = compile(
            "class Cat {
                lives: int;
                @public Get(lives: int): int { return lives; }
                @public Own(): int { return lives; }
            }",
        )
        .unwrap();
        assert_eq!(opcodes(&image, "Cat", "Get"), vec![OpCode::LoadArg, OpCode::Br, OpCode::Ret]);
        assert_eq!(
            opcodes(&image, "Cat", "Own"),
            vec![OpCode::LoadThis, OpCode::GetField, OpCode::Br, OpCode::Ret]
        );
    }

    #[test]
    fn static_method_cannot_see_instance_state() {
        let err = compile("class Cat { lives: int; !Count(): int { return lives; } }").unwrap_err();
        assert!(matches!(err, CompilationError::UndefinedVariable { ref name, .. } if name == "lives"));

        let err = compile("class Cat { !Me(): Cat { return this; } }").unwrap_err();
        assert!(matches!(err, CompilationError::UndefinedVariable { ref name, .. } if name == "this"));
    }

    #[test]
    fn unknown_name() {
        let err = compile("F(): int { return whiskers; }").unwrap_err();
        assert_eq!(err.to_string(), "at 1:19: undefined variable 'whiskers'");
    }
}
