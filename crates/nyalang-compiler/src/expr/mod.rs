//! Expression compiler.
//!
//! [`ExprCompiler::compile`] emits the code for one expression and returns
//! the static type of the value it leaves on the operand stack:
//!
//! - `Some(ty)` for a typed value
//! - `Some(VOID)` for a call that leaves nothing
//! - `None` for `nil`, which converts to any type
//!
//! The emitter tracks stack depth for every instruction, so each visit keeps
//! the depth in step with what it pushes and pops.
//!
//! # Example
//!
//! ```ignore
//! let mut compiler = ExprCompiler::new(image, scopes, emitter, &ctx);
//! let ty = compiler.compile(expr)?;
//! ```

mod binary;
mod calls;
mod cast;
mod identifiers;
pub(crate) mod member;
mod unary;

use nyalang_core::{CompilationError, Span, TypeId};
use nyalang_parser::ast::Expr;

use crate::emit::MethodEmitter;
use crate::function_compiler::MethodContext;
use crate::image::{ProgramImage, host};
use crate::literal;
use crate::scope::ScopeManager;

type Result<T> = std::result::Result<T, CompilationError>;

/// Compiles expressions of one method body.
pub struct ExprCompiler<'a, 'r> {
    image: &'a mut ProgramImage,
    scopes: &'a ScopeManager,
    emitter: &'a mut MethodEmitter,
    ctx: &'a MethodContext<'r>,
    /// Types whose members are being resolved, innermost last.
    calling_types: Vec<TypeId>,
}

impl<'a, 'r> ExprCompiler<'a, 'r> {
    pub fn new(
        image: &'a mut ProgramImage,
        scopes: &'a ScopeManager,
        emitter: &'a mut MethodEmitter,
        ctx: &'a MethodContext<'r>,
    ) -> Self {
        Self {
            image,
            scopes,
            emitter,
            ctx,
            calling_types: Vec::new(),
        }
    }

    /// Emit `expr` and return the type it leaves on the stack.
    pub fn compile(&mut self, expr: &Expr<'_>) -> Result<Option<TypeId>> {
        let span = expr.span();
        self.emitter.set_line(span.line);
        match expr {
            Expr::Literal(lit) => {
                let value = literal::evaluate(lit)?;
                literal::emit_literal(self.emitter, self.image, &value)
            }
            Expr::Ident(ident) => identifiers::compile_ident(self, ident.name, span),
            Expr::This(span) => identifiers::compile_this(self, *span),
            Expr::Binary(binary) => binary::compile_binary(self, binary),
            Expr::Unary(unary) => unary::compile_unary(self, unary),
            Expr::Cast(cast) => cast::compile_cast(self, cast),
            Expr::As(as_expr) => cast::compile_as(self, as_expr),
            Expr::New(new) => calls::compile_new(self, new),
            Expr::Call(call) => calls::compile_call(self, call),
            Expr::Member(member) => member::compile_member(self, member),
            Expr::Paren(inner, _) => self.compile(inner),
        }
    }

    /// Emit `expr` where a value is required; `void` calls are rejected.
    pub fn compile_value(&mut self, expr: &Expr<'_>) -> Result<Option<TypeId>> {
        let ty = self.compile(expr)?;
        if ty == Some(host::VOID) {
            return Err(CompilationError::Conversion {
                from: "void".to_string(),
                to: "a value".to_string(),
                span: expr.span(),
            });
        }
        Ok(ty)
    }

    /// Emit `expr` converted to `target`.
    pub fn compile_as_type(&mut self, expr: &Expr<'_>, target: TypeId) -> Result<()> {
        let ty = self.compile_value(expr)?;
        crate::conversion::try_convert(self.emitter, self.image, ty, Some(target), expr.span())
    }

    /// The type whose members are currently being resolved: the innermost
    /// receiver, else the enclosing type.
    pub fn calling_type(&self) -> Option<TypeId> {
        self.calling_types.last().copied().or(self.ctx.owner)
    }

    fn with_calling_type<T>(&mut self, ty: TypeId, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.calling_types.push(ty);
        let result = f(self);
        self.calling_types.pop();
        result
    }

    fn undefined(name: impl Into<String>, span: Span) -> CompilationError {
        CompilationError::UndefinedVariable {
            name: name.into(),
            span,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{compile, opcodes};
    use crate::bytecode::OpCode;
    use nyalang_core::CompilationError;

    #[test]
    fn void_call_is_not_a_value() {
        let err = compile(
            "class Cat {
                @public Nothing() { }
                @public Main(): int { x = Nothing(); return 1; }
            }",
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::Conversion { ref from, .. } if from == "void"));
    }

    #[test]
    fn parentheses_only_group() {
        let image = compile("F(): int { return (1 + 2) * 3; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![
                OpCode::PushOne,
                OpCode::Constant,
                OpCode::Add,
                OpCode::Constant,
                OpCode::Mul,
                OpCode::Br,
                OpCode::Ret
            ]
        );
    }
}
