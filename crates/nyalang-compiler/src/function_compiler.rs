//! Function compiler for generating bytecode from method bodies.
//!
//! This module provides [`FunctionCompiler`] which compiles a single method
//! body to bytecode. It handles:
//!
//! - Binding parameters in a new Method scope
//! - Chaining instance constructors to the base default constructor
//! - Compiling body statements
//! - Verifying that non-void bodies end in a return
//! - Placing the shared return label and the single `ret`
//!
//! # Example
//!
//! ```ignore
//! let mut compiler = FunctionCompiler::new(image, scopes, method, resolver);
//! compiler.setup_parameters();
//! compiler.compile_body(&body)?;
//! compiler.verify_returns(&body)?;
//! let body = compiler.finish(true)?;
//! ```

use nyalang_core::{CompilationError, MethodId, TypeId};
use nyalang_parser::ast::Block;

use crate::bytecode::OpCode;
use crate::emit::{Label, MethodEmitter};
use crate::image::{MethodBody, ProgramImage, host};
use crate::scope::{ScopeLevel, ScopeManager, Variable};
use crate::stmt::StmtCompiler;
use crate::type_resolver::TypeResolver;

type Result<T> = std::result::Result<T, CompilationError>;

/// What expressions and statements need to know about the method being
/// compiled.
#[derive(Debug, Clone, Copy)]
pub struct MethodContext<'r> {
    pub method: MethodId,
    /// Declaring type; `None` for global functions.
    pub owner: Option<TypeId>,
    pub is_static: bool,
    pub return_type: TypeId,
    /// Resolves type names from the method's namespace.
    pub resolver: TypeResolver<'r>,
}

/// Compiles a single method body to bytecode.
pub struct FunctionCompiler<'a, 'r> {
    image: &'a mut ProgramImage,
    scopes: &'a mut ScopeManager,
    emitter: MethodEmitter,
    ctx: MethodContext<'r>,
    return_label: Label,
}

impl<'a, 'r> FunctionCompiler<'a, 'r> {
    pub fn new(
        image: &'a mut ProgramImage,
        scopes: &'a mut ScopeManager,
        method: MethodId,
        resolver: TypeResolver<'r>,
    ) -> Self {
        let entry = image.method(method);
        let ctx = MethodContext {
            method,
            owner: entry.owner,
            is_static: entry.is_static(),
            return_type: entry.return_type,
            resolver,
        };
        let mut emitter = MethodEmitter::new();
        let return_label = emitter.define_label();
        Self {
            image,
            scopes,
            emitter,
            ctx,
            return_label,
        }
    }

    /// Open the Method scope and bind the parameters. The receiver is not a
    /// named parameter; `this` reaches it.
    pub fn setup_parameters(&mut self) {
        self.scopes.push(ScopeLevel::Method);
        let params = &self.image.method(self.ctx.method).params;
        for (index, param) in params.iter().enumerate() {
            self.scopes.add(
                param.name.clone(),
                Variable::Param {
                    index: index as u16,
                    ty: param.ty,
                },
            );
        }
    }

    /// Call the base constructor on `this` before the body runs.
    pub fn chain_base_constructor(&mut self, base_ctor: MethodId) {
        self.emitter.emit(OpCode::LoadThis);
        self.emitter.emit_call(OpCode::Call, base_ctor, 1, 0);
    }

    /// Compile the method body.
    pub fn compile_body(&mut self, body: &Block<'_>) -> Result<()> {
        let mut stmt_compiler = StmtCompiler::new(
            self.image,
            self.scopes,
            &mut self.emitter,
            &self.ctx,
            self.return_label,
        );

        for stmt in body.stmts {
            stmt_compiler.compile(stmt)?;
        }
        Ok(())
    }

    /// Non-void bodies must end with a return statement.
    pub fn verify_returns(&self, body: &Block<'_>) -> Result<()> {
        if self.ctx.return_type == host::VOID || body.ends_with_return() {
            return Ok(());
        }
        Err(CompilationError::MissingReturn {
            method: self.image.method_display(self.ctx.method),
            span: body.span,
        })
    }

    /// Place the return label and `ret`, close the Method scope and return
    /// the finished body.
    ///
    /// With `verify_stack`, anything left on the stack at the return label
    /// besides the return value is an error.
    pub fn finish(mut self, verify_stack: bool) -> Result<MethodBody> {
        self.emitter.mark_label(self.return_label)?;
        let depth = self.emitter.stack_depth();
        if verify_stack && depth != 0 {
            return Err(CompilationError::StackImbalance {
                method: self.image.method_display(self.ctx.method),
                depth,
            });
        }
        self.emitter.emit(OpCode::Ret);
        self.scopes.pop();
        Ok(self.emitter.finish()?)
    }

    pub fn context(&self) -> &MethodContext<'r> {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::{compile, opcodes};

    fn global(image: &ProgramImage, name: &str) -> MethodId {
        image.methods_named(None, name)[0]
    }

    #[test]
    fn parameters_are_bound_in_a_method_scope() {
        let mut image = compile("Add(a: int, b: long): long { return a + b; }").unwrap();
        let add = global(&image, "Add");
        let mut scopes = ScopeManager::new();
        let mut compiler = FunctionCompiler::new(&mut image, &mut scopes, add, TypeResolver::new("", &[]));
        compiler.setup_parameters();

        assert_eq!(compiler.scopes.level(), ScopeLevel::Method);
        assert_eq!(compiler.scopes.find("b"), Some(Variable::Param { index: 1, ty: host::INT64 }));
        assert!(compiler.context().is_static);

        compiler.finish(true).unwrap();
        assert!(scopes.is_balanced());
    }

    #[test]
    fn leftover_values_are_a_stack_imbalance() {
        let mut image = compile("F() { }").unwrap();
        let f = global(&image, "F");
        let mut scopes = ScopeManager::new();
        let mut compiler = FunctionCompiler::new(&mut image, &mut scopes, f, TypeResolver::new("", &[]));
        compiler.setup_parameters();
        compiler.emitter.emit(OpCode::PushOne);

        let err = compiler.finish(true).unwrap_err();
        assert!(matches!(err, CompilationError::StackImbalance { depth: 1, .. }));
    }

    #[test]
    fn unverified_finish_keeps_the_body() {
        let mut image = compile("F() { }").unwrap();
        let f = global(&image, "F");
        let mut scopes = ScopeManager::new();
        let mut compiler = FunctionCompiler::new(&mut image, &mut scopes, f, TypeResolver::new("", &[]));
        compiler.setup_parameters();
        compiler.emitter.emit(OpCode::PushOne);

        let body = compiler.finish(false).unwrap();
        body.code.assert_opcodes(&[OpCode::PushOne, OpCode::Ret]);
    }

    #[test]
    fn non_void_body_must_end_with_return() {
        let err = compile("F(): int { a = 1; }").unwrap_err();
        assert!(matches!(err, CompilationError::MissingReturn { ref method, .. } if method == "F"));
    }

    #[test]
    fn constructors_chain_to_the_base() {
        let image = compile(
            "class Animal { @public New() { } }
             class Cat : Animal { @public New() { } }
             class Kitten : Cat { }",
        )
        .unwrap();
        assert_eq!(opcodes(&image, "Cat", ".ctor"), vec![OpCode::LoadThis, OpCode::Call, OpCode::Ret]);
        assert_eq!(opcodes(&image, "Kitten", ".ctor"), vec![OpCode::LoadThis, OpCode::Call, OpCode::Ret]);
    }
}
