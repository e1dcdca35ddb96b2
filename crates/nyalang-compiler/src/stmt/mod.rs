//! Statement compiler.
//!
//! The [`StmtCompiler`] compiles the statements of one method body:
//! - Assignments (`=`, compound `op=`, coalescing `?=`), which may declare
//!   new locals
//! - Return statements, which all branch to the method's single exit label
//! - Expression statements, whose value (if any) is discarded
//!
//! Every statement leaves the operand stack as it found it.
//!
//! # Example
//!
//! ```ignore
//! let mut compiler = StmtCompiler::new(image, scopes, emitter, &ctx, return_label);
//! compiler.compile(&stmt)?;
//! ```

mod assign;
mod return_stmt;

use nyalang_core::CompilationError;
use nyalang_parser::ast::{ExprStmt, Stmt};

use crate::bytecode::OpCode;
use crate::emit::{Label, MethodEmitter};
use crate::expr::ExprCompiler;
use crate::function_compiler::MethodContext;
use crate::image::{ProgramImage, host};
use crate::scope::ScopeManager;

type Result<T> = std::result::Result<T, CompilationError>;

/// Compiles statements to bytecode.
pub struct StmtCompiler<'a, 'r> {
    image: &'a mut ProgramImage,
    /// Assignments bind new locals in the innermost scope.
    scopes: &'a mut ScopeManager,
    emitter: &'a mut MethodEmitter,
    ctx: &'a MethodContext<'r>,
    /// Marked just before the method's `ret`.
    return_label: Label,
}

impl<'a, 'r> StmtCompiler<'a, 'r> {
    pub fn new(
        image: &'a mut ProgramImage,
        scopes: &'a mut ScopeManager,
        emitter: &'a mut MethodEmitter,
        ctx: &'a MethodContext<'r>,
        return_label: Label,
    ) -> Self {
        Self {
            image,
            scopes,
            emitter,
            ctx,
            return_label,
        }
    }

    /// Compile a statement.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&mut self, stmt: &Stmt<'_>) -> Result<()> {
        self.emitter.set_line(stmt.span().line);

        match stmt {
            Stmt::Assign(assign) => self.compile_assign(assign),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::Expr(expr_stmt) => self.compile_expr_stmt(expr_stmt),
        }
    }

    /// Evaluates the expression for its side effects and pops the value it
    /// produced, if any.
    fn compile_expr_stmt(&mut self, expr_stmt: &ExprStmt<'_>) -> Result<()> {
        let ty = self.expr().compile(expr_stmt.expr)?;
        if ty != Some(host::VOID) {
            self.emitter.emit(OpCode::Pop);
        }
        Ok(())
    }

    /// An expression compiler over the current scopes.
    fn expr(&mut self) -> ExprCompiler<'_, 'r> {
        ExprCompiler::new(self.image, self.scopes, self.emitter, self.ctx)
    }
}
