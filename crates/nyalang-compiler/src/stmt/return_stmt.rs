//! Return statement compilation.
//!
//! Every `return` branches to the method's return label, which sits right
//! before the single `ret` instruction. The returned value is the only thing
//! on the stack at that label.

use nyalang_core::CompilationError;
use nyalang_parser::ast::ReturnStmt;

use super::{Result, StmtCompiler};
use crate::bytecode::OpCode;
use crate::image::host;

impl<'a, 'r> StmtCompiler<'a, 'r> {
    /// Compile a return statement.
    ///
    /// The value is converted to the declared return type. Void methods must
    /// not return a value and other methods must.
    pub fn compile_return(&mut self, ret: &ReturnStmt<'_>) -> Result<()> {
        let return_type = self.ctx.return_type;
        match (ret.value, return_type == host::VOID) {
            (Some(value), false) => {
                self.expr().compile_as_type(value, return_type)?;
                // The value is consumed by `ret`, not by this branch.
                self.emitter.adjust_depth(-1);
            }
            (None, true) => {}
            (Some(value), true) => {
                let ty = self.expr().compile(value)?;
                return Err(CompilationError::Conversion {
                    from: self.image.type_name_opt(ty),
                    to: "void".to_string(),
                    span: ret.span,
                });
            }
            (None, false) => {
                return Err(CompilationError::Conversion {
                    from: "void".to_string(),
                    to: self.image.type_name(return_type),
                    span: ret.span,
                });
            }
        }
        self.emitter.emit_branch(OpCode::Br, self.return_label)?;
        Ok(())
    }
}
