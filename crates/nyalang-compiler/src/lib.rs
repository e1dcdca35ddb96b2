//! NyaLang Compiler
//!
//! A staged compiler lowering a parsed NyaLang script into a stack-machine
//! [`ProgramImage`].
//!
//! ## Architecture
//!
//! - **Stage 0 (Metadata)**: build-info declarations become image metadata
//! - **Stage 1 (Declaration)**: types, fields and method signatures are
//!   declared in dependency order, overrides and the entry point resolved
//! - **Stage 2 (Codegen)**: method bodies are emitted and types finalized
//!
//! The first error aborts the compilation; no partial image is returned.
//!
//! ## Modules
//!
//! - [`bytecode`]: Opcodes, method bytecode chunks and the constant pool
//! - [`conversion`]: Implicit and explicit conversions, operator dispatch
//! - [`emit`]: Per-method emitter with stack depth tracking and labels
//! - [`expr`]: Expression compiler
//! - [`image`]: The program image, host types and the binary writer
//! - [`overload`]: Overload resolution for calls
//! - [`passes`]: The three compiler stages
//! - [`scope`]: Global/Class/Method scopes
//! - [`stmt`]: Statement compiler
//! - [`toposort`]: Dependency ordering with cycle detection
//! - [`type_resolver`]: Type names to image types

pub mod bytecode;
pub mod conversion;
pub mod descriptor;
pub mod emit;
pub mod expr;
pub mod function_compiler;
pub mod image;
pub mod literal;
pub mod options;
pub mod overload;
pub mod passes;
pub mod scope;
pub mod stmt;
pub mod toposort;
pub mod type_resolver;

pub use conversion::{Conversion, ConversionKind};
pub use emit::MethodEmitter;
pub use expr::ExprCompiler;
pub use image::ProgramImage;
pub use options::CompileOptions;
pub use overload::OverloadMatch;
pub use passes::{CodegenOutput, CodegenPass, DeclarationPass, MetadataPass};
pub use scope::{ScopeManager, Variable};
pub use stmt::StmtCompiler;
pub use type_resolver::TypeResolver;

// Re-export CompilationError from core for convenience
pub use nyalang_core::CompilationError;

use nyalang_parser::Script;
use tracing::info;

/// Runs the three stages over a parsed script.
pub struct Compiler;

impl Compiler {
    /// Compile `script` into a program image.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(script: &Script<'_>, options: &CompileOptions) -> Result<ProgramImage, CompilationError> {
        let metadata = MetadataPass::new(options).run(script)?;

        let mut image = ProgramImage::new();
        let table = DeclarationPass::new(&mut image, options).run(script)?;
        let output = CodegenPass::new(&mut image, options, &table).run()?;

        image.set_metadata(metadata);
        if let Some(entry) = table.entry_point {
            image.set_entry_point(entry)?;
        }

        info!(
            name = image.name(),
            types = table.classes.len(),
            methods = output.methods_compiled,
            entry = ?image.entry_point().map(|m| image.method_display(m)),
            "compiled program image"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use nyalang_parser::Parser;

    fn compile(source: &str, options: &CompileOptions) -> Result<ProgramImage, CompilationError> {
        let arena = Bump::new();
        let script = Parser::parse(source, &arena).unwrap();
        Compiler::compile(&script, options)
    }

    #[test]
    fn image_carries_metadata_and_entry_point() {
        let image = compile(
            "Title = \"Zoo\";
             Version = \"1.2.3\";
             class Program { @public !@entry Main(): int { return 0; } }",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(image.name(), "Zoo");
        let entry = image.entry_point().unwrap();
        assert_eq!(image.method_display(entry), "Program.Main");
        assert!(image.method(entry).body.is_some());
    }

    #[test]
    fn failed_compilation_has_no_image() {
        let err = compile("class A : B { } class B : A { }", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompilationError::CyclicDependency { .. }));
    }

    #[test]
    fn default_name_comes_from_options() {
        let options = CompileOptions::default().with_assembly_name("cats");
        let image = compile("F() { }", &options).unwrap();
        assert_eq!(image.name(), "cats");
        assert_eq!(image.entry_point(), None);
    }
}
