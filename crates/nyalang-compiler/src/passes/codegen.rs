//! Stage 2 - code generation.
//!
//! Emits a body for every declared method with one, walking classes in the
//! order Stage 1 sorted them, then the global functions.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ CodegenPass                                          │
//! │   - Class scope per class, binding inherited fields  │
//! │   - FunctionCompiler per method                      │
//! │   - Finalizes each type once its bodies are emitted  │
//! └──────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ FunctionCompiler                                     │
//! │   - Method scope with the parameters                 │
//! │   - StmtCompiler for the body                        │
//! │   - Return label, stack check and `ret`              │
//! └──────────────────────────────────────────────────────┘
//! ```

use nyalang_core::{CompilationError, TypeId};
use tracing::{debug, info};

use crate::descriptor::{ClassDescriptor, ClassNode, MethodDescriptor, SymbolTable};
use crate::function_compiler::FunctionCompiler;
use crate::image::ProgramImage;
use crate::options::CompileOptions;
use crate::scope::{ScopeLevel, ScopeManager, Variable};
use crate::type_resolver::TypeResolver;

type Result<T> = std::result::Result<T, CompilationError>;

/// Output from the code generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenOutput {
    /// Bodies emitted, synthesized constructors included.
    pub methods_compiled: usize,
    pub scope_pushes: usize,
    pub scope_pops: usize,
}

/// Stage 2: emit method bodies.
pub struct CodegenPass<'a, 'ast> {
    image: &'a mut ProgramImage,
    options: &'a CompileOptions,
    table: &'a SymbolTable<'ast>,
    scopes: ScopeManager,
    methods_compiled: usize,
}

impl<'a, 'ast> CodegenPass<'a, 'ast> {
    pub fn new(image: &'a mut ProgramImage, options: &'a CompileOptions, table: &'a SymbolTable<'ast>) -> Self {
        Self {
            image,
            options,
            table,
            scopes: ScopeManager::new(),
            methods_compiled: 0,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> Result<CodegenOutput> {
        let table = self.table;
        for class in &table.classes {
            self.compile_class(class)?;
        }
        for (namespace, method) in &table.globals {
            self.compile_method(namespace, method)?;
        }

        if !self.scopes.is_balanced() {
            return Err(CompilationError::internal(format!(
                "unbalanced scopes after codegen: {} pushed, {} popped",
                self.scopes.pushes(),
                self.scopes.pops()
            )));
        }

        info!(methods = self.methods_compiled, "code generation complete");
        Ok(CodegenOutput {
            methods_compiled: self.methods_compiled,
            scope_pushes: self.scopes.pushes(),
            scope_pops: self.scopes.pops(),
        })
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn compile_class(&mut self, class: &ClassDescriptor<'ast>) -> Result<()> {
        let ty = class
            .type_id
            .ok_or_else(|| CompilationError::internal(format!("type '{}' was never declared", class.full_name())))?;

        if let ClassNode::Class(_) = class.node {
            self.scopes.push(ScopeLevel::Class);
            self.bind_fields(ty);
            for method in &class.methods {
                self.compile_method(&class.namespace, method)?;
            }
            self.scopes.pop();
        }

        self.image.finalize_type(ty)?;
        debug!(ty = %self.image.type_name(ty), "finalized type");
        Ok(())
    }

    /// Bind the fields of `ty` and its bases. Fields of derived types shadow
    /// same-named base fields; enum literals are reached by member access.
    fn bind_fields(&mut self, ty: TypeId) {
        let chain: Vec<TypeId> = self.image.base_chain(ty).collect();
        for &owner in chain.iter().rev() {
            for &field in &self.image.ty(owner).fields {
                let entry = self.image.field(field);
                if entry.literal.is_some() {
                    continue;
                }
                self.scopes.add(
                    entry.name.clone(),
                    Variable::Field {
                        field,
                        ty: entry.ty,
                        is_static: entry.is_static(),
                    },
                );
            }
        }
    }

    // ========================================================================
    // Methods
    // ========================================================================

    fn compile_method(&mut self, namespace: &str, method: &MethodDescriptor<'ast>) -> Result<()> {
        let body = method.decl.and_then(|decl| decl.body.as_ref());
        if method.decl.is_some() && body.is_none() {
            return Ok(());
        }

        let resolver = TypeResolver::new(namespace, &self.options.usings);
        let mut compiler = FunctionCompiler::new(self.image, &mut self.scopes, method.method_id, resolver);
        compiler.setup_parameters();
        if let Some(base_ctor) = method.base_ctor {
            compiler.chain_base_constructor(base_ctor);
        }
        if let Some(body) = body {
            compiler.compile_body(body)?;
            compiler.verify_returns(body)?;
        }
        let body = compiler.finish(self.options.verify_stack)?;

        debug!(
            method = %self.image.method_display(method.method_id),
            bytes = body.code.len(),
            max_stack = body.max_stack,
            "emitted method body"
        );
        self.image.set_body(method.method_id, body);
        self.methods_compiled += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::DeclarationPass;
    use bumpalo::Bump;
    use nyalang_parser::Parser;

    fn codegen(source: &str) -> Result<(ProgramImage, CodegenOutput)> {
        let arena = Bump::new();
        let script = Parser::parse(source, &arena).unwrap();
        let options = CompileOptions::default();
        let mut image = ProgramImage::new();
        let table = DeclarationPass::new(&mut image, &options).run(&script)?;
        let output = CodegenPass::new(&mut image, &options, &table).run()?;
        Ok((image, output))
    }

    #[test]
    fn scopes_balance_across_classes_and_globals() {
        let (_, output) = codegen(
            "namespace Zoo {
                class Animal { @public @virtual Speak(): string { return \"...\"; } }
                class Cat : Animal { @public Speak(): string { return \"meow\"; } }
                enum Mood { Happy }
            }
            Helper(x: int): int { return x * 2; }",
        )
        .unwrap();
        // Animal: Speak + .ctor, Cat: Speak + .ctor, Helper
        assert_eq!(output.methods_compiled, 5);
        // Two class scopes and one method scope per body
        assert_eq!(output.scope_pushes, 7);
        assert_eq!(output.scope_pushes, output.scope_pops);
    }

    #[test]
    fn abstract_methods_have_no_body() {
        let (image, _) = codegen(
            "@abstract class Animal { @public @abstract Speak(): string; }
             class Cat : Animal { @public Speak(): string { return \"meow\"; } }",
        )
        .unwrap();
        let animal = image.find_type("Animal").unwrap();
        let speak = image.methods_named(Some(animal), "Speak")[0];
        assert!(image.method(speak).body.is_none());

        let cat = image.find_type("Cat").unwrap();
        let speak = image.methods_named(Some(cat), "Speak")[0];
        assert!(image.method(speak).body.is_some());
    }

    #[test]
    fn types_are_finalized_after_their_bodies() {
        let err = codegen(
            "interface Dog { DoThing(): int; }
             class Cat : Dog { }",
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::UnimplementedInterfaceMethod { ref method, .. } if method == "DoThing"));
    }

    #[test]
    fn derived_fields_shadow_base_fields() {
        let (image, _) = codegen(
            "class Animal { name: int; }
             class Cat : Animal { name: string; @public Get(): string { return name; } }",
        )
        .unwrap();
        let cat = image.find_type("Cat").unwrap();
        let get = image.methods_named(Some(cat), "Get")[0];
        let field = image.find_field(cat, "name").unwrap();
        assert_eq!(image.field(field).owner, cat);
        assert_eq!(image.method(get).return_type, crate::image::host::STRING);
    }
}
