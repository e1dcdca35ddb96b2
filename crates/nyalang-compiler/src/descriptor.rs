//! Declaration records shared between the passes.
//!
//! Stage 1 builds one [`ClassDescriptor`] per class, interface and enum and
//! one [`MethodDescriptor`] per method, in dependency order. Stage 2 reads
//! them back to find the syntax node and the image handles for each body it
//! emits. Descriptors refer to the image by id only.

use nyalang_core::{MethodId, Span, TypeId};
use nyalang_parser::ast::{ClassDecl, EnumDecl, MethodDecl};

#[derive(Debug, Clone, Copy)]
pub enum ClassNode<'ast> {
    Class(&'ast ClassDecl<'ast>),
    Enum(&'ast EnumDecl<'ast>),
}

impl<'ast> ClassNode<'ast> {
    pub fn name(&self) -> &'ast str {
        match self {
            ClassNode::Class(decl) => decl.name.name,
            ClassNode::Enum(decl) => decl.name.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ClassNode::Class(decl) => decl.span,
            ClassNode::Enum(decl) => decl.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDescriptor<'ast> {
    pub namespace: String,
    pub node: ClassNode<'ast>,
    /// Full names of the declared classes this one depends on.
    pub dependencies: Vec<String>,
    /// Set once the type is declared.
    pub type_id: Option<TypeId>,
    pub methods: Vec<MethodDescriptor<'ast>>,
}

impl<'ast> ClassDescriptor<'ast> {
    pub fn new(namespace: &str, node: ClassNode<'ast>) -> Self {
        Self {
            namespace: namespace.to_string(),
            node,
            dependencies: Vec::new(),
            type_id: None,
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &'ast str {
        self.node.name()
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name().to_string()
        } else {
            format!("{}.{}", self.namespace, self.name())
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor<'ast> {
    /// The source declaration; `None` for a synthesized default constructor.
    pub decl: Option<&'ast MethodDecl<'ast>>,
    pub method_id: MethodId,
    /// The base constructor an instance constructor chains to.
    pub base_ctor: Option<MethodId>,
}

/// Everything Stage 1 declared, in the order Stage 2 must emit it.
#[derive(Debug, Default)]
pub struct SymbolTable<'ast> {
    /// Classes in dependency order.
    pub classes: Vec<ClassDescriptor<'ast>>,
    /// Global functions, with the namespace they were declared in.
    pub globals: Vec<(String, MethodDescriptor<'ast>)>,
    pub entry_point: Option<MethodId>,
}

impl<'ast> SymbolTable<'ast> {
    pub fn class(&self, ty: TypeId) -> Option<&ClassDescriptor<'ast>> {
        self.classes.iter().find(|c| c.type_id == Some(ty))
    }

    pub fn method_count(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum::<usize>() + self.globals.len()
    }
}
