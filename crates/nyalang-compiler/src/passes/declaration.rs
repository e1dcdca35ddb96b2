//! Stage 1 - declaration pass.
//!
//! Declares every type, field and method signature into the program image
//! without emitting any bytecode, and records descriptors for Stage 2.
//!
//! ## Order
//!
//! 1. Collect classes, interfaces, enums and global functions, with the
//!    namespace each was declared in.
//! 2. Sort classes so each comes after the classes it derives from.
//! 3. Declare every type (base class and interfaces resolved here).
//! 4. Declare fields and methods class by class. Base classes are complete
//!    before their subclasses, so override resolution always sees the
//!    whole base chain.
//! 5. Declare global functions.
//!
//! ## Method Rules
//!
//! - `New` is the constructor; `!New` the static constructor.
//! - `@public` makes a member public, `@virtual` opens a new virtual slot,
//!   `@abstract` declares a bodiless virtual method in an abstract class.
//! - A method matching a virtual base or interface method by name and
//!   parameter types overrides it. Overrides of public methods must be
//!   public; an override not declared `@virtual` is final.
//! - `@entry` marks the static entry point; at most one is allowed.

use nyalang_core::{CompilationError, MethodId, Span, TypeId};
use nyalang_parser::ast::{ClassDecl, ClassKind, EnumDecl, Item, MethodDecl, Script};
use tracing::{debug, info};

use crate::conversion;
use crate::descriptor::{ClassDescriptor, ClassNode, MethodDescriptor, SymbolTable};
use crate::image::{
    FieldFlags, MethodAttributes, MethodDef, MethodKind, ParamEntry, ProgramImage, TypeDef,
    TypeFlags, TypeKind, host,
};
use crate::literal;
use crate::options::CompileOptions;
use crate::toposort::topo_sort;
use crate::type_resolver::TypeResolver;

type Result<T> = std::result::Result<T, CompilationError>;

/// Name of the constructor in source.
pub const CONSTRUCTOR_NAME: &str = "New";

/// Stage 1: declare types and signatures.
pub struct DeclarationPass<'a, 'ast> {
    image: &'a mut ProgramImage,
    options: &'a CompileOptions,
    classes: Vec<ClassDescriptor<'ast>>,
    globals: Vec<(String, &'ast MethodDecl<'ast>)>,
    entry_point: Option<MethodId>,
}

impl<'a, 'ast> DeclarationPass<'a, 'ast> {
    pub fn new(image: &'a mut ProgramImage, options: &'a CompileOptions) -> Self {
        Self {
            image,
            options,
            classes: Vec::new(),
            globals: Vec::new(),
            entry_point: None,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, script: &'ast Script<'ast>) -> Result<SymbolTable<'ast>> {
        self.collect(script.items(), "");
        self.sort_classes()?;

        for index in 0..self.classes.len() {
            self.declare_type(index)?;
        }
        for index in 0..self.classes.len() {
            self.declare_members(index)?;
        }

        let globals = std::mem::take(&mut self.globals);
        let mut declared_globals = Vec::with_capacity(globals.len());
        for (namespace, decl) in globals {
            let descriptor = self.declare_global(&namespace, decl)?;
            declared_globals.push((namespace, descriptor));
        }

        let table = SymbolTable {
            classes: self.classes,
            globals: declared_globals,
            entry_point: self.entry_point,
        };
        info!(
            classes = table.classes.len(),
            methods = table.method_count(),
            "stage 1: declarations complete"
        );
        Ok(table)
    }

    // ========================================================================
    // Collection and Ordering
    // ========================================================================

    fn collect(&mut self, items: &'ast [Item<'ast>], namespace: &str) {
        for item in items {
            match item {
                Item::Class(decl) => self.classes.push(ClassDescriptor::new(namespace, ClassNode::Class(decl))),
                Item::Enum(decl) => self.classes.push(ClassDescriptor::new(namespace, ClassNode::Enum(decl))),
                Item::Method(decl) => self.globals.push((namespace.to_string(), decl)),
                Item::Namespace(ns) => {
                    let nested = if namespace.is_empty() {
                        ns.name.to_string()
                    } else {
                        format!("{namespace}.{}", ns.name)
                    };
                    self.collect(ns.items, &nested);
                }
                Item::BuildInfo(_) => {}
            }
        }
    }

    /// Record each class's dependencies on other source classes and sort.
    fn sort_classes(&mut self) -> Result<()> {
        let names: Vec<String> = self.classes.iter().map(ClassDescriptor::full_name).collect();
        for class in &mut self.classes {
            let ClassNode::Class(decl) = class.node else {
                continue;
            };
            class.dependencies = decl
                .dependencies
                .iter()
                .filter(|dep| !dep.is_generic())
                .filter_map(|dep| {
                    let scoped = format!("{}.{}", class.namespace, dep.name);
                    [scoped.as_str(), dep.name]
                        .into_iter()
                        .find(|candidate| names.iter().any(|n| n == candidate))
                        .map(str::to_string)
                })
                .collect();
        }

        let order = topo_sort(&self.classes, ClassDescriptor::full_name, |c| c.dependencies.clone()).map_err(
            |cycle| {
                let span = cycle
                    .path
                    .first()
                    .and_then(|name| self.classes.iter().find(|c| &c.full_name() == name))
                    .map_or(Span::default(), |c| c.node.span());
                CompilationError::CyclicDependency {
                    path: cycle.to_string(),
                    span,
                }
            },
        )?;

        let mut slots: Vec<Option<ClassDescriptor<'ast>>> = std::mem::take(&mut self.classes).into_iter().map(Some).collect();
        self.classes = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(())
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn declare_type(&mut self, index: usize) -> Result<()> {
        let node = self.classes[index].node;
        let namespace = self.classes[index].namespace.clone();
        let id = match node {
            ClassNode::Class(decl) => self.declare_class_type(&namespace, decl)?,
            ClassNode::Enum(decl) => self.declare_enum(&namespace, decl)?,
        };
        self.classes[index].type_id = Some(id);
        Ok(())
    }

    fn declare_class_type(&mut self, namespace: &str, decl: &ClassDecl<'ast>) -> Result<TypeId> {
        let options = self.options;
        let resolver = TypeResolver::new(namespace, &options.usings);
        let is_interface = decl.kind == ClassKind::Interface;

        let mut base = None;
        let mut interfaces = Vec::new();
        for (i, dep) in decl.dependencies.iter().enumerate() {
            let ty = resolver.resolve(self.image, dep)?;
            let entry = self.image.ty(ty);
            if entry.is_interface() {
                interfaces.push(ty);
                continue;
            }
            let reason = if is_interface {
                Some("an interface can only extend interfaces")
            } else if i > 0 {
                Some("only the first dependency may be a base class")
            } else if entry.kind != TypeKind::Class || entry.flags.intersects(TypeFlags::SEALED | TypeFlags::STATIC) {
                Some("base type cannot be derived from")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(CompilationError::InvalidDeclaration {
                    name: format!("{} : {}", decl.name.name, dep),
                    reason: reason.to_string(),
                    span: dep.span,
                });
            }
            base = Some(ty);
        }
        if !is_interface && base.is_none() {
            base = Some(host::OBJECT);
        }

        let mut flags = TypeFlags::empty();
        if decl.modifiers.has("public") {
            flags |= TypeFlags::PUBLIC;
        }
        if decl.modifiers.has("abstract") || is_interface {
            flags |= TypeFlags::ABSTRACT;
        }

        let id = self.image.declare_type(TypeDef {
            name: decl.name.name.to_string(),
            namespace: namespace.to_string(),
            kind: if is_interface { TypeKind::Interface } else { TypeKind::Class },
            flags,
            base,
            interfaces,
            span: decl.span,
        })?;
        debug!(ty = %self.image.type_name(id), ?flags, "declared type");
        Ok(id)
    }

    /// Declare an enum and its members as literal static `int` fields.
    fn declare_enum(&mut self, namespace: &str, decl: &EnumDecl<'ast>) -> Result<TypeId> {
        let mut flags = TypeFlags::SEALED | TypeFlags::VALUE_TYPE;
        if decl.modifiers.has("public") {
            flags |= TypeFlags::PUBLIC;
        }
        let id = self.image.declare_type(TypeDef {
            name: decl.name.name.to_string(),
            namespace: namespace.to_string(),
            kind: TypeKind::Enum,
            flags,
            base: Some(host::OBJECT),
            interfaces: Vec::new(),
            span: decl.span,
        })?;

        let mut next: i64 = 0;
        for value in decl.values {
            if let Some(text) = &value.value {
                next = literal::evaluate(text)?
                    .as_i64()
                    .ok_or_else(|| CompilationError::InvalidDeclaration {
                        name: value.name.name.to_string(),
                        reason: "enum values must be integers".to_string(),
                        span: text.span,
                    })?;
            }
            let literal = i32::try_from(next).map_err(|_| CompilationError::InvalidDeclaration {
                name: value.name.name.to_string(),
                reason: "enum value out of range for int".to_string(),
                span: value.span,
            })?;
            self.image.declare_field(
                id,
                value.name.name,
                id,
                FieldFlags::PUBLIC | FieldFlags::STATIC | FieldFlags::LITERAL,
                Some(literal),
                value.span,
            )?;
            next += 1;
        }
        debug!(ty = %self.image.type_name(id), members = decl.values.len(), "declared enum");
        Ok(id)
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn declare_members(&mut self, index: usize) -> Result<()> {
        let ClassNode::Class(decl) = self.classes[index].node else {
            return Ok(());
        };
        let Some(owner) = self.classes[index].type_id else {
            return Err(CompilationError::internal("class members declared before the type"));
        };
        let namespace = self.classes[index].namespace.clone();
        let is_interface = decl.kind == ClassKind::Interface;

        for field in decl.fields() {
            if is_interface {
                return Err(CompilationError::InvalidDeclaration {
                    name: field.name.name.to_string(),
                    reason: "interfaces cannot declare fields".to_string(),
                    span: field.span,
                });
            }
            let ty = self.resolver_for(&namespace).resolve(self.image, &field.ty)?;
            let mut flags = FieldFlags::empty();
            if field.modifiers.has("public") {
                flags |= FieldFlags::PUBLIC;
            }
            if field.modifiers.is_static {
                flags |= FieldFlags::STATIC;
            }
            self.image
                .declare_field(owner, field.name.name, ty, flags, None, field.span)?;
        }

        let mut methods = Vec::new();
        let mut has_instance_ctor = false;
        for method in decl.methods() {
            let descriptor = self.declare_class_method(&namespace, owner, method)?;
            has_instance_ctor |= self.image.method(descriptor.method_id).is_constructor();
            methods.push(descriptor);
        }

        if !is_interface && !has_instance_ctor {
            methods.push(self.declare_default_ctor(owner, decl.span)?);
        }
        self.classes[index].methods = methods;
        Ok(())
    }

    fn resolver_for<'n>(&self, namespace: &'n str) -> TypeResolver<'n>
    where
        'a: 'n,
    {
        TypeResolver::new(namespace, &self.options.usings)
    }

    fn invalid(decl: &MethodDecl<'_>, reason: &str) -> CompilationError {
        CompilationError::InvalidDeclaration {
            name: decl.name.name.to_string(),
            reason: reason.to_string(),
            span: decl.span,
        }
    }

    fn declare_class_method(&mut self, namespace: &str, owner: TypeId, decl: &'ast MethodDecl<'ast>) -> Result<MethodDescriptor<'ast>> {
        let owner_entry = self.image.ty(owner);
        let in_interface = owner_entry.is_interface();
        let in_abstract = owner_entry.flags.contains(TypeFlags::ABSTRACT);
        let base = owner_entry.base;

        let modifiers = decl.modifiers;
        let is_static = modifiers.is_static;
        let is_ctor = decl.name.name == CONSTRUCTOR_NAME;
        let declared_virtual = modifiers.has("virtual");
        let declared_abstract = modifiers.has("abstract");

        let (name, kind) = match (is_ctor, is_static) {
            (true, false) => (MethodKind::CTOR.to_string(), MethodKind::Constructor),
            (true, true) => (MethodKind::CCTOR.to_string(), MethodKind::StaticConstructor),
            (false, _) => (decl.name.name.to_string(), MethodKind::Normal),
        };

        let mut attributes = MethodAttributes::HIDE_BY_SIG;
        if is_static {
            attributes |= MethodAttributes::STATIC;
        }
        if modifiers.has("public") && kind != MethodKind::StaticConstructor {
            attributes |= MethodAttributes::PUBLIC;
        }
        if is_ctor {
            attributes |= MethodAttributes::SPECIAL_NAME;
            if decl.return_type.is_some() {
                return Err(Self::invalid(decl, "constructors cannot declare a return type"));
            }
            if in_interface {
                return Err(Self::invalid(decl, "interfaces cannot declare constructors"));
            }
            if declared_virtual || declared_abstract {
                return Err(Self::invalid(decl, "constructors cannot be virtual"));
            }
            if is_static && !decl.params.is_empty() {
                return Err(Self::invalid(decl, "static constructors cannot take parameters"));
            }
        }
        if is_static && (declared_virtual || declared_abstract) {
            return Err(Self::invalid(decl, "static methods cannot be virtual"));
        }

        if in_interface {
            if is_static {
                return Err(Self::invalid(decl, "interface methods cannot be static"));
            }
            if decl.body.is_some() {
                return Err(Self::invalid(decl, "interface methods cannot have a body"));
            }
            attributes |= MethodAttributes::PUBLIC
                | MethodAttributes::ABSTRACT
                | MethodAttributes::VIRTUAL
                | MethodAttributes::NEW_SLOT;
        } else if declared_abstract {
            if !in_abstract {
                return Err(Self::invalid(decl, "abstract methods require an abstract class"));
            }
            if decl.body.is_some() {
                return Err(Self::invalid(decl, "abstract methods cannot have a body"));
            }
            attributes |= MethodAttributes::ABSTRACT | MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT;
        } else {
            if decl.body.is_none() {
                return Err(Self::invalid(decl, "missing method body"));
            }
            if declared_virtual {
                attributes |= MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT;
            }
        }

        let params = self.declare_params(namespace, decl)?;
        let return_type = self.resolver_for(namespace).resolve_return(self.image, decl.return_type.as_ref())?;

        let mut overrides = Vec::new();
        if kind == MethodKind::Normal && !is_static && !in_interface {
            let param_types: Vec<TypeId> = params.iter().map(|p| p.ty).collect();
            self.resolve_overrides(owner, decl, &param_types, return_type, &mut attributes, &mut overrides)?;
        }

        let id = self.image.declare_method(MethodDef {
            name,
            owner: Some(owner),
            kind,
            attributes,
            params,
            return_type,
            span: decl.span,
        })?;
        self.image.set_overrides(id, overrides);

        let base_ctor = if kind == MethodKind::Constructor {
            Some(self.base_default_ctor(base, decl.span)?)
        } else {
            None
        };

        if modifiers.has("entry") {
            self.register_entry(id, decl)?;
        }

        debug!(
            method = %self.image.method_display(id),
            ?attributes,
            params = decl.params.len(),
            "declared method"
        );
        Ok(MethodDescriptor {
            decl: Some(decl),
            method_id: id,
            base_ctor,
        })
    }

    fn declare_params(&mut self, namespace: &str, decl: &MethodDecl<'ast>) -> Result<Vec<ParamEntry>> {
        let resolver = self.resolver_for(namespace);
        let mut params = Vec::with_capacity(decl.params.len());
        let mut seen_optional = false;

        for param in decl.params {
            let ty = resolver.resolve(self.image, &param.ty)?;
            let default = param.default.as_ref().map(literal::evaluate).transpose()?;
            if let Some(value) = &default
                && conversion::plan(self.image, value.type_id(), Some(ty)).is_none()
            {
                return Err(CompilationError::Conversion {
                    from: self.image.type_name_opt(value.type_id()),
                    to: self.image.type_name(ty),
                    span: param.span,
                });
            }

            let optional = param.optional || default.is_some();
            if seen_optional && !optional {
                return Err(CompilationError::InvalidDeclaration {
                    name: param.name.name.to_string(),
                    reason: "required parameters cannot follow optional ones".to_string(),
                    span: param.span,
                });
            }
            seen_optional |= optional;

            params.push(ParamEntry {
                name: param.name.name.to_string(),
                ty,
                optional,
                default,
            });
        }
        Ok(params)
    }

    /// Match a new instance method against the virtual methods it may
    /// override, adjusting its attributes.
    fn resolve_overrides(
        &self,
        owner: TypeId,
        decl: &MethodDecl<'_>,
        params: &[TypeId],
        return_type: TypeId,
        attributes: &mut MethodAttributes,
        overrides: &mut Vec<MethodId>,
    ) -> Result<()> {
        let name = decl.name.name;
        let declared_virtual = decl.modifiers.has("virtual") || decl.modifiers.has("abstract");

        let base_match = self.image.base_chain(owner).skip(1).find_map(|ancestor| {
            self.image
                .find_method(Some(ancestor), name, params)
                .filter(|&m| {
                    let base = self.image.method(m);
                    base.is_virtual() && !base.is_final() && !base.is_static()
                })
        });
        let interface_matches: Vec<MethodId> = self
            .image
            .all_interfaces(owner)
            .into_iter()
            .filter_map(|iface| self.image.find_method(Some(iface), name, params))
            .collect();

        for &target in base_match.iter().chain(&interface_matches) {
            let base = self.image.method(target);
            if base.is_public() && !attributes.contains(MethodAttributes::PUBLIC) {
                return Err(CompilationError::Visibility {
                    name: format!("{}.{}", self.image.type_name(owner), name),
                    reason: format!("overrides public '{}' and must be public", self.image.method_display(target)),
                    span: decl.span,
                });
            }
            if base.return_type != return_type {
                return Err(CompilationError::InvalidDeclaration {
                    name: name.to_string(),
                    reason: format!(
                        "return type '{}' does not match '{}' of '{}'",
                        self.image.type_name(return_type),
                        self.image.type_name(base.return_type),
                        self.image.method_display(target)
                    ),
                    span: decl.span,
                });
            }
            overrides.push(target);
        }

        if overrides.is_empty() {
            return Ok(());
        }
        *attributes |= MethodAttributes::VIRTUAL;
        if !declared_virtual {
            *attributes |= MethodAttributes::FINAL;
        }
        if base_match.is_some() {
            attributes.remove(MethodAttributes::NEW_SLOT);
        } else {
            *attributes |= MethodAttributes::NEW_SLOT;
        }
        Ok(())
    }

    /// The public parameterless constructor of `base` an instance
    /// constructor chains to.
    fn base_default_ctor(&self, base: Option<TypeId>, span: Span) -> Result<MethodId> {
        let base = base.unwrap_or(host::OBJECT);
        let ctor = self
            .image
            .find_method(Some(base), MethodKind::CTOR, &[])
            .ok_or_else(|| CompilationError::UnresolvedMethod {
                type_name: self.image.type_name(base),
                name: MethodKind::CTOR.to_string(),
                args: String::new(),
                span,
            })?;
        if !self.image.method(ctor).is_public() {
            return Err(CompilationError::Visibility {
                name: self.image.method_display(ctor),
                reason: "is not public and cannot be chained to".to_string(),
                span,
            });
        }
        Ok(ctor)
    }

    fn declare_default_ctor(&mut self, owner: TypeId, span: Span) -> Result<MethodDescriptor<'ast>> {
        let base_ctor = self.base_default_ctor(self.image.ty(owner).base, span)?;
        let id = self.image.declare_method(MethodDef {
            name: MethodKind::CTOR.to_string(),
            owner: Some(owner),
            kind: MethodKind::Constructor,
            attributes: MethodAttributes::PUBLIC | MethodAttributes::SPECIAL_NAME | MethodAttributes::HIDE_BY_SIG,
            params: Vec::new(),
            return_type: host::VOID,
            span,
        })?;
        debug!(ty = %self.image.type_name(owner), "synthesized default constructor");
        Ok(MethodDescriptor {
            decl: None,
            method_id: id,
            base_ctor: Some(base_ctor),
        })
    }

    fn register_entry(&mut self, id: MethodId, decl: &MethodDecl<'_>) -> Result<()> {
        if !decl.modifiers.is_static {
            return Err(Self::invalid(decl, "the entry point must be static"));
        }
        self.record_entry(id)
    }

    /// Remember the entry point; the driver registers it once codegen is
    /// done. A second `@entry` is an error.
    fn record_entry(&mut self, id: MethodId) -> Result<()> {
        if let Some(first) = self.entry_point
            && first != id
        {
            return Err(CompilationError::DuplicateEntryPoint {
                first: self.image.method_display(first),
                second: self.image.method_display(id),
                span: self.image.method(id).span,
            });
        }
        self.entry_point = Some(id);
        Ok(())
    }

    // ========================================================================
    // Globals
    // ========================================================================

    fn declare_global(&mut self, namespace: &str, decl: &'ast MethodDecl<'ast>) -> Result<MethodDescriptor<'ast>> {
        let modifiers = decl.modifiers;
        if decl.name.name == CONSTRUCTOR_NAME {
            return Err(Self::invalid(decl, "constructors must be declared in a class"));
        }
        if modifiers.has("virtual") || modifiers.has("abstract") {
            return Err(Self::invalid(decl, "global functions cannot be virtual"));
        }
        if decl.body.is_none() {
            return Err(Self::invalid(decl, "missing method body"));
        }

        let mut attributes = MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG;
        if modifiers.has("public") {
            attributes |= MethodAttributes::PUBLIC;
        }
        let params = self.declare_params(namespace, decl)?;
        let return_type = self.resolver_for(namespace).resolve_return(self.image, decl.return_type.as_ref())?;

        let id = self.image.declare_method(MethodDef {
            name: decl.name.name.to_string(),
            owner: None,
            kind: MethodKind::Normal,
            attributes,
            params,
            return_type,
            span: decl.span,
        })?;
        if modifiers.has("entry") {
            self.record_entry(id)?;
        }
        debug!(method = %self.image.method_display(id), "declared global function");
        Ok(MethodDescriptor {
            decl: Some(decl),
            method_id: id,
            base_ctor: None,
        })
    }
}
