//! The program image: the loadable output of compilation.
//!
//! A [`ProgramImage`] owns every type, method and field (host and declared),
//! the image-wide constant pool, build metadata and the entry point. It is
//! the "bytecode emitter collaborator" of the passes: Stage 1 declares types
//! and method signatures into it, Stage 2 attaches bodies and finalizes types.
//!
//! Every image is seeded with the host type universe (see [`host`]), so well
//! known types have fixed ids such as [`host::INT32`].

pub mod host;
mod methods;
mod types;
mod writer;

use nyalang_core::{CompilationError, FieldId, MethodId, Span, TypeHash, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bytecode::ConstantPool;

pub use methods::{
    ArithOp, HostOp, MethodAttributes, MethodBody, MethodEntry, MethodKind, ParamEntry,
};
pub use types::{FieldEntry, FieldFlags, PrimitiveKind, TypeEntry, TypeFlags, TypeKind};
pub use writer::{FORMAT_VERSION, MAGIC};

// ============================================================================
// Metadata
// ============================================================================

/// Value of a build-info attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    Int(i64),
}

/// Assembly-level build information collected by Stage 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub name: String,
    pub version: [u16; 4],
    /// Known attributes and custom keys, in order of first appearance.
    pub attributes: Vec<(String, MetadataValue)>,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            name: String::from("NyaProgram"),
            version: [0; 4],
            attributes: Vec::new(),
        }
    }
}

impl ImageMetadata {
    pub fn attribute(&self, key: &str) -> Option<&MetadataValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Store `value` under `key`; a repeated key replaces the earlier value.
    pub fn set_attribute(&mut self, key: &str, value: MetadataValue) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A type to declare.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub flags: TypeFlags,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub span: Span,
}

/// A method signature to declare.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub owner: Option<TypeId>,
    pub kind: MethodKind,
    pub attributes: MethodAttributes,
    pub params: Vec<ParamEntry>,
    pub return_type: TypeId,
    pub span: Span,
}

// ============================================================================
// ProgramImage
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProgramImage {
    metadata: ImageMetadata,
    types: Vec<TypeEntry>,
    methods: Vec<MethodEntry>,
    fields: Vec<FieldEntry>,
    constants: ConstantPool,
    /// Full name to type.
    type_index: FxHashMap<String, TypeId>,
    /// `(owner, name, parameter types)` to method.
    signatures: FxHashMap<TypeHash, MethodId>,
    globals: Vec<MethodId>,
    arrays: FxHashMap<TypeId, TypeId>,
    instances: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    entry_point: Option<MethodId>,
}

impl Default for ProgramImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramImage {
    /// An empty image seeded with the host types.
    pub fn new() -> Self {
        let mut image = Self {
            metadata: ImageMetadata::default(),
            types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            constants: ConstantPool::new(),
            type_index: FxHashMap::default(),
            signatures: FxHashMap::default(),
            globals: Vec::new(),
            arrays: FxHashMap::default(),
            instances: FxHashMap::default(),
            entry_point: None,
        };
        host::seed(&mut image);
        image
    }

    // ========================================================================
    // Metadata and Entry Point
    // ========================================================================

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: ImageMetadata) {
        self.metadata = metadata;
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn entry_point(&self) -> Option<MethodId> {
        self.entry_point
    }

    /// Register the entry point. A second registration is an error.
    pub fn set_entry_point(&mut self, method: MethodId) -> Result<(), CompilationError> {
        if let Some(first) = self.entry_point
            && first != method
        {
            return Err(CompilationError::DuplicateEntryPoint {
                first: self.method_display(first),
                second: self.method_display(method),
                span: self.method(method).span,
            });
        }
        self.entry_point = Some(method);
        Ok(())
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    // ========================================================================
    // Declaration
    // ========================================================================

    /// Declare a type. Fails if the full name is taken.
    pub fn declare_type(&mut self, def: TypeDef) -> Result<TypeId, CompilationError> {
        let full_name = if def.namespace.is_empty() {
            def.name.clone()
        } else {
            format!("{}.{}", def.namespace, def.name)
        };
        if self.type_index.contains_key(&full_name) {
            return Err(CompilationError::DuplicateDefinition {
                name: full_name,
                span: def.span,
            });
        }
        Ok(self.push_type(def))
    }

    pub(crate) fn push_type(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        let entry = TypeEntry {
            id,
            name: def.name,
            namespace: def.namespace,
            kind: def.kind,
            flags: def.flags,
            base: def.base,
            interfaces: def.interfaces,
            methods: Vec::new(),
            fields: Vec::new(),
            span: def.span,
        };
        self.type_index.insert(entry.full_name(), id);
        self.types.push(entry);
        id
    }

    /// Declare a field. Fails if the owner already has a field of that name.
    pub fn declare_field(
        &mut self,
        owner: TypeId,
        name: &str,
        ty: TypeId,
        flags: FieldFlags,
        literal: Option<i32>,
        span: Span,
    ) -> Result<FieldId, CompilationError> {
        let exists = self.types[owner.index()]
            .fields
            .iter()
            .any(|&f| self.fields[f.index()].name == name);
        if exists {
            return Err(CompilationError::DuplicateDefinition {
                name: format!("{}.{}", self.type_name(owner), name),
                span,
            });
        }

        let id = FieldId::new(self.fields.len() as u32);
        self.fields.push(FieldEntry {
            id,
            name: name.to_string(),
            owner,
            ty,
            flags,
            literal,
            span,
        });
        self.types[owner.index()].fields.push(id);
        Ok(id)
    }

    /// Declare a method. Fails if the owner already has the same signature.
    pub fn declare_method(&mut self, def: MethodDef) -> Result<MethodId, CompilationError> {
        let params: Vec<TypeId> = def.params.iter().map(|p| p.ty).collect();
        let key = TypeHash::from_signature(def.owner, &def.name, &params);
        if self.signatures.contains_key(&key) {
            let owner = def.owner.map(|o| self.type_name(o) + ".").unwrap_or_default();
            return Err(CompilationError::DuplicateDefinition {
                name: format!("{owner}{}", def.name),
                span: def.span,
            });
        }
        Ok(self.push_method(def, None))
    }

    pub(crate) fn push_method(&mut self, def: MethodDef, host: Option<HostOp>) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        let params: Vec<TypeId> = def.params.iter().map(|p| p.ty).collect();
        self.signatures
            .entry(TypeHash::from_signature(def.owner, &def.name, &params))
            .or_insert(id);

        match def.owner {
            Some(owner) => self.types[owner.index()].methods.push(id),
            None => self.globals.push(id),
        }
        self.methods.push(MethodEntry {
            id,
            name: def.name,
            owner: def.owner,
            kind: def.kind,
            attributes: def.attributes,
            params: def.params,
            return_type: def.return_type,
            overrides: Vec::new(),
            body: None,
            host,
            span: def.span,
        });
        id
    }

    pub fn set_attributes(&mut self, method: MethodId, attributes: MethodAttributes) {
        self.methods[method.index()].attributes = attributes;
    }

    pub fn set_overrides(&mut self, method: MethodId, overrides: Vec<MethodId>) {
        self.methods[method.index()].overrides = overrides;
    }

    pub fn set_body(&mut self, method: MethodId, body: MethodBody) {
        self.methods[method.index()].body = Some(body);
    }

    /// Check a class is complete and mark it finalized.
    ///
    /// A concrete class must implement every method of every interface it
    /// implements and every abstract method of its base classes.
    pub fn finalize_type(&mut self, ty: TypeId) -> Result<(), CompilationError> {
        let entry = self.ty(ty);
        if entry.kind == TypeKind::Class && !entry.is_abstract() {
            let mut required: Vec<MethodId> = Vec::new();
            for iface in self.all_interfaces(ty) {
                required.extend(self.ty(iface).methods.iter().copied());
            }
            for ancestor in self.base_chain(ty).skip(1) {
                required.extend(
                    self.ty(ancestor)
                        .methods
                        .iter()
                        .copied()
                        .filter(|&m| self.method(m).is_abstract()),
                );
            }

            for method in required {
                if self.resolve_virtual(ty, method).is_none() {
                    let declared = self.method(method);
                    return Err(CompilationError::UnimplementedInterfaceMethod {
                        type_name: self.type_name(ty),
                        interface: declared.owner.map(|o| self.type_name(o)).unwrap_or_default(),
                        method: declared.name.clone(),
                        span: self.ty(ty).span,
                    });
                }
            }
        }
        self.types[ty.index()].flags |= TypeFlags::FINALIZED;
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Get a type. Ids are only produced by this image, so indexing is valid.
    pub fn ty(&self, id: TypeId) -> &TypeEntry {
        &self.types[id.index()]
    }

    pub fn get_type(&self, id: TypeId) -> Option<&TypeEntry> {
        self.types.get(id.index())
    }

    pub fn method(&self, id: MethodId) -> &MethodEntry {
        &self.methods[id.index()]
    }

    pub fn get_method(&self, id: MethodId) -> Option<&MethodEntry> {
        self.methods.get(id.index())
    }

    pub fn field(&self, id: FieldId) -> &FieldEntry {
        &self.fields[id.index()]
    }

    pub fn get_field(&self, id: FieldId) -> Option<&FieldEntry> {
        self.fields.get(id.index())
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }

    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    pub fn global_methods(&self) -> &[MethodId] {
        &self.globals
    }

    /// Look up a type by namespace-qualified name.
    pub fn find_type(&self, full_name: &str) -> Option<TypeId> {
        self.type_index.get(full_name).copied()
    }

    /// Exact-signature lookup on one owner (no inheritance).
    pub fn find_method(&self, owner: Option<TypeId>, name: &str, params: &[TypeId]) -> Option<MethodId> {
        self.signatures
            .get(&TypeHash::from_signature(owner, name, params))
            .copied()
    }

    /// All methods of one owner with the given name.
    pub fn methods_named(&self, owner: Option<TypeId>, name: &str) -> Vec<MethodId> {
        let ids = match owner {
            Some(ty) => &self.ty(ty).methods,
            None => &self.globals,
        };
        ids.iter()
            .copied()
            .filter(|&m| self.method(m).name == name)
            .collect()
    }

    /// Find a field on the type or one of its base classes.
    pub fn find_field(&self, ty: TypeId, name: &str) -> Option<FieldId> {
        self.base_chain(ty).find_map(|t| {
            self.ty(t)
                .fields
                .iter()
                .copied()
                .find(|&f| self.field(f).name == name)
        })
    }

    /// The type followed by its base classes, most derived first.
    pub fn base_chain(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(ty), move |&t| self.get_type(t).and_then(|e| e.base))
    }

    /// Every interface implemented by the type, its bases, and inherited by
    /// those interfaces, in discovery order.
    pub fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut pending: Vec<TypeId> = Vec::new();
        for t in self.base_chain(ty) {
            pending.extend(self.ty(t).interfaces.iter().rev());
            while let Some(iface) = pending.pop() {
                if seen.insert(iface) {
                    out.push(iface);
                    pending.extend(self.ty(iface).interfaces.iter().rev());
                }
            }
        }
        out
    }

    /// Whether a value of `sub` is also a `sup` by inheritance.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup || self.base_chain(sub).any(|t| t == sup) {
            return true;
        }
        self.ty(sup).is_interface() && self.all_interfaces(sub).contains(&sup)
    }

    /// Whether `method` fills the slot of `target`, directly or through a
    /// chain of overrides.
    pub fn overrides(&self, method: MethodId, target: MethodId) -> bool {
        let mut pending = vec![method];
        let mut seen = FxHashSet::default();
        while let Some(m) = pending.pop() {
            if m == target {
                return true;
            }
            if seen.insert(m) {
                pending.extend(self.method(m).overrides.iter().copied());
            }
        }
        false
    }

    /// The concrete method that runs when `method` is invoked virtually on a
    /// value whose runtime type is `runtime`.
    pub fn resolve_virtual(&self, runtime: TypeId, method: MethodId) -> Option<MethodId> {
        let declared = self.method(method);
        let via_interface = declared.owner.is_some_and(|o| self.ty(o).is_interface());

        for t in self.base_chain(runtime) {
            for &candidate in &self.ty(t).methods {
                let entry = self.method(candidate);
                if entry.is_abstract() || entry.is_static() {
                    continue;
                }
                if self.overrides(candidate, method) {
                    return Some(candidate);
                }
                if via_interface
                    && entry.is_public()
                    && entry.name == declared.name
                    && entry.param_types() == declared.param_types()
                {
                    return Some(candidate);
                }
            }
        }
        None
    }

    // ========================================================================
    // Constructed Types
    // ========================================================================

    /// The array type with the given element type, created on first use.
    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        if let Some(&id) = self.arrays.get(&element) {
            return id;
        }
        let name = format!("{}[]", self.type_name(element));
        let id = self.push_type(TypeDef {
            name,
            namespace: String::new(),
            kind: TypeKind::Array { element },
            flags: TypeFlags::PUBLIC | TypeFlags::HOST | TypeFlags::SEALED,
            base: Some(host::OBJECT),
            interfaces: Vec::new(),
            span: Span::default(),
        });
        host::seed_array_members(self, id);
        self.arrays.insert(element, id);
        id
    }

    /// Close a generic definition over `args`, created on first use.
    pub fn instantiate(&mut self, definition: TypeId, args: &[TypeId], span: Span) -> Result<TypeId, CompilationError> {
        let TypeKind::GenericDefinition { arity } = self.ty(definition).kind else {
            return Err(CompilationError::UnresolvedType {
                name: format!("{}<...>", self.type_name(definition)),
                span,
            });
        };
        if arity as usize != args.len() {
            return Err(CompilationError::UnresolvedType {
                name: format!("{}`{}", self.generic_base_name(definition), args.len()),
                span,
            });
        }

        let key = (definition, args.to_vec());
        if let Some(&id) = self.instances.get(&key) {
            return Ok(id);
        }

        let arg_names: Vec<String> = args.iter().map(|&a| self.type_name(a)).collect();
        let name = format!("{}<{}>", self.generic_base_name(definition), arg_names.join(", "));
        let id = self.push_type(TypeDef {
            name,
            namespace: String::new(),
            kind: TypeKind::GenericInstance {
                definition,
                args: args.to_vec(),
            },
            flags: TypeFlags::PUBLIC | TypeFlags::HOST,
            base: Some(host::OBJECT),
            interfaces: Vec::new(),
            span: Span::default(),
        });
        host::seed_instance_members(self, id, definition, args);
        self.instances.insert(key, id);
        Ok(id)
    }

    fn generic_base_name(&self, definition: TypeId) -> String {
        let name = &self.ty(definition).name;
        name.split('`').next().unwrap_or(name).to_string()
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Human-readable type name: source aliases for primitives, full names
    /// otherwise.
    pub fn type_name(&self, id: TypeId) -> String {
        let Some(entry) = self.get_type(id) else {
            return id.to_string();
        };
        if let Some(kind) = entry.primitive() {
            return kind.alias().to_string();
        }
        match id {
            host::VOID => "void".into(),
            host::OBJECT => "object".into(),
            host::STRING => "string".into(),
            host::DECIMAL => "decimal".into(),
            _ => entry.full_name(),
        }
    }

    /// Display for an optional type, where `None` is the null type.
    pub fn type_name_opt(&self, id: Option<TypeId>) -> String {
        id.map(|t| self.type_name(t)).unwrap_or_else(|| "nil".into())
    }

    /// `Owner.Name` for a method.
    pub fn method_display(&self, id: MethodId) -> String {
        let method = self.method(id);
        match method.owner {
            Some(owner) => format!("{}.{}", self.type_name(owner), method.name),
            None => method.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(image: &mut ProgramImage, name: &str, base: Option<TypeId>, interfaces: Vec<TypeId>) -> TypeId {
        image
            .declare_type(TypeDef {
                name: name.into(),
                namespace: "Zoo".into(),
                kind: TypeKind::Class,
                flags: TypeFlags::PUBLIC,
                base: base.or(Some(host::OBJECT)),
                interfaces,
                span: Span::default(),
            })
            .unwrap()
    }

    fn interface(image: &mut ProgramImage, name: &str) -> TypeId {
        image
            .declare_type(TypeDef {
                name: name.into(),
                namespace: "Zoo".into(),
                kind: TypeKind::Interface,
                flags: TypeFlags::PUBLIC | TypeFlags::ABSTRACT,
                base: None,
                interfaces: Vec::new(),
                span: Span::default(),
            })
            .unwrap()
    }

    fn method(image: &mut ProgramImage, owner: TypeId, name: &str, attributes: MethodAttributes) -> MethodId {
        image
            .declare_method(MethodDef {
                name: name.into(),
                owner: Some(owner),
                kind: MethodKind::Normal,
                attributes,
                params: Vec::new(),
                return_type: host::INT32,
                span: Span::default(),
            })
            .unwrap()
    }

    #[test]
    fn host_types_are_seeded() {
        let image = ProgramImage::new();
        assert_eq!(image.find_type("System.Int32"), Some(host::INT32));
        assert_eq!(image.find_type("System.String"), Some(host::STRING));
        assert_eq!(image.type_name(host::DOUBLE), "double");
        assert!(image.find_method(Some(host::MATH), "Sqrt", &[host::DOUBLE]).is_some());
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut image = ProgramImage::new();
        class(&mut image, "Cat", None, Vec::new());
        let err = image
            .declare_type(TypeDef {
                name: "Cat".into(),
                namespace: "Zoo".into(),
                kind: TypeKind::Class,
                flags: TypeFlags::empty(),
                base: None,
                interfaces: Vec::new(),
                span: Span::default(),
            })
            .unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateDefinition { name, .. } if name == "Zoo.Cat"));
    }

    #[test]
    fn duplicate_signature_is_rejected() {
        let mut image = ProgramImage::new();
        let cat = class(&mut image, "Cat", None, Vec::new());
        method(&mut image, cat, "Speak", MethodAttributes::PUBLIC);
        let err = image
            .declare_method(MethodDef {
                name: "Speak".into(),
                owner: Some(cat),
                kind: MethodKind::Normal,
                attributes: MethodAttributes::empty(),
                params: Vec::new(),
                return_type: host::STRING,
                span: Span::default(),
            })
            .unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateDefinition { .. }));
    }

    #[test]
    fn subtyping_through_bases_and_interfaces() {
        let mut image = ProgramImage::new();
        let dog = interface(&mut image, "Dog");
        let animal = class(&mut image, "Animal", None, Vec::new());
        let cat = class(&mut image, "Cat", Some(animal), vec![dog]);
        let kitten = class(&mut image, "Kitten", Some(cat), Vec::new());

        assert!(image.is_subtype(kitten, animal));
        assert!(image.is_subtype(kitten, dog));
        assert!(image.is_subtype(cat, host::OBJECT));
        assert!(!image.is_subtype(animal, cat));
        assert_eq!(image.all_interfaces(kitten), vec![dog]);
    }

    #[test]
    fn fields_are_inherited() {
        let mut image = ProgramImage::new();
        let animal = class(&mut image, "Animal", None, Vec::new());
        let cat = class(&mut image, "Cat", Some(animal), Vec::new());
        let lives = image
            .declare_field(animal, "lives", host::INT32, FieldFlags::PUBLIC, None, Span::default())
            .unwrap();
        assert_eq!(image.find_field(cat, "lives"), Some(lives));
        assert!(
            image
                .declare_field(animal, "lives", host::INT32, FieldFlags::PUBLIC, None, Span::default())
                .is_err()
        );
    }

    #[test]
    fn virtual_resolution_follows_overrides() {
        let mut image = ProgramImage::new();
        let animal = class(&mut image, "Animal", None, Vec::new());
        let cat = class(&mut image, "Cat", Some(animal), Vec::new());
        let base = method(&mut image, animal, "Speak", MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL);
        let derived = method(&mut image, cat, "Speak", MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL);
        image.set_overrides(derived, vec![base]);

        assert_eq!(image.resolve_virtual(cat, base), Some(derived));
        assert_eq!(image.resolve_virtual(animal, base), Some(base));
    }

    #[test]
    fn interface_methods_match_by_signature() {
        let mut image = ProgramImage::new();
        let dog = interface(&mut image, "Dog");
        let abstract_attrs = MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL | MethodAttributes::ABSTRACT;
        let wanted = method(&mut image, dog, "DoThing", abstract_attrs);
        let cat = class(&mut image, "Cat", None, vec![dog]);
        assert!(image.finalize_type(cat).is_err());

        let cat2 = class(&mut image, "Cat2", None, vec![dog]);
        let imp = method(&mut image, cat2, "DoThing", MethodAttributes::PUBLIC);
        assert_eq!(image.resolve_virtual(cat2, wanted), Some(imp));
        assert!(image.finalize_type(cat2).is_ok());
        assert!(image.ty(cat2).flags.contains(TypeFlags::FINALIZED));
    }

    #[test]
    fn unimplemented_interface_method_is_named() {
        let mut image = ProgramImage::new();
        let dog = interface(&mut image, "Dog");
        method(&mut image, dog, "DoThing", MethodAttributes::PUBLIC | MethodAttributes::ABSTRACT);
        let cat = class(&mut image, "Cat", None, vec![dog]);
        let err = image.finalize_type(cat).unwrap_err();
        assert_eq!(err.to_string(), "at 0:0: 'Zoo.Cat' does not implement 'Zoo.Dog.DoThing'");
    }

    #[test]
    fn second_entry_point_is_rejected() {
        let mut image = ProgramImage::new();
        let cat = class(&mut image, "Cat", None, Vec::new());
        let main = method(&mut image, cat, "Main", MethodAttributes::STATIC);
        let other = method(&mut image, cat, "Other", MethodAttributes::STATIC);
        image.set_entry_point(main).unwrap();
        let err = image.set_entry_point(other).unwrap_err();
        assert!(matches!(
            err,
            CompilationError::DuplicateEntryPoint { first, second, .. }
                if first == "Zoo.Cat.Main" && second == "Zoo.Cat.Other"
        ));
    }

    #[test]
    fn arrays_and_generic_instances_are_cached() {
        let mut image = ProgramImage::new();
        let a = image.array_of(host::STRING);
        assert_eq!(image.array_of(host::STRING), a);
        assert_eq!(image.type_name(a), "string[]");
        assert!(image.find_method(Some(a), "get_Length", &[]).is_some());

        let list = image.instantiate(host::LIST, &[host::INT32], Span::default()).unwrap();
        assert_eq!(image.instantiate(host::LIST, &[host::INT32], Span::default()).unwrap(), list);
        assert_eq!(image.type_name(list), "List<int>");
        assert!(image.find_method(Some(list), "Add", &[host::INT32]).is_some());
        assert!(image.instantiate(host::LIST, &[], Span::default()).is_err());
    }
}
