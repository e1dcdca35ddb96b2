//! Type resolution from written type expressions to image types.
//!
//! A name is resolved in this order:
//!
//! 1. Source aliases (`int`, `string`, `decimal`, ...), for non-generic names
//! 2. The enclosing namespace (`Zoo.Cat` when compiling inside `Zoo`)
//! 3. The name as written (global or fully qualified)
//! 4. Each default `using` namespace (`System.Object`)
//!
//! Generic arguments select the definition by arity (``List`1``) and close it
//! over the resolved arguments; each `[]` suffix wraps the result in an array.

use nyalang_core::{CompilationError, Span, TypeId};
use nyalang_parser::ast::TypeExpr;

use crate::image::{ProgramImage, host};

/// Resolves type names relative to a namespace and a set of usings.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    namespace: &'a str,
    usings: &'a [String],
}

impl<'a> TypeResolver<'a> {
    pub fn new(namespace: &'a str, usings: &'a [String]) -> Self {
        Self { namespace, usings }
    }

    /// The same usings, resolving relative to another namespace.
    pub fn in_namespace(self, namespace: &'a str) -> Self {
        Self { namespace, ..self }
    }

    pub fn namespace(&self) -> &'a str {
        self.namespace
    }

    /// Resolve a written type, creating array and generic instance types on
    /// demand.
    pub fn resolve(&self, image: &mut ProgramImage, ty: &TypeExpr<'_>) -> Result<TypeId, CompilationError> {
        let mut resolved = if ty.is_generic() {
            let definition = self
                .lookup(image, ty.name, ty.type_args.len())
                .ok_or_else(|| unresolved(ty.name, ty.span))?;
            let args = ty
                .type_args
                .iter()
                .map(|arg| self.resolve(image, arg))
                .collect::<Result<Vec<_>, _>>()?;
            image.instantiate(definition, &args, ty.span)?
        } else {
            self.lookup(image, ty.name, 0)
                .ok_or_else(|| unresolved(ty.name, ty.span))?
        };

        for _ in 0..ty.array_rank {
            resolved = image.array_of(resolved);
        }
        Ok(resolved)
    }

    /// Resolve an optional return type; a missing one is `void`.
    pub fn resolve_return(&self, image: &mut ProgramImage, ty: Option<&TypeExpr<'_>>) -> Result<TypeId, CompilationError> {
        ty.map_or(Ok(host::VOID), |ty| self.resolve(image, ty))
    }

    /// Find a named type without creating anything. `arity` is the number of
    /// generic arguments, 0 for ordinary types.
    pub fn lookup(&self, image: &ProgramImage, name: &str, arity: usize) -> Option<TypeId> {
        if arity == 0
            && let Some(id) = host::alias(name)
        {
            return Some(id);
        }

        let name = if arity == 0 {
            name.to_string()
        } else {
            format!("{name}`{arity}")
        };

        let scoped = (!self.namespace.is_empty()).then(|| format!("{}.{name}", self.namespace));
        scoped
            .and_then(|full| image.find_type(&full))
            .or_else(|| image.find_type(&name))
            .or_else(|| {
                self.usings
                    .iter()
                    .find_map(|using| image.find_type(&format!("{using}.{name}")))
            })
    }
}

fn unresolved(name: &str, span: Span) -> CompilationError {
    CompilationError::UnresolvedType {
        name: name.to_string(),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{TypeDef, TypeFlags, TypeKind};

    fn usings() -> Vec<String> {
        vec![
            "System".to_string(),
            "System.Collections.Generic".to_string(),
            "System.Text.RegularExpressions".to_string(),
        ]
    }

    fn ty<'a>(name: &'a str, type_args: &'a [TypeExpr<'a>], array_rank: u32) -> TypeExpr<'a> {
        TypeExpr {
            name,
            type_args,
            array_rank,
            span: Span::new(1, 1, name.len() as u32),
        }
    }

    fn declare(image: &mut ProgramImage, namespace: &str, name: &str) -> TypeId {
        image
            .declare_type(TypeDef {
                name: name.into(),
                namespace: namespace.into(),
                kind: TypeKind::Class,
                flags: TypeFlags::PUBLIC,
                base: Some(host::OBJECT),
                interfaces: Vec::new(),
                span: Span::default(),
            })
            .unwrap()
    }

    #[test]
    fn aliases_come_first() {
        let mut image = ProgramImage::new();
        let usings = usings();
        let resolver = TypeResolver::new("", &usings);
        assert_eq!(resolver.resolve(&mut image, &ty("int", &[], 0)).unwrap(), host::INT32);
        assert_eq!(resolver.resolve(&mut image, &ty("decimal", &[], 0)).unwrap(), host::DECIMAL);
    }

    #[test]
    fn usings_reach_host_types() {
        let mut image = ProgramImage::new();
        let usings = usings();
        let resolver = TypeResolver::new("", &usings);
        assert_eq!(resolver.resolve(&mut image, &ty("Object", &[], 0)).unwrap(), host::OBJECT);
        assert_eq!(resolver.resolve(&mut image, &ty("Regex", &[], 0)).unwrap(), host::REGEX);
        assert_eq!(resolver.resolve(&mut image, &ty("System.Math", &[], 0)).unwrap(), host::MATH);
    }

    #[test]
    fn enclosing_namespace_is_searched() {
        let mut image = ProgramImage::new();
        let cat = declare(&mut image, "Zoo", "Cat");
        let usings = usings();
        let inside = TypeResolver::new("Zoo", &usings);
        let outside = TypeResolver::new("", &usings);
        assert_eq!(inside.resolve(&mut image, &ty("Cat", &[], 0)).unwrap(), cat);
        assert_eq!(outside.resolve(&mut image, &ty("Zoo.Cat", &[], 0)).unwrap(), cat);
        assert!(outside.resolve(&mut image, &ty("Cat", &[], 0)).is_err());
    }

    #[test]
    fn arrays_and_generics() {
        let mut image = ProgramImage::new();
        let usings = usings();
        let resolver = TypeResolver::new("", &usings);

        let strings = resolver.resolve(&mut image, &ty("string", &[], 1)).unwrap();
        assert_eq!(image.type_name(strings), "string[]");

        let args = [ty("string", &[], 0), ty("int", &[], 0)];
        let dict = resolver.resolve(&mut image, &ty("Dictionary", &args, 0)).unwrap();
        assert_eq!(image.type_name(dict), "Dictionary<string, int>");

        let list_args = [ty("int", &[], 0)];
        let jagged = resolver.resolve(&mut image, &ty("List", &list_args, 2)).unwrap();
        assert_eq!(image.type_name(jagged), "List<int>[][]");
    }

    #[test]
    fn unknown_type_is_reported() {
        let mut image = ProgramImage::new();
        let usings = usings();
        let resolver = TypeResolver::new("", &usings);
        let err = resolver.resolve(&mut image, &ty("Narwhal", &[], 0)).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: unresolved type 'Narwhal'");

        let args = [ty("int", &[], 0), ty("int", &[], 0)];
        assert!(resolver.resolve(&mut image, &ty("List", &args, 0)).is_err());
    }
}
