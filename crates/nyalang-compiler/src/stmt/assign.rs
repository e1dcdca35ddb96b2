//! Assignment statements.
//!
//! `name = value` rebinds a visible variable, or declares a new local when
//! the name is unbound (or annotated over a field). The local's type is the
//! annotation, else the value's type, else `object` for `nil`.
//!
//! Compound assignment loads the current value, applies the operator and
//! stores the result converted back to the target type.
//!
//! Coalescing assignment stores only when the current value is nil:
//!
//! ```text
//!     <current>
//!     dup
//!     brtrue KEEP
//!     pop
//!     <value>           converted to the target type
//!     <store>
//!     br END
//! KEEP:
//!     pop               the duplicate and any receiver
//! END:
//! ```

use nyalang_core::{CompilationError, FieldId, Span, TypeId};
use nyalang_parser::ast::{AssignOp, AssignStmt, AssignTarget, Expr, Ident};

use super::{Result, StmtCompiler};
use crate::bytecode::OpCode;
use crate::conversion;
use crate::emit::MethodEmitter;
use crate::expr::member;
use crate::image::host;
use crate::scope::Variable;

/// Where an assignment stores its value.
#[derive(Debug, Clone, Copy)]
enum Place {
    /// A named variable; its receiver is pushed on demand.
    Variable(Variable),
    /// An instance field whose object is already on the stack.
    Member { field: FieldId, ty: TypeId },
}

impl Place {
    fn ty(&self) -> TypeId {
        match self {
            Place::Variable(variable) => variable.ty(),
            Place::Member { ty, .. } => *ty,
        }
    }

    /// Values below the stored value that `store` consumes.
    fn receivers(&self) -> i32 {
        match self {
            Place::Variable(variable) => i32::from(variable.needs_receiver()),
            Place::Member { .. } => 1,
        }
    }

    fn prepare(&self, em: &mut MethodEmitter) {
        if let Place::Variable(variable) = self {
            variable.prepare_store(em);
        }
    }

    /// Prepare the store and push the current value above the receiver.
    fn load_current(&self, em: &mut MethodEmitter) {
        match self {
            Place::Variable(variable) => {
                variable.prepare_store(em);
                variable.load(em);
            }
            Place::Member { field, .. } => {
                em.emit(OpCode::Dup);
                em.emit_field(OpCode::GetField, *field);
            }
        }
    }

    fn store(&self, em: &mut MethodEmitter) {
        match self {
            Place::Variable(variable) => variable.store(em),
            Place::Member { field, .. } => em.emit_field(OpCode::SetField, *field),
        }
    }
}

impl<'a, 'r> StmtCompiler<'a, 'r> {
    pub fn compile_assign(&mut self, assign: &AssignStmt<'_>) -> Result<()> {
        if assign.ty.is_some() && assign.op != AssignOp::Assign {
            return Err(CompilationError::InvalidDeclaration {
                name: target_name(&assign.target),
                reason: "a type annotation needs '='".to_string(),
                span: assign.span,
            });
        }

        let place = match assign.target {
            AssignTarget::Name(ident) => match self.named_place(ident, assign)? {
                Some(place) => place,
                None if assign.op == AssignOp::Assign => return self.declare_local(ident, assign),
                None => {
                    return Err(CompilationError::UndefinedVariable {
                        name: ident.name.to_string(),
                        span: ident.span,
                    });
                }
            },
            AssignTarget::Member { object, member } => self.member_place(object, member)?,
        };

        match assign.op {
            AssignOp::Assign => {
                place.prepare(self.emitter);
                self.convert_value(assign.value, place.ty())?;
                place.store(self.emitter);
            }
            AssignOp::Compound(op) => {
                place.load_current(self.emitter);
                let right = self.expr().compile_value(assign.value)?;
                let result =
                    conversion::do_math(self.emitter, self.image, Some(place.ty()), right, op, assign.span)?;
                conversion::try_convert(self.emitter, self.image, result, Some(place.ty()), assign.span)?;
                place.store(self.emitter);
            }
            AssignOp::Coalesce => self.compile_coalesce_assign(place, assign)?,
        }
        Ok(())
    }

    fn compile_coalesce_assign(&mut self, place: Place, assign: &AssignStmt<'_>) -> Result<()> {
        if !self.image.ty(place.ty()).is_reference() {
            return Err(CompilationError::Conversion {
                from: self.image.type_name(place.ty()),
                to: "nil".to_string(),
                span: assign.span,
            });
        }

        let keep = self.emitter.define_label();
        let end = self.emitter.define_label();

        place.load_current(self.emitter);
        self.emitter.emit(OpCode::Dup);
        self.emitter.emit_branch(OpCode::BrTrue, keep)?;
        self.emitter.emit(OpCode::Pop);
        self.convert_value(assign.value, place.ty())?;
        place.store(self.emitter);
        self.emitter.emit_branch(OpCode::Br, end)?;

        self.emitter.mark_label(keep)?;
        let held = 1 + place.receivers();
        self.emitter.adjust_depth(held);
        for _ in 0..held {
            self.emitter.emit(OpCode::Pop);
        }
        self.emitter.mark_label(end)?;
        Ok(())
    }

    /// The visible variable `ident` names, or `None` when the assignment
    /// declares a new local.
    fn named_place(&mut self, ident: Ident<'_>, assign: &AssignStmt<'_>) -> Result<Option<Place>> {
        let variable = match self.scopes.find(ident.name) {
            Some(variable) if variable.needs_receiver() && self.ctx.is_static => None,
            found => found,
        };
        match (variable, assign.ty.is_some()) {
            (Some(Variable::Field { .. }), true) | (None, _) => Ok(None),
            (Some(_), true) => Err(CompilationError::DuplicateDefinition {
                name: ident.name.to_string(),
                span: ident.span,
            }),
            (Some(variable), false) => Ok(Some(Place::Variable(variable))),
        }
    }

    /// Resolve `object.member`. An object that is a value is pushed.
    fn member_place(&mut self, object: &Expr<'_>, member: Ident<'_>) -> Result<Place> {
        let named = member::named_type(&self.expr(), object);
        let ty = match named {
            Some(ty) => ty,
            None => match self.expr().compile_value(object)? {
                Some(ty) => ty,
                None => return Err(undefined(format!("nil.{}", member.name), member.span)),
            },
        };

        let display = || format!("{}.{}", self.image.type_name(ty), member.name);
        let Some(field) = self.image.find_field(ty, member.name) else {
            return Err(undefined(display(), member.span));
        };
        let entry = self.image.field(field);
        if entry.literal.is_some() {
            return Err(CompilationError::Visibility {
                name: display(),
                reason: "is a constant and cannot be assigned".to_string(),
                span: member.span,
            });
        }

        let (field_ty, is_static) = (entry.ty, entry.is_static());
        match (named.is_some(), is_static) {
            (true, false) => Err(undefined(display(), member.span)),
            (_, true) => {
                if named.is_none() {
                    self.emitter.emit(OpCode::Pop);
                }
                Ok(Place::Variable(Variable::Field {
                    field,
                    ty: field_ty,
                    is_static: true,
                }))
            }
            (false, false) => Ok(Place::Member { field, ty: field_ty }),
        }
    }

    /// `name (: type)? = value` for a name with no visible binding.
    fn declare_local(&mut self, ident: Ident<'_>, assign: &AssignStmt<'_>) -> Result<()> {
        let value_ty = self.expr().compile_value(assign.value)?;
        let ty = match &assign.ty {
            Some(annotation) => {
                let ty = self.ctx.resolver.resolve(self.image, annotation)?;
                conversion::try_convert(self.emitter, self.image, value_ty, Some(ty), assign.value.span())?;
                ty
            }
            None => value_ty.unwrap_or(host::OBJECT),
        };

        let slot = self.emitter.declare_local(ty);
        self.emitter.emit_set_local(slot);
        self.scopes.add(ident.name, Variable::Local { slot, ty });
        Ok(())
    }

    fn convert_value(&mut self, value: &Expr<'_>, target: TypeId) -> Result<()> {
        self.expr().compile_as_type(value, target)
    }
}

fn target_name(target: &AssignTarget<'_>) -> String {
    match target {
        AssignTarget::Name(ident) => ident.name.to_string(),
        AssignTarget::Member { member, .. } => member.name.to_string(),
    }
}

fn undefined(name: String, span: Span) -> CompilationError {
    CompilationError::UndefinedVariable { name, span }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::expr::test_support::{compile, opcodes};
    use nyalang_core::CompilationError;

    #[test]
    fn first_assignment_declares_a_local() {
        let image = compile("F(): int { a = 12; return a; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![OpCode::Constant, OpCode::SetLocal, OpCode::GetLocal, OpCode::Br, OpCode::Ret]
        );
    }

    #[test]
    fn annotation_converts_the_value() {
        let image = compile("F(): long { a: long = 1; return a; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![OpCode::PushOne, OpCode::ConvI8, OpCode::SetLocal, OpCode::GetLocal, OpCode::Br, OpCode::Ret]
        );
    }

    #[test]
    fn nil_local_is_an_object() {
        let image = compile("F(): object { a = nil; return a; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![OpCode::PushNull, OpCode::SetLocal, OpCode::GetLocal, OpCode::Br, OpCode::Ret]
        );
    }

    #[test]
    fn rebinding_converts_to_the_existing_type() {
        let image = compile("F(x: double) { x = 1; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![OpCode::PushOne, OpCode::ConvR8, OpCode::StoreArg, OpCode::Ret]
        );
    }

    #[test]
    fn compound_assignment_on_a_field() {
        let image = compile("class Cat { lives: int; @public Die() { lives -= 1; } }").unwrap();
        assert_eq!(
            opcodes(&image, "Cat", "Die"),
            vec![
                OpCode::LoadThis,
                OpCode::LoadThis,
                OpCode::GetField,
                OpCode::PushOne,
                OpCode::Sub,
                OpCode::SetField,
                OpCode::Ret
            ]
        );
    }

    #[test]
    fn compound_string_concatenation() {
        let image = compile("F(s: string): string { s += \"!\"; return s; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![
                OpCode::LoadArg,
                OpCode::Constant,
                OpCode::Call,
                OpCode::StoreArg,
                OpCode::LoadArg,
                OpCode::Br,
                OpCode::Ret
            ]
        );
    }

    #[test]
    fn coalescing_assignment_skips_the_store() {
        let image = compile("F(b: string, c: string): string { b ?= c; return b; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![
                OpCode::LoadArg,
                OpCode::Dup,
                OpCode::BrTrue,
                OpCode::Pop,
                OpCode::LoadArg,
                OpCode::StoreArg,
                OpCode::Br,
                OpCode::Pop,
                OpCode::LoadArg,
                OpCode::Br,
                OpCode::Ret
            ]
        );

        let err = compile("F(x: int) { x ?= 2; }").unwrap_err();
        assert!(matches!(err, CompilationError::Conversion { ref to, .. } if to == "nil"));
    }

    #[test]
    fn coalescing_assignment_on_a_member() {
        let image = compile("class Cat { @public name: string; } F(c: Cat) { c.name ?= \"Tom\"; }").unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![
                OpCode::LoadArg,
                OpCode::Dup,
                OpCode::GetField,
                OpCode::Dup,
                OpCode::BrTrue,
                OpCode::Pop,
                OpCode::Constant,
                OpCode::SetField,
                OpCode::Br,
                OpCode::Pop,
                OpCode::Pop,
                OpCode::Ret
            ]
        );
    }

    #[test]
    fn member_targets() {
        let image = compile(
            "class Cat { @public lives: int; @public !count: int; }
             F(c: Cat) { c.lives = 9; }
             G() { Cat.count += 1; }",
        )
        .unwrap();
        assert_eq!(
            opcodes(&image, "", "F"),
            vec![OpCode::LoadArg, OpCode::Constant, OpCode::SetField, OpCode::Ret]
        );
        assert_eq!(
            opcodes(&image, "", "G"),
            vec![OpCode::GetStatic, OpCode::PushOne, OpCode::Add, OpCode::SetStatic, OpCode::Ret]
        );
    }

    #[test]
    fn enum_members_are_read_only() {
        let err = compile("enum Mood { Happy } F() { Mood.Happy = 1; }").unwrap_err();
        assert!(matches!(err, CompilationError::Visibility { ref name, .. } if name == "Mood.Happy"));
    }

    #[test]
    fn assignment_errors() {
        let err = compile("F() { a: int = 1; a: int = 2; }").unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateDefinition { ref name, .. } if name == "a"));

        let err = compile("F() { a += 1; }").unwrap_err();
        assert!(matches!(err, CompilationError::UndefinedVariable { ref name, .. } if name == "a"));

        let err = compile("F() { a = print(\"x\"); }").unwrap_err();
        assert!(matches!(err, CompilationError::Conversion { ref from, .. } if from == "void"));

        let err = compile("F() { a = b; }").unwrap_err();
        assert!(matches!(err, CompilationError::UndefinedVariable { ref name, .. } if name == "b"));
    }

    #[test]
    fn annotated_name_shadows_a_field() {
        let image = compile("class Cat { lives: int; @public F(): int { lives: int = 3; return lives; } }").unwrap();
        assert_eq!(
            opcodes(&image, "Cat", "F"),
            vec![OpCode::Constant, OpCode::SetLocal, OpCode::GetLocal, OpCode::Br, OpCode::Ret]
        );
    }
}
