//! Lexical scope management for codegen.
//!
//! Codegen keeps one [`ScopeManager`] for the whole compilation. A Global
//! scope sits at the bottom; each class pushes a Class scope holding its
//! fields, and each method pushes a Method scope holding its parameters and
//! locals. Lookup walks from the innermost scope outwards, so a local or
//! parameter shadows a field of the same name.

use nyalang_core::{FieldId, TypeId};
use rustc_hash::FxHashMap;

use crate::bytecode::OpCode;
use crate::emit::MethodEmitter;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeLevel {
    Global,
    Class,
    Method,
}

/// A named storage location visible in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// A local slot of the current method.
    Local { slot: u16, ty: TypeId },
    /// A declared parameter, indexed without the receiver.
    Param { index: u16, ty: TypeId },
    Field { field: FieldId, ty: TypeId, is_static: bool },
}

impl Variable {
    pub fn ty(&self) -> TypeId {
        match *self {
            Variable::Local { ty, .. } | Variable::Param { ty, .. } | Variable::Field { ty, .. } => ty,
        }
    }

    /// Whether reading or writing needs `this`.
    pub fn needs_receiver(&self) -> bool {
        matches!(self, Variable::Field { is_static: false, .. })
    }

    /// Push the current value.
    pub fn load(&self, em: &mut MethodEmitter) {
        match *self {
            Variable::Local { slot, .. } => em.emit_get_local(slot),
            Variable::Param { index, .. } => em.emit_load_arg(index),
            Variable::Field { field, is_static: true, .. } => em.emit_field(OpCode::GetStatic, field),
            Variable::Field { field, is_static: false, .. } => {
                em.emit(OpCode::LoadThis);
                em.emit_field(OpCode::GetField, field);
            }
        }
    }

    /// Emit whatever must sit below the value being stored.
    pub fn prepare_store(&self, em: &mut MethodEmitter) {
        if self.needs_receiver() {
            em.emit(OpCode::LoadThis);
        }
    }

    /// Pop the value on top of the stack into the variable. Must follow
    /// [`prepare_store`](Self::prepare_store) and the value.
    pub fn store(&self, em: &mut MethodEmitter) {
        match *self {
            Variable::Local { slot, .. } => em.emit_set_local(slot),
            Variable::Param { index, .. } => em.emit_store_arg(index),
            Variable::Field { field, is_static: true, .. } => em.emit_field(OpCode::SetStatic, field),
            Variable::Field { field, is_static: false, .. } => em.emit_field(OpCode::SetField, field),
        }
    }
}

#[derive(Debug)]
struct Scope {
    level: ScopeLevel,
    variables: FxHashMap<String, Variable>,
}

// ============================================================================
// ScopeManager
// ============================================================================

/// The stack of open scopes.
#[derive(Debug)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
    pushes: usize,
    pops: usize,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    /// A manager holding only the Global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                level: ScopeLevel::Global,
                variables: FxHashMap::default(),
            }],
            pushes: 0,
            pops: 0,
        }
    }

    pub fn push(&mut self, level: ScopeLevel) {
        self.pushes += 1;
        self.scopes.push(Scope {
            level,
            variables: FxHashMap::default(),
        });
    }

    /// Close the innermost scope. The Global scope is never popped.
    pub fn pop(&mut self) -> Option<ScopeLevel> {
        if self.scopes.len() <= 1 {
            return None;
        }
        self.pops += 1;
        self.scopes.pop().map(|scope| scope.level)
    }

    /// Bind a name in the innermost scope, replacing any binding there.
    pub fn add(&mut self, name: impl Into<String>, variable: Variable) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(name.into(), variable);
        }
    }

    /// Find the innermost binding of a name.
    pub fn find(&self, name: &str) -> Option<Variable> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.get(name).copied())
    }

    /// Level of the innermost scope.
    pub fn level(&self) -> ScopeLevel {
        self.scopes.last().map_or(ScopeLevel::Global, |s| s.level)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn pushes(&self) -> usize {
        self.pushes
    }

    pub fn pops(&self) -> usize {
        self.pops
    }

    /// Every push has been matched by a pop.
    pub fn is_balanced(&self) -> bool {
        self.pushes == self.pops && self.scopes.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INT: TypeId = TypeId::new(7);
    const STR: TypeId = TypeId::new(13);

    #[test]
    fn inner_scope_shadows_outer() {
        let mut scopes = ScopeManager::new();
        scopes.push(ScopeLevel::Class);
        scopes.add(
            "lives",
            Variable::Field {
                field: FieldId::new(0),
                ty: INT,
                is_static: false,
            },
        );
        scopes.push(ScopeLevel::Method);
        scopes.add("lives", Variable::Local { slot: 0, ty: STR });

        assert_eq!(scopes.find("lives"), Some(Variable::Local { slot: 0, ty: STR }));
        assert_eq!(scopes.level(), ScopeLevel::Method);

        scopes.pop();
        assert_eq!(scopes.find("lives").map(|v| v.ty()), Some(INT));
        scopes.pop();
        assert_eq!(scopes.find("lives"), None);
        assert!(scopes.is_balanced());
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut scopes = ScopeManager::new();
        assert_eq!(scopes.pop(), None);
        assert_eq!(scopes.level(), ScopeLevel::Global);
        assert_eq!(scopes.depth(), 1);
        assert_eq!(scopes.pops(), 0);
    }

    #[test]
    fn unbalanced_pushes_are_detected() {
        let mut scopes = ScopeManager::new();
        scopes.push(ScopeLevel::Method);
        assert!(!scopes.is_balanced());
        assert_eq!(scopes.pop(), Some(ScopeLevel::Method));
        assert!(scopes.is_balanced());
    }

    #[test]
    fn instance_field_access_uses_receiver() {
        let field = Variable::Field {
            field: FieldId::new(2),
            ty: INT,
            is_static: false,
        };
        let mut em = MethodEmitter::new();
        field.prepare_store(&mut em);
        em.emit(OpCode::PushOne);
        field.store(&mut em);
        field.load(&mut em);
        em.chunk().assert_opcodes(&[
            OpCode::LoadThis,
            OpCode::PushOne,
            OpCode::SetField,
            OpCode::LoadThis,
            OpCode::GetField,
        ]);
        assert_eq!(em.stack_depth(), 1);
    }

    #[test]
    fn static_field_and_locals_need_no_receiver() {
        let mut em = MethodEmitter::new();
        let stat = Variable::Field {
            field: FieldId::new(1),
            ty: INT,
            is_static: true,
        };
        let local = Variable::Local { slot: 3, ty: INT };
        let param = Variable::Param { index: 0, ty: INT };
        for var in [stat, local, param] {
            var.prepare_store(&mut em);
            var.load(&mut em);
            var.store(&mut em);
        }
        em.chunk().assert_opcodes(&[
            OpCode::GetStatic,
            OpCode::SetStatic,
            OpCode::GetLocal,
            OpCode::SetLocal,
            OpCode::LoadArg,
            OpCode::StoreArg,
        ]);
        assert_eq!(em.stack_depth(), 0);
    }
}
