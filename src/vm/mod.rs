//! A stack machine that executes a [`ProgramImage`].
//!
//! Every method runs in its own [`Frame`]; calls recurse through
//! [`Vm::invoke`]. Host methods dispatch to native code in [`host`].
//!
//! # Example
//!
//! ```ignore
//! let mut vm = Vm::new(&image).capturing();
//! let result = vm.run_entry(&[])?;
//! println!("{:?} {:?}", result, vm.output());
//! ```

mod frame;
mod host;
mod ops;
pub mod value;

use nyalang_compiler::ProgramImage;
use nyalang_compiler::bytecode::{Constant, OpCode};
use nyalang_compiler::image::{MethodKind, TypeKind, host as host_types};
use nyalang_core::{FieldId, MethodId, RuntimeError, TypeId};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

pub use frame::Frame;
pub use value::{Object, ObjectData, ObjectRef, Value};

type Result<T> = std::result::Result<T, RuntimeError>;

/// Nested calls allowed before execution stops.
pub const MAX_CALL_DEPTH: usize = 256;

/// Where `Console.WriteLine` goes.
#[derive(Debug, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Capture(Vec<String>),
}

impl OutputSink {
    pub fn write_line(&mut self, line: &str) {
        match self {
            OutputSink::Stdout => println!("{line}"),
            OutputSink::Capture(lines) => lines.push(line.to_string()),
        }
    }
}

pub struct Vm<'img> {
    image: &'img ProgramImage,
    statics: FxHashMap<FieldId, Value>,
    output: OutputSink,
    depth: usize,
    initialized: bool,
}

impl<'img> Vm<'img> {
    pub fn new(image: &'img ProgramImage) -> Self {
        Self {
            image,
            statics: FxHashMap::default(),
            output: OutputSink::default(),
            depth: 0,
            initialized: false,
        }
    }

    /// Collect console output instead of printing it.
    pub fn capturing(mut self) -> Self {
        self.output = OutputSink::Capture(Vec::new());
        self
    }

    /// Lines written so far when capturing.
    pub fn output(&self) -> &[String] {
        match &self.output {
            OutputSink::Capture(lines) => lines,
            OutputSink::Stdout => &[],
        }
    }

    pub fn take_output(&mut self) -> Vec<String> {
        match &mut self.output {
            OutputSink::Capture(lines) => std::mem::take(lines),
            OutputSink::Stdout => Vec::new(),
        }
    }

    pub fn image(&self) -> &'img ProgramImage {
        self.image
    }

    pub fn static_field(&self, field: FieldId) -> Value {
        self.statics
            .get(&field)
            .cloned()
            .unwrap_or_else(|| Value::default_for(self.image, self.image.field(field).ty))
    }

    // ========================================================================
    // Entry Points
    // ========================================================================

    /// Run every static constructor once, in declaration order. Types are
    /// declared after the types they depend on.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;

        let image = self.image;
        for ty in image.types() {
            for cctor in image.methods_named(Some(ty.id), MethodKind::CCTOR) {
                if image.method(cctor).body.is_some() {
                    debug!(ty = %image.type_name(ty.id), "running static constructor");
                    self.invoke(cctor, None, Vec::new())?;
                }
            }
        }
        Ok(())
    }

    /// Run the image's entry point. A single `string[]` parameter receives
    /// `args`.
    pub fn run_entry(&mut self, args: &[String]) -> Result<Option<Value>> {
        let entry = self.image.entry_point().ok_or(RuntimeError::NoEntryPoint)?;
        self.initialize()?;

        let params = &self.image.method(entry).params;
        let call_args = match params.first() {
            Some(param) => {
                let items = args.iter().map(|a| Value::string(a.as_str())).collect();
                vec![Object::new(param.ty, ObjectData::Array(items)).into_value()]
            }
            None => Vec::new(),
        };
        debug!(entry = %self.image.method_display(entry), "running entry point");
        self.invoke(entry, None, call_args)
    }

    /// Call a static method by name: a global function `Name` or a type
    /// member `Namespace.Type.Name`. The first overload taking `args.len()`
    /// parameters is used.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>> {
        let unknown = || RuntimeError::UnknownMethod { name: name.to_string() };
        let candidates = match name.rsplit_once('.') {
            Some((ty, method)) => {
                let owner = self.image.find_type(ty).ok_or_else(unknown)?;
                self.image.methods_named(Some(owner), method)
            }
            None => self.image.methods_named(None, name),
        };
        let method = candidates
            .into_iter()
            .find(|&m| {
                let entry = self.image.method(m);
                entry.is_static() && entry.params.len() == args.len()
            })
            .ok_or_else(unknown)?;

        self.initialize()?;
        self.invoke(method, None, args)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Run `method` to completion. Returns its value unless it is void.
    pub fn invoke(&mut self, method: MethodId, this: Option<Value>, args: Vec<Value>) -> Result<Option<Value>> {
        let image = self.image;
        let entry = image
            .get_method(method)
            .ok_or_else(|| RuntimeError::UnknownMethod { name: method.to_string() })?;

        if let Some(op) = entry.host {
            return host::call(self, op, this, args);
        }
        if entry.body.is_none() {
            return Err(RuntimeError::MissingBody {
                name: self.image.method_display(method),
            });
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded { limit: MAX_CALL_DEPTH });
        }

        trace!(method = %self.image.method_display(method), "invoke");
        self.depth += 1;
        let mut frame = Frame::new(self.image, method, this, args);
        let result = self.execute(&mut frame);
        self.depth -= 1;
        result
    }

    /// The method that runs for a virtual call on `this`.
    fn dispatch(&self, method: MethodId, this: Option<&Value>) -> Result<MethodId> {
        let runtime = this
            .and_then(Value::runtime_type)
            .ok_or_else(|| RuntimeError::NullReference {
                operation: format!("call to '{}'", self.image.method_display(method)),
            })?;
        Ok(self.image.resolve_virtual(runtime, method).unwrap_or(method))
    }

    fn construct(&mut self, ctor: MethodId, args: Vec<Value>) -> Result<Value> {
        let image = self.image;
        let entry = image.method(ctor);
        let ty = entry
            .owner
            .ok_or_else(|| RuntimeError::UnknownMethod { name: image.method_display(ctor) })?;

        if let Some(op) = entry.host
            && let Some(value) = host::construct(op, ty, &args)?
        {
            return Ok(value);
        }

        let object = Object::new(ty, ObjectData::Plain).into_value();
        self.invoke(ctor, Some(object.clone()), args)?;
        Ok(object)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    fn execute(&mut self, frame: &mut Frame<'img>) -> Result<Option<Value>> {
        let image = self.image;
        let method = image.method(frame.method);
        let Some(body) = method.body.as_ref() else {
            return Err(RuntimeError::MissingBody {
                name: image.method_display(frame.method),
            });
        };
        let code = &body.code;
        let mut ip = 0usize;

        loop {
            let Some(instr) = code.decode(ip) else {
                return Err(RuntimeError::InvalidOpcode {
                    byte: code.read_byte(ip).unwrap_or(0),
                    offset: ip,
                });
            };
            let invalid = || RuntimeError::InvalidOpcode {
                byte: instr.op as u8,
                offset: instr.offset,
            };
            ip = instr.offset + 1 + instr.op.operand_size();

            match instr.op {
                OpCode::Nop => {}

                // Constants
                OpCode::Constant | OpCode::ConstantWide => {
                    let constant = image.constants().get(instr.operand).ok_or_else(invalid)?;
                    frame.push(match constant {
                        Constant::Int32(v) => Value::I32(*v),
                        Constant::Int64(v) => Value::I64(*v),
                        Constant::Float32(v) => Value::F32(v.into_inner()),
                        Constant::Float64(v) => Value::F64(v.into_inner()),
                        Constant::String(s) => Value::string(s.as_str()),
                    });
                }
                OpCode::PushNull => frame.push(Value::Null),
                OpCode::PushTrue => frame.push(Value::Bool(true)),
                OpCode::PushFalse => frame.push(Value::Bool(false)),
                OpCode::PushZero => frame.push(Value::I32(0)),
                OpCode::PushOne => frame.push(Value::I32(1)),

                // Stack
                OpCode::Pop => {
                    frame.pop()?;
                }
                OpCode::Dup => {
                    let top = frame.peek()?.clone();
                    frame.push(top);
                }
                OpCode::Swap => {
                    let top = frame.pop()?;
                    let below = frame.pop()?;
                    frame.push(top);
                    frame.push(below);
                }

                // Variables
                OpCode::GetLocal => {
                    let value = frame.locals.get(instr.operand as usize).cloned().ok_or_else(invalid)?;
                    frame.push(value);
                }
                OpCode::SetLocal => {
                    let value = frame.pop()?;
                    *frame.locals.get_mut(instr.operand as usize).ok_or_else(invalid)? = value;
                }
                OpCode::LoadArg => {
                    let value = frame.args.get(instr.operand as usize).cloned().ok_or_else(invalid)?;
                    frame.push(value);
                }
                OpCode::StoreArg => {
                    let value = frame.pop()?;
                    *frame.args.get_mut(instr.operand as usize).ok_or_else(invalid)? = value;
                }
                OpCode::LoadThis => {
                    let this = frame.this.clone().ok_or_else(|| RuntimeError::NullReference {
                        operation: format!("'this' in '{}'", image.method_display(frame.method)),
                    })?;
                    frame.push(this);
                }

                // Fields
                OpCode::GetField => {
                    let field = FieldId::new(instr.operand);
                    let target = frame.pop()?;
                    let obj = self.field_owner(&target, field)?;
                    let value = obj
                        .borrow()
                        .fields
                        .get(&field)
                        .cloned()
                        .unwrap_or_else(|| Value::default_for(image, image.field(field).ty));
                    frame.push(value);
                }
                OpCode::SetField => {
                    let field = FieldId::new(instr.operand);
                    let value = frame.pop()?;
                    let target = frame.pop()?;
                    self.field_owner(&target, field)?.borrow_mut().fields.insert(field, value);
                }
                OpCode::GetStatic => {
                    let field = FieldId::new(instr.operand);
                    image.get_field(field).ok_or_else(invalid)?;
                    frame.push(self.static_field(field));
                }
                OpCode::SetStatic => {
                    let field = FieldId::new(instr.operand);
                    image.get_field(field).ok_or_else(invalid)?;
                    let value = frame.pop()?;
                    self.statics.insert(field, value);
                }

                // Arithmetic
                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Rem
                | OpCode::And
                | OpCode::Or
                | OpCode::Xor
                | OpCode::Shl
                | OpCode::Shr => {
                    let right = frame.pop()?;
                    let left = frame.pop()?;
                    frame.push(ops::binary(instr.op, left, right)?);
                }
                OpCode::Neg => {
                    let value = frame.pop()?;
                    frame.push(ops::negate(value)?);
                }

                // Conversions
                OpCode::ConvI1
                | OpCode::ConvI2
                | OpCode::ConvI4
                | OpCode::ConvI8
                | OpCode::ConvU1
                | OpCode::ConvU2
                | OpCode::ConvU4
                | OpCode::ConvU8
                | OpCode::ConvR4
                | OpCode::ConvR8
                | OpCode::ConvRUn => {
                    let value = frame.pop()?;
                    frame.push(ops::convert(instr.op, value)?);
                }

                // Control Flow
                OpCode::Br => ip = instr.operand as usize,
                OpCode::BrTrue => {
                    if frame.pop()?.is_truthy() {
                        ip = instr.operand as usize;
                    }
                }
                OpCode::Ret => {
                    if method.return_type == host_types::VOID {
                        return Ok(None);
                    }
                    return frame.pop().map(Some);
                }

                // Calls
                OpCode::Call | OpCode::CallVirt => {
                    let target = MethodId::new(instr.operand);
                    let callee = image.get_method(target).ok_or_else(invalid)?;
                    let args = frame.pop_n(callee.params.len())?;
                    let this = if callee.is_static() { None } else { Some(frame.pop()?) };
                    let target = if instr.op == OpCode::CallVirt {
                        self.dispatch(target, this.as_ref())?
                    } else {
                        target
                    };
                    if let Some(result) = self.invoke(target, this, args)? {
                        frame.push(result);
                    }
                }
                OpCode::NewObj => {
                    let ctor = MethodId::new(instr.operand);
                    let params = image.get_method(ctor).ok_or_else(invalid)?.params.len();
                    let args = frame.pop_n(params)?;
                    let object = self.construct(ctor, args)?;
                    frame.push(object);
                }

                // Type Tests
                OpCode::IsInst => {
                    let ty = TypeId::new(instr.operand);
                    let value = frame.pop()?;
                    let matches = self.is_instance(&value, ty);
                    frame.push(if matches { value } else { Value::Null });
                }
                OpCode::CastClass => {
                    let ty = TypeId::new(instr.operand);
                    let value = frame.peek()?;
                    if !value.is_null() && !self.is_instance(value, ty) {
                        return Err(RuntimeError::TypeMismatch {
                            operation: "cast".to_string(),
                            detail: format!(
                                "{} is not {}",
                                image.type_name_opt(value.runtime_type()),
                                image.type_name(ty)
                            ),
                        });
                    }
                }
            }
        }
    }

    fn field_owner(&self, target: &Value, field: FieldId) -> Result<ObjectRef> {
        target.as_object().cloned().ok_or_else(|| RuntimeError::NullReference {
            operation: format!("access to field '{}'", self.image.field(field).name),
        })
    }

    fn is_instance(&self, value: &Value, ty: TypeId) -> bool {
        let Some(runtime) = value.runtime_type() else {
            return false;
        };
        if self.image.is_subtype(runtime, ty) {
            return true;
        }
        // Enums share their representation with `int`.
        value.primitive_kind().is_some() && self.image.get_type(ty).is_some_and(|t| t.kind == TypeKind::Enum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unit;

    fn build(source: &str) -> ProgramImage {
        let mut unit = Unit::new();
        unit.add_source("test.nya", source).unwrap();
        unit.build().unwrap();
        unit.into_image().unwrap()
    }

    #[test]
    fn entry_point_runs_after_static_constructors() {
        let image = build(
            "class Counter {
                !total: int;
                !New() { total = 40; }
                @public !@entry Main(): int { total += 2; return total; }
            }",
        );
        let mut vm = Vm::new(&image);
        assert_eq!(vm.run_entry(&[]).unwrap(), Some(Value::I32(42)));
    }

    #[test]
    fn virtual_calls_dispatch_on_the_runtime_type() {
        let image = build(
            "class Animal { @public @virtual Speak(): string { return \"...\"; } }
             class Cat : Animal { @public Speak(): string { return \"meow\"; } }
             Talk(a: Animal): string { return a.Speak(); }
             MakeCat(): Animal { return new Cat(); }
             Run(): string { return Talk(MakeCat()); }",
        );
        let mut vm = Vm::new(&image);
        assert_eq!(vm.call("Run", vec![]).unwrap(), Some(Value::from("meow")));
    }

    #[test]
    fn interface_calls_find_the_implementation() {
        let image = build(
            "interface Dog { DoThing(): int; }
             class Cat : Dog { @public DoThing(): int { return 10; } }
             Use(d: Dog): int { return d.DoThing(); }
             Run(): int { return Use(new Cat()); }",
        );
        assert_eq!(Vm::new(&image).call("Run", vec![]).unwrap(), Some(Value::I32(10)));
    }

    #[test]
    fn fields_live_on_the_instance() {
        let image = build(
            "class Cat {
                lives: int;
                @public New() { lives = 9; }
                @public Lose(): int { lives -= 1; return lives; }
            }
            Run(): int { c = new Cat(); c.Lose(); return c.Lose(); }",
        );
        assert_eq!(Vm::new(&image).call("Run", vec![]).unwrap(), Some(Value::I32(7)));
    }

    #[test]
    fn calls_by_qualified_name_with_arguments() {
        let image = build("namespace Zoo { class Math2 { @public !Twice(x: int): int { return x * 2; } } }");
        let mut vm = Vm::new(&image);
        assert_eq!(vm.call("Zoo.Math2.Twice", vec![Value::I32(21)]).unwrap(), Some(Value::I32(42)));
        let err = vm.call("Zoo.Math2.Thrice", vec![]).unwrap_err();
        assert_eq!(err, RuntimeError::UnknownMethod { name: "Zoo.Math2.Thrice".into() });
    }

    #[test]
    fn missing_entry_point() {
        let image = build("F() { }");
        assert_eq!(Vm::new(&image).run_entry(&[]).unwrap_err(), RuntimeError::NoEntryPoint);
    }

    #[test]
    fn runaway_recursion_is_stopped() {
        let image = build("F(): int { return F(); }");
        let err = Vm::new(&image).call("F", vec![]).unwrap_err();
        assert_eq!(err, RuntimeError::CallDepthExceeded { limit: MAX_CALL_DEPTH });
    }

    #[test]
    fn null_receivers_are_reported() {
        let image = build(
            "class Cat { @public @virtual Name(): string { return \"tom\"; } }
             Run(): string { c: Cat = nil; return c.Name(); }",
        );
        let err = Vm::new(&image).call("Run", vec![]).unwrap_err();
        assert!(matches!(err, RuntimeError::NullReference { .. }));
    }

    #[test]
    fn print_goes_to_the_sink() {
        let image = build("Run() { print(\"meow\"); print(3); print(nil); }");
        let mut vm = Vm::new(&image).capturing();
        vm.call("Run", vec![]).unwrap();
        assert_eq!(vm.take_output(), vec!["meow", "3", ""]);
    }
}
