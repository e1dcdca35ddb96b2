//! Activation records.

use nyalang_compiler::ProgramImage;
use nyalang_core::{MethodId, RuntimeError};

use super::value::Value;

type Result<T> = std::result::Result<T, RuntimeError>;

/// One executing method: its receiver, arguments, locals and operand stack.
pub struct Frame<'img> {
    image: &'img ProgramImage,
    pub method: MethodId,
    pub this: Option<Value>,
    pub args: Vec<Value>,
    pub locals: Vec<Value>,
    stack: Vec<Value>,
}

impl<'img> Frame<'img> {
    pub fn new(image: &'img ProgramImage, method: MethodId, this: Option<Value>, args: Vec<Value>) -> Self {
        let locals = image
            .method(method)
            .body
            .as_ref()
            .map(|body| body.locals.iter().map(|&ty| Value::default_for(image, ty)).collect())
            .unwrap_or_default();
        let max_stack = image.method(method).body.as_ref().map_or(0, |b| b.max_stack as usize);
        Self {
            image,
            method,
            this,
            args,
            locals,
            stack: Vec::with_capacity(max_stack),
        }
    }

    fn underflow(&self) -> RuntimeError {
        RuntimeError::StackUnderflow {
            method: self.image.method_display(self.method),
        }
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(|| self.underflow())
    }

    pub fn peek(&self) -> Result<&Value> {
        self.stack.last().ok_or_else(|| self.underflow())
    }

    /// Pop the top `n` values, deepest first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if self.stack.len() < n {
            return Err(self.underflow());
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_n_keeps_argument_order() {
        let image = ProgramImage::new();
        let mut frame = Frame::new(&image, MethodId::new(0), None, Vec::new());
        for i in 1..=3 {
            frame.push(Value::I32(i));
        }
        assert_eq!(frame.pop_n(2).unwrap(), vec![Value::I32(2), Value::I32(3)]);
        assert_eq!(frame.depth(), 1);
        assert!(frame.pop_n(2).is_err());
    }

    #[test]
    fn underflow_names_the_method() {
        let image = ProgramImage::new();
        let mut frame = Frame::new(&image, MethodId::new(0), None, Vec::new());
        let err = frame.pop().unwrap_err();
        assert!(matches!(err, RuntimeError::StackUnderflow { ref method, .. } if method.ends_with(".ctor")));
    }
}
