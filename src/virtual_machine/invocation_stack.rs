//! Stack of call frames.

use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::execution_context::ExecutionContext;

#[derive(Debug)]
pub struct InvocationStack {
    frames: Vec<ExecutionContext>,
    max_depth: usize,
}

impl InvocationStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fails with `CallStackOverflow` once `max_depth` frames are live.
    pub fn push(&mut self, ctx: ExecutionContext) -> Result<(), VmError> {
        if self.frames.len() >= self.max_depth {
            return Err(VmError::CallStackOverflow {
                max: self.max_depth,
            });
        }
        self.frames.push(ctx);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<ExecutionContext> {
        self.frames.pop()
    }

    /// The executing frame.
    pub fn current(&self) -> Option<&ExecutionContext> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.frames.last_mut()
    }

    /// The `n`-th frame below the top (`0` is the current frame).
    pub fn peek(&self, n: usize) -> Option<&ExecutionContext> {
        self.frames.iter().rev().nth(n)
    }

    /// The first frame loaded.
    pub fn entry(&self) -> Option<&ExecutionContext> {
        self.frames.first()
    }

    /// Frames from the top down.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionContext> {
        self.frames.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bytes::Bytes;
    use crate::virtual_machine::execution_context::RETURN_ALL;

    fn frame(byte: u8) -> ExecutionContext {
        ExecutionContext::new(Bytes::from(&[byte]), RETURN_ALL)
    }

    #[test]
    fn push_respects_max_depth() {
        let mut stack = InvocationStack::new(2);
        stack.push(frame(1)).unwrap();
        stack.push(frame(2)).unwrap();
        assert_eq!(
            stack.push(frame(3)),
            Err(VmError::CallStackOverflow { max: 2 })
        );
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn frame_order() {
        let mut stack = InvocationStack::new(8);
        for b in 1..=3 {
            stack.push(frame(b)).unwrap();
        }
        assert_eq!(stack.current().unwrap().script().as_slice(), &[3]);
        assert_eq!(stack.peek(1).unwrap().script().as_slice(), &[2]);
        assert_eq!(stack.entry().unwrap().script().as_slice(), &[1]);
        assert!(stack.peek(3).is_none());
        stack.pop();
        stack.pop();
        stack.pop();
        assert!(stack.is_empty());
        assert!(stack.current().is_none());
    }
}
