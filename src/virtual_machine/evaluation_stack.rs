//! LIFO operand stacks.
//!
//! Indexes passed to [`EvaluationStack::peek`], [`EvaluationStack::remove`]
//! and friends count from the top: `0` is the most recently pushed item.

use crate::types::bytes::Bytes;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::stack_item::{ArrayRef, StackItem};
use num_bigint::BigInt;

/// Conversion applied by [`EvaluationStack::pop_as`].
pub trait FromStackItem: Sized {
    fn from_stack_item(item: StackItem) -> Result<Self, VmError>;
}

impl FromStackItem for StackItem {
    fn from_stack_item(item: StackItem) -> Result<Self, VmError> {
        Ok(item)
    }
}

impl FromStackItem for BigInt {
    fn from_stack_item(item: StackItem) -> Result<Self, VmError> {
        item.to_integer()
    }
}

impl FromStackItem for bool {
    fn from_stack_item(item: StackItem) -> Result<Self, VmError> {
        Ok(item.to_bool())
    }
}

impl FromStackItem for Bytes {
    fn from_stack_item(item: StackItem) -> Result<Self, VmError> {
        item.to_bytes()
    }
}

impl FromStackItem for ArrayRef {
    fn from_stack_item(item: StackItem) -> Result<Self, VmError> {
        item.as_array().cloned()
    }
}

#[derive(Debug, Default, Clone)]
pub struct EvaluationStack {
    items: Vec<StackItem>,
}

/// The alternate stack has the same shape as the evaluation stack.
pub type AltStack = EvaluationStack;

impl EvaluationStack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items from the top of the stack down.
    pub fn iter(&self) -> impl Iterator<Item = &StackItem> {
        self.items.iter().rev()
    }

    pub fn push(&mut self, item: impl Into<StackItem>) {
        self.items.push(item.into());
    }

    fn underflow(&self, needed: usize) -> VmError {
        VmError::StackUnderflow {
            needed,
            depth: self.items.len(),
        }
    }

    /// Converts a from-top index into a vector index.
    fn slot(&self, n: usize) -> Result<usize, VmError> {
        if n < self.items.len() {
            Ok(self.items.len() - 1 - n)
        } else {
            Err(self.underflow(n + 1))
        }
    }

    pub fn pop(&mut self) -> Result<StackItem, VmError> {
        self.items.pop().ok_or_else(|| self.underflow(1))
    }

    pub fn pop_as<T: FromStackItem>(&mut self) -> Result<T, VmError> {
        T::from_stack_item(self.pop()?)
    }

    pub fn pop_int(&mut self) -> Result<BigInt, VmError> {
        self.pop_as()
    }

    pub fn pop_bytes(&mut self) -> Result<Bytes, VmError> {
        self.pop_as()
    }

    pub fn pop_bool(&mut self) -> Result<bool, VmError> {
        self.pop_as()
    }

    pub fn peek(&self, n: usize) -> Result<&StackItem, VmError> {
        let slot = self.slot(n)?;
        Ok(&self.items[slot])
    }

    /// Inserts `item` so that it ends up `n` positions below the top.
    pub fn insert(&mut self, n: usize, item: StackItem) -> Result<(), VmError> {
        if n > self.items.len() {
            return Err(self.underflow(n));
        }
        let at = self.items.len() - n;
        self.items.insert(at, item);
        Ok(())
    }

    pub fn remove(&mut self, n: usize) -> Result<StackItem, VmError> {
        let slot = self.slot(n)?;
        Ok(self.items.remove(slot))
    }

    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), VmError> {
        let a = self.slot(i)?;
        let b = self.slot(j)?;
        self.items.swap(a, b);
        Ok(())
    }

    /// Pushes a copy of the `n`-th item.
    pub fn dup(&mut self, n: usize) -> Result<(), VmError> {
        let item = self.peek(n)?.clone();
        self.items.push(item);
        Ok(())
    }

    /// Moves the `n`-th item to the top.
    pub fn roll(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 {
            return self.peek(0).map(|_| ());
        }
        let item = self.remove(n)?;
        self.items.push(item);
        Ok(())
    }

    /// Moves the top `count` items onto `target`, keeping their order.
    pub fn move_to(&mut self, target: &mut EvaluationStack, count: usize) -> Result<(), VmError> {
        if count > self.items.len() {
            return Err(self.underflow(count));
        }
        let at = self.items.len() - count;
        target.items.extend(self.items.drain(at..));
        Ok(())
    }

    /// Moves every item onto `target`.
    pub fn move_all_to(&mut self, target: &mut EvaluationStack) {
        target.items.append(&mut self.items);
    }
}
