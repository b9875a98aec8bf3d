//! Call frames.

use crate::types::bytes::Bytes;
use crate::types::hash::{UInt160, hash160};
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::evaluation_stack::{AltStack, EvaluationStack};
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::OpCode;
use std::cell::OnceCell;

/// Return-value count meaning "everything left on the evaluation stack".
pub const RETURN_ALL: i32 = -1;

/// One frame: a script, its instruction pointer and its own stacks.
///
/// Frames created by `CALL` share the caller's script buffer but never its
/// stacks.
#[derive(Debug)]
pub struct ExecutionContext {
    script: Bytes,
    ip: usize,
    rvcount: i32,
    estack: EvaluationStack,
    altstack: AltStack,
    script_hash: OnceCell<UInt160>,
}

impl ExecutionContext {
    pub fn new(script: Bytes, rvcount: i32) -> Self {
        Self {
            script,
            ip: 0,
            rvcount,
            estack: EvaluationStack::new(),
            altstack: AltStack::new(),
            script_hash: OnceCell::new(),
        }
    }

    pub fn script(&self) -> &Bytes {
        &self.script
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Number of items handed back to the caller on return.
    pub fn rvcount(&self) -> i32 {
        self.rvcount
    }

    /// HASH160 of the script, computed on first use.
    pub fn script_hash(&self) -> UInt160 {
        *self.script_hash.get_or_init(|| hash160(&self.script))
    }

    /// Opcode at the instruction pointer, without moving it.
    pub fn next(&self) -> Result<OpCode, VmError> {
        match self.script.get(self.ip) {
            Some(&byte) => OpCode::try_from(byte),
            None => Ok(OpCode::Ret),
        }
    }

    /// Decodes the instruction at the instruction pointer, without moving it.
    pub fn current_instruction(&self) -> Result<Instruction, VmError> {
        Instruction::decode(&self.script, self.ip)
    }

    pub fn advance(&mut self, n: usize) {
        self.ip = self.ip.saturating_add(n);
    }

    /// Moves the instruction pointer to `position + offset`.
    ///
    /// The target may equal the script length (an implicit `RET`) but not
    /// exceed it.
    pub fn jump(&mut self, position: usize, offset: i16) -> Result<(), VmError> {
        self.ip = self.jump_target(position, offset)?;
        Ok(())
    }

    /// Validates `position + offset` without moving.
    pub fn jump_target(&self, position: usize, offset: i16) -> Result<usize, VmError> {
        let target = position as i64 + offset as i64;
        if target < 0 || target > self.script.len() as i64 {
            return Err(VmError::JumpOutOfRange {
                target,
                len: self.script.len(),
            });
        }
        Ok(target as usize)
    }

    pub fn is_at_end(&self) -> bool {
        self.ip >= self.script.len()
    }

    pub fn estack(&self) -> &EvaluationStack {
        &self.estack
    }

    pub fn estack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.estack
    }

    pub fn altstack(&self) -> &AltStack {
        &self.altstack
    }

    pub fn altstack_mut(&mut self) -> &mut AltStack {
        &mut self.altstack
    }

    /// Both stacks at once, for opcodes that move items between them.
    pub fn stacks_mut(&mut self) -> (&mut EvaluationStack, &mut AltStack) {
        (&mut self.estack, &mut self.altstack)
    }
}
