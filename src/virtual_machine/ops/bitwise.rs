//! Bitwise operators act on two's complement integers of arbitrary width.

use super::{pop_integer, push, push_integer};
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::state::VmState;

macro_rules! binary_bitwise {
    ($name:ident, $op:tt) => {
        pub(super) fn $name(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
            let b = pop_integer(engine)?;
            let a = pop_integer(engine)?;
            push_integer(engine, a $op b)
        }
    };
}

binary_bitwise!(and, &);
binary_bitwise!(or, |);
binary_bitwise!(xor, ^);

pub(super) fn invert(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let x = pop_integer(engine)?;
    push_integer(engine, !x)
}

pub(super) fn equal(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    let b = estack.pop()?;
    let a = estack.pop()?;
    push(engine, a.equals(&b))
}
