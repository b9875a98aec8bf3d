use super::{check_item_size, push};
use crate::types::bytes::Bytes;
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::state::VmState;

pub(super) fn push0(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    push(engine, Bytes::default())
}

pub(super) fn push_bytes(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    push(engine, instr.operand())
}

pub(super) fn push_data(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    check_item_size(engine, instr.operand().len())?;
    push(engine, instr.operand())
}

/// PUSHM1 and PUSH1..PUSH16 encode their value in the opcode byte.
pub(super) fn push_small_int(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let value = instr.opcode() as i64 - (OpCode::Push1 as i64 - 1);
    push(engine, value)
}
