use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::state::VmState;

pub(super) fn throw(_: &Instruction, _: &mut ExecutionEngine) -> Result<VmState, VmError> {
    Err(VmError::LogicalFailure("THROW"))
}

pub(super) fn throw_if_not(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    if engine.estack_mut()?.pop_bool()? {
        Ok(VmState::None)
    } else {
        Err(VmError::LogicalFailure("THROWIFNOT"))
    }
}
