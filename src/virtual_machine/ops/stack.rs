use super::{pop_count, push};
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::state::VmState;

// ==================== Alt stack ====================

pub(super) fn dup_from_alt_stack(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let (estack, altstack) = engine.current_context_mut()?.stacks_mut();
    estack.push(altstack.peek(0)?.clone());
    Ok(VmState::None)
}

pub(super) fn to_alt_stack(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let (estack, altstack) = engine.current_context_mut()?.stacks_mut();
    altstack.push(estack.pop()?);
    Ok(VmState::None)
}

pub(super) fn from_alt_stack(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let (estack, altstack) = engine.current_context_mut()?.stacks_mut();
    estack.push(altstack.pop()?);
    Ok(VmState::None)
}

// ==================== Indexed ====================

pub(super) fn xdrop(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let n = pop_count(engine)?;
    engine.estack_mut()?.remove(n)?;
    Ok(VmState::None)
}

pub(super) fn xswap(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let n = pop_count(engine)?;
    if n > 0 {
        engine.estack_mut()?.swap(0, n)?;
    }
    Ok(VmState::None)
}

pub(super) fn xtuck(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let n = pop_count(engine)?;
    if n == 0 {
        return Err(VmError::InvalidCount(0));
    }
    let estack = engine.estack_mut()?;
    let top = estack.peek(0)?.clone();
    estack.insert(n, top)?;
    Ok(VmState::None)
}

pub(super) fn pick(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let n = pop_count(engine)?;
    engine.estack_mut()?.dup(n)?;
    Ok(VmState::None)
}

pub(super) fn roll(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let n = pop_count(engine)?;
    if n > 0 {
        engine.estack_mut()?.roll(n)?;
    }
    Ok(VmState::None)
}

// ==================== Fixed ====================

pub(super) fn depth(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let depth = engine.estack_mut()?.len();
    push(engine, depth)
}

pub(super) fn drop(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    engine.estack_mut()?.pop()?;
    Ok(VmState::None)
}

pub(super) fn dup(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    engine.estack_mut()?.dup(0)?;
    Ok(VmState::None)
}

pub(super) fn nip(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    engine.estack_mut()?.remove(1)?;
    Ok(VmState::None)
}

pub(super) fn over(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    engine.estack_mut()?.dup(1)?;
    Ok(VmState::None)
}

pub(super) fn rot(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    engine.estack_mut()?.roll(2)?;
    Ok(VmState::None)
}

pub(super) fn swap(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    engine.estack_mut()?.roll(1)?;
    Ok(VmState::None)
}

pub(super) fn tuck(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    // Needs two items even though only the top is copied.
    estack.peek(1)?;
    let top = estack.peek(0)?.clone();
    estack.insert(2, top)?;
    Ok(VmState::None)
}
