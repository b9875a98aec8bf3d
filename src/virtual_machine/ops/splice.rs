use super::{check_item_size, pop_count, push};
use crate::types::bytes::Bytes;
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::state::VmState;

pub(super) fn cat(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    let right = estack.pop_bytes()?;
    let left = estack.pop_bytes()?;
    check_item_size(engine, left.len() + right.len())?;

    let mut joined = Vec::with_capacity(left.len() + right.len());
    joined.extend_from_slice(&left);
    joined.extend_from_slice(&right);
    push(engine, joined)
}

/// SUBSTR x index count. Reads past the end are truncated.
pub(super) fn substr(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let count = pop_count(engine)?;
    let index = pop_count(engine)?;
    let bytes = engine.estack_mut()?.pop_bytes()?;

    let slice = match bytes.get(index..) {
        Some(rest) => &rest[..count.min(rest.len())],
        None => &[][..],
    };
    push(engine, slice)
}

pub(super) fn left(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let count = pop_count(engine)?;
    let bytes = engine.estack_mut()?.pop_bytes()?;
    if count >= bytes.len() {
        return push(engine, bytes);
    }
    push(engine, &bytes[..count])
}

pub(super) fn right(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let count = pop_count(engine)?;
    let bytes = engine.estack_mut()?.pop_bytes()?;
    if count > bytes.len() {
        return Err(VmError::IndexOutOfRange {
            index: i64::try_from(count).unwrap_or(i64::MAX),
            len: bytes.len(),
        });
    }
    push(engine, Bytes::from(&bytes[bytes.len() - count..]))
}

pub(super) fn size(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let bytes = engine.estack_mut()?.pop_bytes()?;
    push(engine, bytes.len())
}
