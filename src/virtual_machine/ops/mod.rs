//! Opcode handlers, grouped by family.
//!
//! Every handler has the same shape: it receives the decoded instruction
//! (the instruction pointer has already moved past it) and the engine, and
//! returns the state the engine should continue in. Handlers validate all
//! of their inputs before mutating anything they cannot roll back.

use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::stack_item::{StackItem, integer_size};
use crate::virtual_machine::state::VmState;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

mod arithmetic;
mod array;
mod bitwise;
mod crypto;
mod exceptions;
mod flow;
mod push;
mod splice;
mod stack;

pub type OpHandler = fn(&Instruction, &mut ExecutionEngine) -> Result<VmState, VmError>;

macro_rules! define_handler_table {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:literal, $mnemonic:literal => $operand:expr, $family:ident :: $handler:ident
        ),* $(,)?
    ) => {
        /// Handler for every opcode byte, indexed by the byte itself.
        static HANDLERS: [Option<OpHandler>; 256] = {
            let mut table: [Option<OpHandler>; 256] = [None; 256];
            $( table[$code as usize] = Some($family::$handler as OpHandler); )*
            table
        };
    };
}

crate::for_each_opcode!(define_handler_table);

fn unassigned(instr: &Instruction, _: &mut ExecutionEngine) -> Result<VmState, VmError> {
    Err(VmError::InvalidOpcode(instr.opcode() as u8))
}

/// Looks up the handler for a decoded opcode.
pub(crate) fn handler(op: OpCode) -> OpHandler {
    HANDLERS[op as usize].unwrap_or(unassigned)
}

// ==================== Shared helpers ====================

/// Pops an integer, rejecting byte arrays wider than the engine allows.
pub(crate) fn pop_integer(engine: &mut ExecutionEngine) -> Result<BigInt, VmError> {
    let max = engine.config().max_integer_size;
    let item = engine.estack_mut()?.pop()?;
    check_integer_item(&item, max)?;
    let value = item.to_integer()?;
    check_integer(&value, max)?;
    Ok(value)
}

fn check_integer_item(item: &StackItem, max: usize) -> Result<(), VmError> {
    if let StackItem::ByteArray(bytes) = item
        && bytes.len() > max
    {
        return Err(VmError::IntegerTooLarge {
            size: bytes.len(),
            max,
        });
    }
    Ok(())
}

fn check_integer(value: &BigInt, max: usize) -> Result<(), VmError> {
    let size = integer_size(value);
    if size > max {
        return Err(VmError::IntegerTooLarge { size, max });
    }
    Ok(())
}

/// Pushes an arithmetic result after checking its width.
pub(crate) fn push_integer(engine: &mut ExecutionEngine, value: BigInt) -> Result<VmState, VmError> {
    check_integer(&value, engine.config().max_integer_size)?;
    engine.estack_mut()?.push(value);
    Ok(VmState::None)
}

pub(crate) fn push(engine: &mut ExecutionEngine, item: impl Into<StackItem>) -> Result<VmState, VmError> {
    engine.estack_mut()?.push(item);
    Ok(VmState::None)
}

/// Pops a non-negative count or index.
pub(crate) fn pop_count(engine: &mut ExecutionEngine) -> Result<usize, VmError> {
    let value = pop_integer(engine)?;
    to_count(&value)
}

pub(crate) fn to_count(value: &BigInt) -> Result<usize, VmError> {
    if value.is_negative() {
        return Err(VmError::InvalidCount(value.to_i64().unwrap_or(i64::MIN)));
    }
    value
        .to_usize()
        .ok_or(VmError::InvalidCount(value.to_i64().unwrap_or(i64::MAX)))
}

/// Converts an index against a container of length `len`.
pub(crate) fn to_index(value: &BigInt, len: usize) -> Result<usize, VmError> {
    match value.to_usize() {
        Some(index) if index < len => Ok(index),
        _ => Err(VmError::IndexOutOfRange {
            index: value.to_i64().unwrap_or(i64::MAX),
            len,
        }),
    }
}

/// Fails when a container would grow past the configured element limit.
pub(crate) fn check_array_size(engine: &ExecutionEngine, size: usize) -> Result<(), VmError> {
    let max = engine.config().max_array_size;
    if size > max {
        return Err(VmError::ArrayTooLarge { size, max });
    }
    Ok(())
}

pub(crate) fn check_item_size(engine: &ExecutionEngine, size: usize) -> Result<(), VmError> {
    let max = engine.config().max_item_size;
    if size > max {
        return Err(VmError::ItemTooLarge { size, max });
    }
    Ok(())
}
