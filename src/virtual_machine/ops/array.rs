//! Array, struct and map opcodes.
//!
//! Containers are shared handles, so every mutation here is visible through
//! all stack slots referring to the same container. Structs stored into a
//! container are copied first.

use super::{check_array_size, pop_count, push, to_count, to_index};
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::stack_item::{OrderedMap, StackItem};
use crate::virtual_machine::state::VmState;

/// Pops a primitive lookup key.
fn pop_key(engine: &mut ExecutionEngine) -> Result<StackItem, VmError> {
    let key = engine.estack_mut()?.pop()?;
    OrderedMap::check_key(&key)?;
    Ok(key)
}

pub(super) fn array_size(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let size = match engine.estack_mut()?.pop()? {
        StackItem::Array(items) | StackItem::Struct(items) => items.borrow().len(),
        StackItem::Map(map) => map.borrow().len(),
        other => other.to_bytes()?.len(),
    };
    push(engine, size)
}

/// PACK item_n-1 .. item_0 n. The top item becomes element zero.
pub(super) fn pack(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let size = pop_count(engine)?;
    check_array_size(engine, size)?;
    let estack = engine.estack_mut()?;
    if size > estack.len() {
        return Err(VmError::StackUnderflow {
            needed: size,
            depth: estack.len(),
        });
    }
    let items = (0..size)
        .map(|_| estack.pop())
        .collect::<Result<Vec<_>, _>>()?;
    push(engine, StackItem::new_array(items))
}

pub(super) fn unpack(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let array = engine.estack_mut()?.pop()?;
    let items = array.as_array()?.borrow().to_vec();
    let estack = engine.estack_mut()?;
    let count = items.len();
    for item in items.into_iter().rev() {
        estack.push(item);
    }
    push(engine, count)
}

pub(super) fn pick_item(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let key = pop_key(engine)?;
    let item = match engine.estack_mut()?.pop()? {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let items = items.borrow();
            let index = to_index(&key.to_integer()?, items.len())?;
            items[index].clone()
        }
        StackItem::Map(map) => map.borrow().get(&key).cloned().ok_or(VmError::KeyNotFound)?,
        other => {
            return Err(VmError::TypeCoercion {
                from: other.type_name(),
                to: "Array",
            });
        }
    };
    push(engine, item)
}

pub(super) fn set_item(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let value = engine.estack_mut()?.pop()?.clone_struct();
    let key = pop_key(engine)?;
    let target = engine.estack_mut()?.pop()?;
    match target {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let mut items = items.borrow_mut();
            let index = to_index(&key.to_integer()?, items.len())?;
            items[index] = value;
        }
        StackItem::Map(map) => {
            let mut map = map.borrow_mut();
            if !map.contains_key(&key) {
                check_array_size(engine, map.len() + 1)?;
            }
            map.insert(key, value)?;
        }
        other => {
            return Err(VmError::TypeCoercion {
                from: other.type_name(),
                to: "Array",
            });
        }
    }
    Ok(VmState::None)
}

/// NEWARRAY and NEWSTRUCT. An existing sequence of the other kind is
/// copied; one of the same kind is pushed back as is.
fn new_sequence(engine: &mut ExecutionEngine, struct_target: bool) -> Result<VmState, VmError> {
    let wrap = if struct_target {
        StackItem::new_struct
    } else {
        StackItem::new_array
    };
    let source = engine.estack_mut()?.pop()?;
    let item = match source {
        StackItem::Array(items) if struct_target => wrap(items.borrow().to_vec()),
        StackItem::Struct(items) if !struct_target => wrap(items.borrow().to_vec()),
        same @ (StackItem::Array(_) | StackItem::Struct(_)) => same,
        other => {
            let count = to_count(&other.to_integer()?)?;
            check_array_size(engine, count)?;
            wrap(vec![StackItem::Boolean(false); count])
        }
    };
    push(engine, item)
}

pub(super) fn new_array(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    new_sequence(engine, false)
}

pub(super) fn new_struct(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    new_sequence(engine, true)
}

pub(super) fn new_map(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    push(engine, StackItem::new_map())
}

pub(super) fn append(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let value = engine.estack_mut()?.pop()?.clone_struct();
    let target = engine.estack_mut()?.pop()?;
    let items = target.as_array()?;
    check_array_size(engine, items.borrow().len() + 1)?;
    items.borrow_mut().push(value);
    Ok(VmState::None)
}

pub(super) fn reverse(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let target = engine.estack_mut()?.pop()?;
    target.as_array()?.borrow_mut().reverse();
    Ok(VmState::None)
}

pub(super) fn remove(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let key = pop_key(engine)?;
    match engine.estack_mut()?.pop()? {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let mut items = items.borrow_mut();
            let index = to_index(&key.to_integer()?, items.len())?;
            items.remove(index);
        }
        StackItem::Map(map) => {
            map.borrow_mut().remove(&key);
        }
        other => {
            return Err(VmError::TypeCoercion {
                from: other.type_name(),
                to: "Array",
            });
        }
    }
    Ok(VmState::None)
}

pub(super) fn has_key(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let key = pop_key(engine)?;
    let found = match engine.estack_mut()?.pop()? {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let index = to_count(&key.to_integer()?)?;
            index < items.borrow().len()
        }
        StackItem::Map(map) => map.borrow().contains_key(&key),
        other => {
            return Err(VmError::TypeCoercion {
                from: other.type_name(),
                to: "Array",
            });
        }
    };
    push(engine, found)
}

pub(super) fn keys(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let target = engine.estack_mut()?.pop()?;
    let keys: Vec<StackItem> = target.as_map()?.borrow().keys().cloned().collect();
    push(engine, StackItem::new_array(keys))
}

pub(super) fn values(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let values: Vec<StackItem> = match engine.estack_mut()?.pop()? {
        StackItem::Array(items) | StackItem::Struct(items) => {
            items.borrow().iter().map(StackItem::clone_struct).collect()
        }
        StackItem::Map(map) => map.borrow().values().map(StackItem::clone_struct).collect(),
        other => {
            return Err(VmError::TypeCoercion {
                from: other.type_name(),
                to: "Array",
            });
        }
    };
    push(engine, StackItem::new_array(values))
}
