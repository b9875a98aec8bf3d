//! Hashing runs in-engine; signature checks go through the `Crypto`
//! collaborator.

use super::{push, to_count};
use crate::types::bytes::Bytes;
use crate::types::hash;
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::stack_item::StackItem;
use crate::virtual_machine::state::VmState;

pub(super) fn sha256(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let data = engine.estack_mut()?.pop_bytes()?;
    push(engine, hash::sha256(&data).to_vec())
}

pub(super) fn hash160(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let data = engine.estack_mut()?.pop_bytes()?;
    push(engine, hash::hash160(&data).0.to_vec())
}

pub(super) fn hash256(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let data = engine.estack_mut()?.pop_bytes()?;
    push(engine, hash::hash256(&data).0.to_vec())
}

/// CHECKSIG signature pubkey, over the container's message.
pub(super) fn check_sig(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    let public_key = estack.pop_bytes()?;
    let signature = estack.pop_bytes()?;
    let message = engine.container()?.message();
    let valid = engine
        .crypto()?
        .verify_signature(&message, &signature, &public_key);
    push(engine, valid)
}

/// VERIFY message signature pubkey.
pub(super) fn verify(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    let public_key = estack.pop_bytes()?;
    let signature = estack.pop_bytes()?;
    let message = estack.pop_bytes()?;
    let valid = engine
        .crypto()?
        .verify_signature(&message, &signature, &public_key);
    push(engine, valid)
}

/// Pops either an array of byte items or a count followed by that many
/// items. Lists are never empty.
fn pop_byte_list(engine: &mut ExecutionEngine) -> Result<Vec<Bytes>, VmError> {
    let estack = engine.estack_mut()?;
    let list = match estack.pop()? {
        StackItem::Array(items) | StackItem::Struct(items) => items
            .borrow()
            .iter()
            .map(StackItem::to_bytes)
            .collect::<Result<Vec<_>, _>>()?,
        item => {
            let n = to_count(&item.to_integer()?)?;
            if n > estack.len() {
                return Err(VmError::StackUnderflow {
                    needed: n,
                    depth: estack.len(),
                });
            }
            (0..n)
                .map(|_| estack.pop_bytes())
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    if list.is_empty() {
        return Err(VmError::InvalidCount(0));
    }
    Ok(list)
}

/// CHECKMULTISIG signatures... m pubkeys... n.
///
/// Signatures must appear in the same order as the keys they match; each
/// key is tried at most once.
pub(super) fn check_multisig(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let keys = pop_byte_list(engine)?;
    let signatures = pop_byte_list(engine)?;
    let (n, m) = (keys.len(), signatures.len());
    if m > n {
        return Err(VmError::InvalidArgument("more signatures than keys"));
    }

    let message = engine.container()?.message();
    let crypto = engine.crypto()?;
    let (mut i, mut j) = (0, 0);
    let mut ok = true;
    while ok && i < m && j < n {
        if crypto.verify_signature(&message, &signatures[i], &keys[j]) {
            i += 1;
        }
        j += 1;
        if m - i > n - j {
            ok = false;
        }
    }
    push(engine, ok && i == m)
}
