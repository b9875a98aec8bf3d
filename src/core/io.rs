//! Transaction inputs and outputs.

use crate::types::fixed8::Fixed8;
use crate::types::hash::{UInt160, UInt256};
use chainvm_derive::BinaryCodec;

/// Reference to an unspent output of an earlier transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Input {
    /// ID of the transaction holding the output.
    pub prev_hash: UInt256,
    /// Position of the output in that transaction.
    pub prev_index: u16,
}

/// Amount of an asset assigned to a script hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinaryCodec)]
pub struct Output {
    pub asset_id: UInt256,
    pub amount: Fixed8,
    /// Hash of the verification script allowed to spend the output.
    pub script_hash: UInt160,
}
