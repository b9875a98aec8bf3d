//! Transactions and their wire format.
//!
//! ```text
//! type u8 | version u8 | kind fields | attributes | inputs | outputs | witnesses
//! ```
//!
//! The ID is the double SHA256 of everything before the witnesses, so
//! signing a transaction does not change its ID.

use crate::core::attribute::Attribute;
use crate::core::io::{Input, Output};
use crate::core::witness::Witness;
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use crate::types::fixed8::Fixed8;
use crate::types::hash::{HashBuilder, HashCache, UInt256};
use crate::virtual_machine::providers::ScriptContainer;
use chainvm_derive::BinaryCodec;

/// Wire tag of each transaction kind.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, BinaryCodec)]
pub enum TransactionType {
    Miner = 0x00,
    Issue = 0x01,
    Claim = 0x02,
    Contract = 0x80,
    Invocation = 0xD1,
}

/// Fields specific to each transaction kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionData {
    /// Block reward; the nonce keeps miner transactions unique.
    Miner { nonce: u32 },
    Issue,
    /// Claims generated gas for the listed spent outputs.
    Claim { claims: Vec<Input> },
    Contract,
    /// Runs `script`. `gas` is only on the wire from version 1.
    Invocation { script: Bytes, gas: Fixed8 },
}

impl TransactionData {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            TransactionData::Miner { .. } => TransactionType::Miner,
            TransactionData::Issue => TransactionType::Issue,
            TransactionData::Claim { .. } => TransactionType::Claim,
            TransactionData::Contract => TransactionType::Contract,
            TransactionData::Invocation { .. } => TransactionType::Invocation,
        }
    }

    fn encode_fields<S: EncodeSink>(&self, version: u8, out: &mut S) {
        match self {
            TransactionData::Miner { nonce } => nonce.encode(out),
            TransactionData::Issue | TransactionData::Contract => {}
            TransactionData::Claim { claims } => claims.encode(out),
            TransactionData::Invocation { script, gas } => {
                script.encode(out);
                if version >= 1 {
                    gas.encode(out);
                }
            }
        }
    }

    fn decode_fields(
        tx_type: TransactionType,
        version: u8,
        input: &mut &[u8],
    ) -> Result<Self, DecodeError> {
        match tx_type {
            TransactionType::Miner => Ok(TransactionData::Miner {
                nonce: u32::decode(input)?,
            }),
            TransactionType::Issue if version <= 1 => Ok(TransactionData::Issue),
            TransactionType::Issue => Err(DecodeError::InvalidValue),
            TransactionType::Claim => Ok(TransactionData::Claim {
                claims: Vec::decode(input)?,
            }),
            TransactionType::Contract => Ok(TransactionData::Contract),
            TransactionType::Invocation => {
                let script = Bytes::decode(input)?;
                let gas = match version {
                    0 => Fixed8::default(),
                    1 => Fixed8::decode(input)?,
                    _ => return Err(DecodeError::InvalidValue),
                };
                Ok(TransactionData::Invocation { script, gas })
            }
        }
    }
}

/// A transaction with its attributes, UTXO movements and witnesses.
///
/// The ID is cached on first use; do not mutate a transaction after asking
/// for its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u8,
    pub data: TransactionData,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub witnesses: Vec<Witness>,

    /// Cached transaction ID, computed lazily on first access, do not use directly.
    cached_id: HashCache,
}

impl Transaction {
    pub fn new(version: u8, data: TransactionData) -> Self {
        Self {
            version,
            data,
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            witnesses: Vec::new(),
            cached_id: HashCache::new(),
        }
    }

    pub fn tx_type(&self) -> TransactionType {
        self.data.tx_type()
    }

    /// Writes every field except the witnesses.
    pub fn encode_unsigned<S: EncodeSink>(&self, out: &mut S) {
        self.tx_type().encode(out);
        self.version.encode(out);
        self.data.encode_fields(self.version, out);
        self.attributes.encode(out);
        self.inputs.encode(out);
        self.outputs.encode(out);
    }

    /// The bytes witnesses sign.
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_unsigned(&mut out);
        out
    }

    /// Double SHA256 of the unsigned encoding.
    pub fn id(&self) -> UInt256 {
        self.cached_id.get_or_compute(|| {
            let mut h = HashBuilder::new();
            self.encode_unsigned(&mut h);
            h.finalize()
        })
    }
}

impl Encode for Transaction {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.encode_unsigned(out);
        self.witnesses.encode(out);
    }
}

impl Decode for Transaction {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let tx_type = TransactionType::decode(input)?;
        let version = u8::decode(input)?;
        let data = TransactionData::decode_fields(tx_type, version, input)?;
        Ok(Self {
            version,
            data,
            attributes: Vec::decode(input)?,
            inputs: Vec::decode(input)?,
            outputs: Vec::decode(input)?,
            witnesses: Vec::decode(input)?,
            cached_id: HashCache::new(),
        })
    }
}

impl ScriptContainer for Transaction {
    fn message(&self) -> Vec<u8> {
        self.unsigned_bytes()
    }
}
