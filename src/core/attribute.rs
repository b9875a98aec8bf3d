//! Transaction attributes.
//!
//! The payload layout depends on the usage code: hashes and keys are fixed
//! width, descriptions and remarks carry a length prefix.

use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink, read_bytes, read_len};
use chainvm_derive::Error;

/// Largest attribute payload accepted.
pub const MAX_ATTRIBUTE_DATA: usize = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrUsage {
    ContractHash,
    Ecdh02,
    Ecdh03,
    Script,
    Vote,
    DescriptionUrl,
    Description,
    /// `Hash1` through `Hash15`.
    Hash(u8),
    /// `Remark` (0) through `Remark15`.
    Remark(u8),
}

enum Layout {
    Fixed(usize),
    /// u8 length prefix.
    ShortBytes,
    /// Var-int length prefix.
    VarBytes,
}

impl AttrUsage {
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => AttrUsage::ContractHash,
            0x02 => AttrUsage::Ecdh02,
            0x03 => AttrUsage::Ecdh03,
            0x20 => AttrUsage::Script,
            0x30 => AttrUsage::Vote,
            0x81 => AttrUsage::DescriptionUrl,
            0x90 => AttrUsage::Description,
            0xA1..=0xAF => AttrUsage::Hash(code - 0xA0),
            0xF0..=0xFF => AttrUsage::Remark(code - 0xF0),
            _ => return None,
        })
    }

    pub const fn code(&self) -> u8 {
        match *self {
            AttrUsage::ContractHash => 0x00,
            AttrUsage::Ecdh02 => 0x02,
            AttrUsage::Ecdh03 => 0x03,
            AttrUsage::Script => 0x20,
            AttrUsage::Vote => 0x30,
            AttrUsage::DescriptionUrl => 0x81,
            AttrUsage::Description => 0x90,
            AttrUsage::Hash(n) => 0xA0u8.wrapping_add(n),
            AttrUsage::Remark(n) => 0xF0u8.wrapping_add(n),
        }
    }

    /// False for `Hash(n)` / `Remark(n)` outside their numbered range.
    fn is_valid(&self) -> bool {
        match *self {
            AttrUsage::Hash(n) => (1..=15).contains(&n),
            AttrUsage::Remark(n) => n <= 15,
            _ => true,
        }
    }

    fn layout(&self) -> Layout {
        match self {
            AttrUsage::ContractHash
            | AttrUsage::Vote
            | AttrUsage::Hash(_)
            | AttrUsage::Ecdh02
            | AttrUsage::Ecdh03 => Layout::Fixed(32),
            AttrUsage::Script => Layout::Fixed(20),
            AttrUsage::DescriptionUrl => Layout::ShortBytes,
            AttrUsage::Description | AttrUsage::Remark(_) => Layout::VarBytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute usage {0:?} is out of range")]
    InvalidUsage(AttrUsage),
    #[error("{usage:?} data must be {expected} bytes, got {actual}")]
    WrongLength {
        usage: AttrUsage,
        expected: usize,
        actual: usize,
    },
    #[error("attribute data of {len} bytes exceeds {max}")]
    TooLong { len: usize, max: usize },
}

/// A usage code and its payload. The payload always matches the usage's
/// layout, so encoding cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    usage: AttrUsage,
    data: Bytes,
}

impl Attribute {
    pub fn new(usage: AttrUsage, data: impl Into<Bytes>) -> Result<Self, AttributeError> {
        let data = data.into();
        if !usage.is_valid() {
            return Err(AttributeError::InvalidUsage(usage));
        }
        let max = match usage.layout() {
            Layout::Fixed(expected) if data.len() != expected => {
                return Err(AttributeError::WrongLength {
                    usage,
                    expected,
                    actual: data.len(),
                });
            }
            Layout::Fixed(expected) => expected,
            Layout::ShortBytes => u8::MAX as usize,
            Layout::VarBytes => MAX_ATTRIBUTE_DATA,
        };
        if data.len() > max {
            return Err(AttributeError::TooLong {
                len: data.len(),
                max,
            });
        }
        Ok(Self { usage, data })
    }

    pub fn usage(&self) -> AttrUsage {
        self.usage
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl Encode for Attribute {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.usage.code().encode(out);
        match self.usage.layout() {
            Layout::Fixed(_) => out.write(&self.data),
            Layout::ShortBytes => {
                (self.data.len() as u8).encode(out);
                out.write(&self.data);
            }
            Layout::VarBytes => self.data.encode(out),
        }
    }
}

impl Decode for Attribute {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let usage = AttrUsage::from_code(u8::decode(input)?).ok_or(DecodeError::InvalidValue)?;
        let len = match usage.layout() {
            Layout::Fixed(len) => len,
            Layout::ShortBytes => usize::from(u8::decode(input)?),
            Layout::VarBytes => read_len(input, MAX_ATTRIBUTE_DATA)?,
        };
        let data = Bytes::new(read_bytes(input, len)?);
        Ok(Self { usage, data })
    }
}
