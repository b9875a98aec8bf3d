//! Fixed-size hash types and the protocol's hash functions.
//!
//! Hashes are stored in wire (little-endian) order and displayed reversed,
//! the way block explorers print transaction IDs and script hashes.

use crate::types::encoding::EncodeSink;
use chainvm_derive::{BinaryCodec, Error};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

/// Errors from parsing a hash out of a hex string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

macro_rules! fixed_hash {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, BinaryCodec)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn zero() -> Self {
                Self([0u8; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|&b| b == 0)
            }

            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            /// Builds a hash from wire-order bytes.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }

            /// Parses the reversed (display order) hex form.
            pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
                let mut bytes =
                    hex::decode(s).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
                bytes.reverse();
                Self::from_slice(&bytes).ok_or(HashParseError::InvalidLength {
                    expected: $len,
                    actual: bytes.len(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in self.0.iter().rev() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

fixed_hash!(
    /// 32-byte double-SHA256 digest identifying transactions and assets.
    UInt256,
    32
);

fixed_hash!(
    /// 20-byte RIPEMD160(SHA256) digest identifying scripts.
    UInt160,
    20
);

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA256 applied twice.
pub fn hash256(data: &[u8]) -> UInt256 {
    UInt256(Sha256::digest(Sha256::digest(data)).into())
}

/// RIPEMD160 of SHA256.
pub fn hash160(data: &[u8]) -> UInt160 {
    UInt160(Ripemd160::digest(Sha256::digest(data)).into())
}

/// Incremental double-SHA256 builder.
///
/// Implements [`EncodeSink`] so encodable types can be hashed without an
/// intermediate buffer.
#[derive(Default)]
pub struct HashBuilder {
    hasher: Sha256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Consumes the builder and returns `SHA256(SHA256(data))`.
    pub fn finalize(self) -> UInt256 {
        UInt256(Sha256::digest(self.hasher.finalize()).into())
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

/// Lazily computed hash that never takes part in equality or encoding.
#[derive(Clone, Default)]
pub struct HashCache(OnceLock<UInt256>);

impl HashCache {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get_or_compute(&self, compute: impl FnOnce() -> UInt256) -> UInt256 {
        *self.0.get_or_init(compute)
    }
}

impl PartialEq for HashCache {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for HashCache {}

impl fmt::Debug for HashCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(hash) => write!(f, "HashCache({hash})"),
            None => write!(f, "HashCache(<empty>)"),
        }
    }
}
