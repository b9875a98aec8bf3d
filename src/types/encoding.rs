//! Binary encoding and decoding traits for the node's wire format.
//!
//! All fixed-width integers are little-endian. Every length prefix and element
//! count is a variable-length unsigned integer ([`VarUint`]):
//!
//! | value             | encoding              |
//! |-------------------|-----------------------|
//! | `< 0xFD`          | 1 byte                |
//! | `<= 0xFFFF`       | `0xFD` + `u16`        |
//! | `<= 0xFFFF_FFFF`  | `0xFE` + `u32`        |
//! | otherwise         | `0xFF` + `u64`        |
//!
//! Decoding only accepts the shortest form, so decode followed by encode
//! always reproduces the input bytes.
//!
//! ```ignore
//! use crate::types::encoding::{Decode, Encode};
//!
//! let bytes = vec![7u16, 8].to_bytes();
//! assert_eq!(bytes.as_slice(), &[2, 7, 0, 8, 0]);
//! assert_eq!(Vec::<u16>::from_bytes(&bytes).unwrap(), vec![7, 8]);
//! ```

use crate::types::bytes::Bytes;
use chainvm_derive::Error;

/// Sink for writing encoded bytes.
///
/// Implemented by byte buffers and hashers so values can be encoded straight
/// into their destination.
pub trait EncodeSink {
    fn write(&mut self, bytes: &[u8]);
}

/// Counts encoded bytes without storing them.
#[derive(Default)]
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    pub fn new() -> Self {
        Self { len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl EncodeSink for SizeCounter {
    fn write(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }
}

impl EncodeSink for Bytes {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Types with a wire representation.
pub trait Encode {
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Number of bytes [`Encode::encode`] writes.
    fn encoded_len(&self) -> usize {
        let mut counter = SizeCounter::new();
        self.encode(&mut counter);
        counter.len()
    }

    /// Serializes into a new buffer allocated with the exact size.
    fn to_bytes(&self) -> Bytes {
        let mut out = Bytes::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }
}

/// Errors that can occur during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before expected data was read.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// Data does not represent a valid value for the target type.
    #[error("invalid value")]
    InvalidValue,
    /// Length prefix exceeds the maximum allowed size.
    #[error("length prefix too large")]
    LengthOverflow,
}

/// Types that can be read back from their wire representation.
pub trait Decode: Sized {
    /// Reads a value from the front of `input`, advancing it past the consumed
    /// bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value that must span all of `data`.
    ///
    /// Returns `InvalidValue` if trailing bytes remain.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;

        if !input.is_empty() {
            return Err(DecodeError::InvalidValue);
        }

        Ok(value)
    }
}

/// Reads exactly `n` bytes from the input, advancing the slice.
pub fn read_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

/// Reads a fixed-size array from the input.
pub fn read_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    let mut array = [0u8; N];
    array.copy_from_slice(read_bytes(input, N)?);
    Ok(array)
}

/// Reads a var-int length prefix and checks it against `max`.
pub fn read_len(input: &mut &[u8], max: usize) -> Result<usize, DecodeError> {
    let len = VarUint::decode(input)?.0;
    match usize::try_from(len) {
        Ok(len) if len <= max => Ok(len),
        _ => Err(DecodeError::LengthOverflow),
    }
}

/// Writes `data` with a var-int length prefix.
pub fn write_var_bytes<S: EncodeSink>(data: &[u8], out: &mut S) {
    VarUint(data.len() as u64).encode(out);
    out.write(data);
}

/// Variable-length unsigned integer used for lengths and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VarUint(pub u64);

impl Encode for VarUint {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        let v = self.0;
        if v < 0xFD {
            out.write(&[v as u8]);
        } else if v <= 0xFFFF {
            out.write(&[0xFD]);
            out.write(&(v as u16).to_le_bytes());
        } else if v <= 0xFFFF_FFFF {
            out.write(&[0xFE]);
            out.write(&(v as u32).to_le_bytes());
        } else {
            out.write(&[0xFF]);
            out.write(&v.to_le_bytes());
        }
    }
}

impl Decode for VarUint {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let (value, min) = match u8::decode(input)? {
            0xFD => (u16::decode(input)? as u64, 0xFD),
            0xFE => (u32::decode(input)? as u64, 0x1_0000),
            0xFF => (u64::decode(input)?, 0x1_0000_0000),
            small => return Ok(VarUint(small as u64)),
        };
        // Non-shortest forms would not survive a re-encode.
        if value < min {
            return Err(DecodeError::InvalidValue);
        }
        Ok(VarUint(value))
    }
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Decode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(read_bytes(input, 1)?[0])
    }
}

macro_rules! impl_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode<S: EncodeSink>(&self, out: &mut S) {
                    out.write(&self.to_le_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    Ok(<$t>::from_le_bytes(read_array(input)?))
                }
            }
        )*
    };
}

impl_int!(u16, u32, u64, i16, i32, i64);

impl Encode for bool {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self as u8]);
    }
}

impl Decode for bool {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

/// Maximum element count accepted for decoded vectors.
pub const MAX_VEC_LEN: usize = 0x0100_0000;

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        VarUint(self.len() as u64).encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = read_len(input, MAX_VEC_LEN)?;
        // Every element takes at least one byte.
        let mut vec = Vec::with_capacity(len.min(input.len()));
        for _ in 0..len {
            vec.push(T::decode(input)?);
        }
        Ok(vec)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        for item in self {
            item.encode(out);
        }
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        read_array(input)
    }
}
