//! Reference-counted byte buffer with copy-on-write semantics.

use crate::types::encoding::{Decode, DecodeError, EncodeSink, Encode, read_bytes, read_len, write_var_bytes};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Largest var-bytes payload accepted by the decoder.
pub const MAX_BYTES_LEN: usize = 0x0100_0000;

/// A reference-counted, immutable byte buffer.
///
/// Scripts and stack byte arrays are shared between frames and items, so
/// clones only bump a counter. Mutations go through [`Bytes::make_mut`].
#[derive(Default, Eq, PartialEq, Hash)]
pub struct Bytes(Arc<Vec<u8>>);

impl Bytes {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(data.into()))
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self(Arc::new(Vec::with_capacity(cap)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Returns a mutable reference to the underlying vector.
    ///
    /// Clones the data if other references exist.
    pub fn make_mut(&mut self) -> &mut Vec<u8> {
        Arc::make_mut(&mut self.0)
    }

    pub fn extend_from_slice(&mut self, s: &[u8]) {
        self.make_mut().extend_from_slice(s);
    }

    /// Lower-case hex rendering of the contents.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }
}

impl Clone for Bytes {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Deref for Bytes {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Encode for Bytes {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        write_var_bytes(self.as_slice(), out);
    }
}

impl Decode for Bytes {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = read_len(input, MAX_BYTES_LEN)?;
        Ok(Bytes::new(read_bytes(input, len)?))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(s: &[u8]) -> Self {
        Self::new(s)
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(arr: [u8; N]) -> Self {
        Self::new(arr)
    }
}

impl<const N: usize> From<&[u8; N]> for Bytes {
    fn from(arr: &[u8; N]) -> Self {
        Self::new(arr.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_until_mutated() {
        let a = Bytes::from(&[1, 2, 3]);
        let mut b = a.clone();
        b.extend_from_slice(&[4]);
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert_eq!(b.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn var_bytes_encoding() {
        let bytes = Bytes::from(b"abc");
        assert_eq!(bytes.to_bytes().as_slice(), &[3, b'a', b'b', b'c']);
        assert_eq!(Bytes::from_bytes(&[3, b'a', b'b', b'c']).unwrap(), bytes);
    }

    #[test]
    fn decode_truncated_payload() {
        assert_eq!(
            Bytes::from_bytes(&[4, 1, 2]),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn debug_is_hex() {
        assert_eq!(format!("{:?}", Bytes::from(&[0xde, 0xad])), "0xdead");
    }
}
