//! Wire-level primitive types.
//!
//! - `encoding`: the `Encode`/`Decode` traits and var-int framing
//! - `bytes`: shared, copy-on-write byte buffers
//! - `hash`: `UInt256`/`UInt160` and the protocol hash functions
//! - `fixed8`: eight-decimal fixed-point amounts

pub mod bytes;
pub mod encoding;
pub mod fixed8;
pub mod hash;
