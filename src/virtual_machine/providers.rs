//! Collaborator services the engine calls into.
//!
//! The engine never decodes transactions, reads storage or implements
//! signature schemes itself. Those concerns arrive through these traits,
//! attached with the `with_*` builders on
//! [`ExecutionEngine`](super::engine::ExecutionEngine). Implementations must
//! be thread-safe so one instance can serve engines on many threads.

use crate::types::bytes::Bytes;
use crate::types::hash::UInt160;

/// Resolves contract scripts for `APPCALL` and `TAILCALL`.
pub trait ScriptTable: Send + Sync {
    fn script(&self, hash: &UInt160) -> Option<Bytes>;
}

/// Signature verification used by `CHECKSIG`, `VERIFY` and `CHECKMULTISIG`.
pub trait Crypto: Send + Sync {
    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// The object being verified, typically a transaction.
pub trait ScriptContainer: Send + Sync {
    /// Bytes covered by the container's signatures.
    fn message(&self) -> Vec<u8>;
}

impl ScriptTable for std::collections::HashMap<UInt160, Bytes> {
    fn script(&self, hash: &UInt160) -> Option<Bytes> {
        self.get(hash).cloned()
    }
}
