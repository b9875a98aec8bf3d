//! Inline operand layouts.

/// Shape of the bytes that follow an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// No operand.
    None,
    /// Exactly `n` raw bytes.
    Fixed(usize),
    /// A little-endian length of the given width (1, 2 or 4 bytes), then
    /// that many bytes.
    Prefixed(u8),
    /// A var-int length of at most `max`, then that many bytes.
    VarBytes { max: usize },
}

