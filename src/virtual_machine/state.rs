//! Engine execution states.

use std::fmt;

/// Where the engine is in its run.
///
/// `Halt` and `Fault` are absorbing. `Break` pauses execution until the
/// caller steps or executes again. `None` means "still running".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VmState {
    #[default]
    None,
    Halt,
    Fault,
    Break,
}

impl VmState {
    /// True for `Halt` and `Fault`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, VmState::Halt | VmState::Fault)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            VmState::None => "NONE",
            VmState::Halt => "HALT",
            VmState::Fault => "FAULT",
            VmState::Break => "BREAK",
        }
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(VmState::Halt.is_terminal());
        assert!(VmState::Fault.is_terminal());
        assert!(!VmState::Break.is_terminal());
        assert!(!VmState::None.is_terminal());
        assert_eq!(VmState::Break.to_string(), "BREAK");
    }
}
