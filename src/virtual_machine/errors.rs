use crate::types::hash::UInt160;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::state::VmState;
use chainvm_derive::Error;

/// Stable, machine-readable classification of a [`VmError`].
///
/// Messages may change between releases; kinds do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StackUnderflow,
    TypeCoercion,
    InvalidMapKey,
    IndexOutOfRange,
    KeyNotFound,
    CallStackOverflow,
    UnknownInterop,
    InstructionBudgetExceeded,
    LogicalFailure,
    MalformedOperand,
    InvalidOpcode,
    DivisionByZero,
    IntegerOverflow,
    InvalidShift,
    ResourceLimitExceeded,
    UnknownScript,
    InvalidArgument,
    InteropFailure,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StackUnderflow => "StackUnderflow",
            ErrorKind::TypeCoercion => "TypeCoercion",
            ErrorKind::InvalidMapKey => "InvalidMapKey",
            ErrorKind::IndexOutOfRange => "IndexOutOfRange",
            ErrorKind::KeyNotFound => "KeyNotFound",
            ErrorKind::CallStackOverflow => "CallStackOverflow",
            ErrorKind::UnknownInterop => "UnknownInterop",
            ErrorKind::InstructionBudgetExceeded => "InstructionBudgetExceeded",
            ErrorKind::LogicalFailure => "LogicalFailure",
            ErrorKind::MalformedOperand => "MalformedOperand",
            ErrorKind::InvalidOpcode => "InvalidOpcode",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::IntegerOverflow => "IntegerOverflow",
            ErrorKind::InvalidShift => "InvalidShift",
            ErrorKind::ResourceLimitExceeded => "ResourceLimitExceeded",
            ErrorKind::UnknownScript => "UnknownScript",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::InteropFailure => "InteropFailure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while executing a script. Any of them faults the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// An opcode needed more items than the stack holds.
    #[error("stack underflow: needed {needed} items, have {depth}")]
    StackUnderflow { needed: usize, depth: usize },
    /// The invocation stack is empty.
    #[error("no execution context loaded")]
    NoContext,
    /// An item cannot be read as the type an opcode requires.
    #[error("cannot convert {from} to {to}")]
    TypeCoercion {
        from: &'static str,
        to: &'static str,
    },
    /// Containers and interop handles cannot key a map.
    #[error("{0} cannot be used as a map key")]
    InvalidMapKey(&'static str),
    /// Array, struct or splice index outside the item.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    /// A popped count is negative or does not fit in memory.
    #[error("negative or oversized count {0}")]
    InvalidCount(i64),
    /// PICKITEM on a map without the key.
    #[error("key not found in map")]
    KeyNotFound,
    /// A call would exceed `max_invocation_depth`.
    #[error("invocation depth limit {max} reached")]
    CallStackOverflow { max: usize },
    /// SYSCALL named nothing registered with the interop service.
    #[error("unknown interop {0:?}")]
    UnknownInterop(String),
    /// A collaborator the opcode needs was never attached.
    #[error("{0} is not available to this engine")]
    ServiceUnavailable(&'static str),
    /// `max_instructions` ran out.
    #[error("instruction budget of {limit} exhausted")]
    InstructionBudgetExceeded { limit: u64 },
    /// THROW, or THROWIFNOT on a false value.
    #[error("{0} failed")]
    LogicalFailure(&'static str),
    /// Inline operand truncated or out of bounds.
    #[error("malformed operand: {0}")]
    MalformedOperand(&'static str),
    /// Jump or call target outside `0..=len`.
    #[error("jump target {target} outside script of length {len}")]
    JumpOutOfRange { target: i64, len: usize },
    /// Unassigned opcode byte.
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),
    /// DIV or MOD by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Integer operand or result wider than `max_integer_size`.
    #[error("integer of {size} bytes exceeds limit of {max}")]
    IntegerTooLarge { size: usize, max: usize },
    /// SHL/SHR amount beyond `max_shift`.
    #[error("shift by {0} is out of range")]
    InvalidShift(i64),
    /// Too many items reachable from the stacks.
    #[error("stack size {size} exceeds limit of {max}")]
    StackSizeExceeded { size: usize, max: usize },
    /// Pushed or concatenated bytes longer than `max_item_size`.
    #[error("item size {size} exceeds limit of {max}")]
    ItemTooLarge { size: usize, max: usize },
    /// Container would hold more than `max_array_size` elements.
    #[error("array size {size} exceeds limit of {max}")]
    ArrayTooLarge { size: usize, max: usize },
    /// APPCALL/TAILCALL target missing from the script table.
    #[error("no script registered for {0}")]
    UnknownScript(UInt160),
    /// Well-typed but unusable argument, such as more signatures than keys.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// An interop callable reported its own failure.
    #[error("interop {name} failed: {message}")]
    Interop { name: String, message: String },
    /// A script was loaded into an engine that already halted or faulted.
    #[error("engine already stopped in state {0}")]
    EngineStopped(VmState),
}

impl VmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::StackUnderflow { .. } | VmError::NoContext => ErrorKind::StackUnderflow,
            VmError::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            VmError::InvalidMapKey(_) => ErrorKind::InvalidMapKey,
            VmError::IndexOutOfRange { .. } | VmError::InvalidCount(_) => {
                ErrorKind::IndexOutOfRange
            }
            VmError::KeyNotFound => ErrorKind::KeyNotFound,
            VmError::CallStackOverflow { .. } => ErrorKind::CallStackOverflow,
            VmError::UnknownInterop(_) | VmError::ServiceUnavailable(_) => {
                ErrorKind::UnknownInterop
            }
            VmError::InstructionBudgetExceeded { .. } => ErrorKind::InstructionBudgetExceeded,
            VmError::LogicalFailure(_) => ErrorKind::LogicalFailure,
            VmError::MalformedOperand(_) | VmError::JumpOutOfRange { .. } => {
                ErrorKind::MalformedOperand
            }
            VmError::InvalidOpcode(_) => ErrorKind::InvalidOpcode,
            VmError::DivisionByZero => ErrorKind::DivisionByZero,
            VmError::IntegerTooLarge { .. } => ErrorKind::IntegerOverflow,
            VmError::InvalidShift(_) => ErrorKind::InvalidShift,
            VmError::StackSizeExceeded { .. }
            | VmError::ItemTooLarge { .. }
            | VmError::ArrayTooLarge { .. } => ErrorKind::ResourceLimitExceeded,
            VmError::UnknownScript(_) => ErrorKind::UnknownScript,
            VmError::InvalidArgument(_) | VmError::EngineStopped(_) => {
                ErrorKind::InvalidArgument
            }
            VmError::Interop { .. } => ErrorKind::InteropFailure,
        }
    }
}

/// A terminal engine failure with the location it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (opcode {opcode:?} at ip {ip})")]
pub struct Fault {
    pub error: VmError,
    /// `None` when the opcode byte itself could not be decoded.
    pub opcode: Option<OpCode>,
    pub ip: usize,
}

impl Fault {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
