//! Engine limits.

/// Resource limits enforced by an [`ExecutionEngine`](super::engine::ExecutionEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of frames on the invocation stack.
    pub max_invocation_depth: usize,
    /// Maximum number of items across every evaluation, alt and result stack,
    /// counting items nested in arrays, structs and maps.
    pub max_stack_size: usize,
    /// Maximum byte length of a single pushed or concatenated item.
    pub max_item_size: usize,
    /// Maximum element count of an array, struct or map.
    pub max_array_size: usize,
    /// Maximum byte length of an integer operand or result.
    pub max_integer_size: usize,
    /// Maximum absolute shift amount for SHL/SHR.
    pub max_shift: i64,
    /// Instruction budget. `None` runs without a limit.
    pub max_instructions: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_invocation_depth: 1024,
            max_stack_size: 2 * 1024,
            max_item_size: 1024 * 1024,
            max_array_size: 1024,
            max_integer_size: 32,
            max_shift: 256,
            max_instructions: None,
        }
    }
}
