//! Stack-based bytecode virtual machine for contract and witness scripts.
//!
//! # Architecture
//!
//! - **Items**: every value is a [`stack_item::StackItem`] (`Integer`,
//!   `ByteArray`, `Boolean`, `Array`, `Struct`, `Map`, `InteropInterface`)
//! - **Frames**: each [`execution_context::ExecutionContext`] owns a script,
//!   an instruction pointer and its own evaluation and alt stacks
//! - **Dispatch**: opcodes are decoded into [`instruction::Instruction`]s and
//!   run through a 256-entry handler table built from the same list as
//!   [`isa::OpCode`]
//! - **States**: `NONE` while running, `HALT` on success, `FAULT` on any
//!   error, `BREAK` when paused at a breakpoint
//! - **Collaborators**: scripts, signatures, the signed message and host
//!   interops are reached through the traits in [`providers`] and the
//!   [`interop::InteropService`]
//!
//! # Modules
//!
//! - [`config`]: resource limits
//! - [`engine`]: the execution engine and its stepping controls
//! - [`errors`]: execution errors and their stable kinds
//! - [`isa`]: opcode set and byte values
//! - [`script_builder`]: bytecode emitter

pub mod config;
pub mod engine;
pub mod errors;
pub mod evaluation_stack;
pub mod execution_context;
pub mod instruction;
pub mod interop;
pub mod invocation_stack;
pub mod isa;
pub mod operand;
mod ops;
pub mod providers;
pub mod script_builder;
pub mod stack_item;
pub mod state;

pub use config::EngineConfig;
pub use engine::ExecutionEngine;
pub use errors::{ErrorKind, Fault, VmError};
pub use interop::InteropService;
pub use stack_item::StackItem;
pub use state::VmState;
