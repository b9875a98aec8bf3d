//! Smart-contract execution engine.
//!
//! Provides a stack-based bytecode virtual machine, the transaction wire
//! types whose scripts it runs, and the encoding primitives both share.

pub mod core;
pub mod types;
pub mod utils;
pub mod virtual_machine;
