//! Logging and test helpers.

pub mod log;
pub mod test_utils;
