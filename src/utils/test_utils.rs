//! Shared helpers and vectors for unit tests.
