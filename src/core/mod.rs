//! Transaction wire types.
//!
//! - `Transaction`: kind-specific payload plus attributes, inputs, outputs
//!   and witnesses, with a cached double-SHA256 ID
//! - `Attribute`: usage-tagged metadata with usage-dependent layouts
//! - `Witness`: invocation/verification script pair, checked on the engine
//!
//! Every type encodes with the var-int framing of [`crate::types::encoding`]
//! and decodes back to the same bytes.

pub mod attribute;
pub mod io;
pub mod transaction;
pub mod witness;
