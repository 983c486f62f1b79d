//! Target-module vocabulary: import opcodes, attribute taxonomy, payload
//! encoding and signature translation

mod attributes;
mod opcodes;
mod payload;
mod signature;

pub use attributes::*;
pub use opcodes::*;
pub use payload::*;
pub use signature::*;
