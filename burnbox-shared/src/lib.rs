//! Types shared between the burnbox library and its binary.

pub mod constants;
pub mod errors;

pub use errors::{BurnboxError, BurnboxResult};
