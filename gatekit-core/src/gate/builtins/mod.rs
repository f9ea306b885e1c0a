//! Builtin Gates
//!
//! The primitive gate types every project knows about. Each one is a small
//! implementation of [`Behavior`](super::Behavior); none of them needs
//! anything from the surrounding project to evaluate.

mod io;
mod logic;
mod reshaper;

pub use io::{Sink, Source};
pub use logic::{Constant, Datetime, Nand};
pub use reshaper::Reshaper;

/// Type names reserved for builtin gates.
pub const BUILTIN_TYPES: [&str; 6] = ["NAND", "Reshaper", "Constant", "Datetime", "Source", "Sink"];

/// Whether `name` is reserved for a builtin gate.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}
