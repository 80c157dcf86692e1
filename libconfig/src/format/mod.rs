//! The libconfig text format.
//!
//! `parse` checks syntax with a pest grammar and builds the tree; `emit`
//! writes text that reads back to a structurally equal tree.

pub(crate) mod emit;

pub(crate) mod parse;

pub use parse::parse_scalar;
