//! # CYaRon intermediate representation
//!
//! The parser produces a [`program::Program`]: a dense table of variable
//! declarations plus a statement tree whose expressions are already in
//! flattened linear form. Both execution backends read this IR without
//! modifying it.
//!
//! ## Documentation conventions
//!
//! - `#n` denotes the declaration at index `n` of the declaration table.
//! - Expressions print as signed terms, e.g. `+3+2*#0-1*#1[+1*#2]`.

pub mod expr;
pub mod program;
pub mod stmt;
