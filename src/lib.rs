// src/lib.rs
//! A combined conditional-constant-propagation and global-value-numbering
//! pass over a small SSA-form intermediate representation.
//!
//! * `ir` - the intermediate representation (functions, basic blocks,
//!   instructions, terminators) and its optimizer passes, including `combo`.
//! * `error` - error types shared across the crate.
pub mod error;
pub mod ir;
