//! Ready-made languages built on the rule engine.
//!
//! Each is an ordinary consumer of [`crate::Language`]: it declares its rules
//! and wraps the parse result for its own result type.

pub mod arithmetic;
pub mod filter;

pub use arithmetic::Arithmetic;
pub use filter::Filter;
