//! Javelin type system
//!
//! Algebraic type values and assignability rules shared by every stage of
//! the compilation pipeline.

mod ty;

pub use ty::{ClassType, Type};
