//! Three-address IR
//!
//! The typed intermediate representation between the checked AST and the
//! stack-machine assembly. A class unit owns fields and methods; a method
//! owns a flat instruction list whose label-resolved successor edges form
//! the control-flow graph the register allocator runs on.

mod instr;
mod operand;
pub mod pretty;
mod unit;

pub use instr::{BinaryAluOp, CallKind, InstrKind, Instruction, UnaryAluOp};
pub use operand::{Literal, Operand};
pub use unit::{ClassUnit, Descriptor, Field, Method};
