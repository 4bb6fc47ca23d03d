//! Optimization passes
//!
//! Constant folding rewrites the AST before lowering; the register
//! allocator (liveness, interference, coloring) runs over the lowered IR
//! when a register budget is configured.

mod coloring;
mod const_fold;
mod interference;
mod liveness;
mod regalloc;

pub use coloring::color;
pub use const_fold::fold_constants;
pub use interference::InterferenceGraph;
pub use liveness::{analyze_liveness, LivenessData};
pub use regalloc::{allocate_registers, render_register_mapping, AllocationOutcome};
