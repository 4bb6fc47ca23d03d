//! Internal compilation errors
//!
//! These mark an inconsistency between pipeline stages, not a user-facing
//! diagnostic. They are deliberately kept out of the report stream: a
//! program that type-checked must lower and emit cleanly, so hitting one of
//! these means a bug in the compiler, not in the compiled program.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("expression node {0} has no inferred type")]
    UntypedExpr(u32),

    #[error("statement node {0} has no inferred type")]
    UntypedStmt(u32),

    #[error("operand `{0}` has a type with no serialized form")]
    UnsuffixedOperand(String),

    #[error("label `{label}` is not defined in method `{method}`")]
    UndefinedLabel { label: String, method: String },

    #[error("internal compiler error: {0}")]
    Internal(String),
}
