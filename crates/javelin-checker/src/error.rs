//! Semantic error taxonomy
//!
//! User-facing failures detected during analysis. Each value knows its
//! severity and converts into a positioned [`Report`]; none of them are
//! ever thrown across a stage boundary.

use crate::report::{Report, ReportKind, Stage};
use javelin_ast::Span;
use javelin_types::Type;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("Duplicated import for class `{0}`")]
    DuplicatedImport(String),

    #[error("Conflicting imports for symbol `{0}`")]
    ConflictingImport(String),

    #[error("Cyclic extensions are not allowed")]
    CyclicExtension,

    #[error("Could not find symbol `{0}`")]
    SymbolNotFound(String),

    #[error("Only the main method can be static")]
    BadMainMethodName,

    #[error("The single argument of the main method must be of type String[]")]
    BadMainMethodArguments,

    #[error("Expected {expected}, found `{found}`")]
    IncompatibleAssignment { expected: String, found: String },

    #[error("Wrong number of arguments provided, expected `{expected}` but found `{found}`")]
    WrongArgumentCount { expected: usize, found: usize },

    #[error("Variable `{0}` is already defined in this scope")]
    VariableAlreadyDefined(String),

    #[error("Method `{0}` is already defined in this class")]
    MethodAlreadyDefined(String),

    #[error("Non-static method `{0}` cannot be referenced in a static context")]
    InstanceMethodInStaticContext(String),

    #[error("Non-static field `{0}` cannot be referenced in a static context")]
    InstanceFieldInStaticContext(String),

    #[error("`this` cannot be referenced in a static context")]
    ThisInStaticContext,
}

impl SemanticError {
    /// Mismatch between two concrete types.
    pub fn incompatible(expected: &Type, found: &Type) -> Self {
        SemanticError::IncompatibleAssignment {
            expected: format!("`{}`", expected),
            found: found.to_string(),
        }
    }

    /// Mismatch against a described shape ("array", "object or static reference").
    pub fn incompatible_with(expected: &str, found: &Type) -> Self {
        SemanticError::IncompatibleAssignment {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Duplicated imports are the only non-fatal diagnostic.
    pub fn severity(&self) -> ReportKind {
        match self {
            SemanticError::DuplicatedImport(_) => ReportKind::Warning,
            _ => ReportKind::Error,
        }
    }

    pub fn into_report(self, span: Span) -> Report {
        Report::new(
            self.severity(),
            Stage::Semantic,
            span.line,
            span.column,
            self.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severities() {
        assert_eq!(
            SemanticError::DuplicatedImport("a.B".to_string()).severity(),
            ReportKind::Warning
        );
        assert_eq!(
            SemanticError::CyclicExtension.severity(),
            ReportKind::Error
        );
    }

    #[test]
    fn test_incompatible_message() {
        let error = SemanticError::incompatible(&Type::Int, &Type::Boolean);
        assert_eq!(error.to_string(), "Expected `int`, found `boolean`");

        let error = SemanticError::incompatible_with("array", &Type::Int);
        assert_eq!(error.to_string(), "Expected array, found `int`");
    }

    #[test]
    fn test_into_report_keeps_position() {
        let report = SemanticError::SymbolNotFound("x".to_string()).into_report(Span::new(4, 2));
        assert_eq!(report.line, 4);
        assert_eq!(report.column, 2);
        assert!(report.is_error());
        assert_eq!(report.message, "Could not find symbol `x`");
    }
}
