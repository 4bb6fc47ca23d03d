//! Report stream
//!
//! Every pipeline stage appends to a flat list of reports instead of
//! failing. The front end decides whether error-level reports fail the
//! build. Reports serialize to JSON for IDE integration.

use serde::Serialize;
use std::fmt;

/// Severity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Log,
    Debug,
    Warning,
    Error,
}

/// Pipeline stage a report originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Semantic,
    Optimization,
    Generation,
}

/// A single diagnostic with its source position.
///
/// `line`/`column` are `-1` for position-less reports, e.g. the register
/// allocator's budget reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub stage: Stage,
    pub line: i32,
    pub column: i32,
    pub message: String,
}

impl Report {
    pub fn new(
        kind: ReportKind,
        stage: Stage,
        line: i32,
        column: i32,
        message: impl Into<String>,
    ) -> Self {
        Report {
            kind,
            stage,
            line,
            column,
            message: message.into(),
        }
    }

    /// A report with no source position.
    pub fn positionless(kind: ReportKind, stage: Stage, message: impl Into<String>) -> Self {
        Report::new(kind, stage, -1, -1, message)
    }

    pub fn is_error(&self) -> bool {
        self.kind == ReportKind::Error
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportKind::Log => "log",
            ReportKind::Debug => "debug",
            ReportKind::Warning => "warning",
            ReportKind::Error => "error",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Semantic => "semantic",
            Stage::Optimization => "optimization",
            Stage::Generation => "generation",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.stage)?;
        if self.line >= 0 {
            write!(f, " ({}:{})", self.line, self.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Whether any report in the list is error-level.
pub fn has_errors(reports: &[Report]) -> bool {
    reports.iter().any(Report::is_error)
}

/// JSON rendering of a report list for IDE integration.
pub fn reports_to_json(reports: &[Report]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_position() {
        let report = Report::new(ReportKind::Error, Stage::Semantic, 3, 7, "bad");
        assert_eq!(format!("{}", report), "error@semantic (3:7): bad");
    }

    #[test]
    fn test_display_positionless() {
        let report = Report::positionless(ReportKind::Debug, Stage::Optimization, "note");
        assert_eq!(format!("{}", report), "debug@optimization: note");
    }

    #[test]
    fn test_has_errors() {
        let warning = Report::positionless(ReportKind::Warning, Stage::Semantic, "w");
        let error = Report::positionless(ReportKind::Error, Stage::Semantic, "e");
        assert!(!has_errors(&[warning.clone()]));
        assert!(has_errors(&[warning, error]));
    }

    #[test]
    fn test_json_output() {
        let report = Report::new(ReportKind::Error, Stage::Semantic, 1, 2, "oops");
        let json = reports_to_json(&[report]).unwrap();
        assert!(json.contains("\"kind\""));
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"semantic\""));
        assert!(json.contains("\"oops\""));
    }
}
