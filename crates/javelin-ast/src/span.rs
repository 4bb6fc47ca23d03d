//! Source positions

use std::fmt;

/// Line and column of a node, as reported by the parser.
///
/// `NONE` marks synthesized nodes with no source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: i32,
    pub column: i32,
}

impl Span {
    pub const NONE: Span = Span {
        line: -1,
        column: -1,
    };

    pub fn new(line: i32, column: i32) -> Self {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
