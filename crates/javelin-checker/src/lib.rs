//! Javelin semantic analysis
//!
//! Two passes over the parsed tree: the binder builds the class symbol
//! table, then the checker attaches a type to every expression and
//! validates every statement. Both passes accumulate reports and never
//! abort; downstream stages decide what an error-level report means.

mod binder;
mod checker;
mod error;
mod report;
mod symbol_table;

pub use binder::bind;
pub use checker::{check, TypeMap};
pub use error::SemanticError;
pub use report::{has_errors, reports_to_json, Report, ReportKind, Stage};
pub use symbol_table::{Method, MethodId, Symbol, SymbolTable};

use javelin_ast::Ast;

/// Run both semantic passes over a parsed program.
pub fn analyze(ast: &Ast) -> (SymbolTable, TypeMap, Vec<Report>) {
    let (table, mut reports) = bind(ast);
    let (types, check_reports) = check(ast, &table);
    reports.extend(check_reports);
    (table, types, reports)
}
