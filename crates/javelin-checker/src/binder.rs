//! Symbol-table construction pass
//!
//! A single top-down traversal in document order: imports, the class
//! declaration, fields, then methods. Failures become reports; the table
//! always comes out structurally complete.

use crate::report::Report;
use crate::symbol_table::SymbolTable;
use crate::SemanticError;
use javelin_ast::{Ast, MethodDecl, Span, TypeRef};

/// Build the symbol table for the program's class.
pub fn bind(ast: &Ast) -> (SymbolTable, Vec<Report>) {
    let program = &ast.program;
    let mut table = SymbolTable::new(&program.class.name);
    let mut reports = Vec::new();

    for import in &program.imports {
        push_all(&mut reports, table.add_import(&import.path), import.span);
    }

    let class = &program.class;
    push_all(
        &mut reports,
        table.set_super_class(class.super_name.as_deref()),
        class.span,
    );

    for field in &class.fields {
        push_all(&mut reports, table.add_field(&field.ty, &field.name), field.span);
    }

    for method in &class.methods {
        bind_method(&mut table, method, &mut reports);
    }

    (table, reports)
}

fn bind_method(table: &mut SymbolTable, decl: &MethodDecl, reports: &mut Vec<Report>) {
    // The main method is forced static with a void return; generic methods
    // carry their declared return type.
    let void_ref = TypeRef::new("void", false, decl.span);
    let return_type = if decl.is_main {
        &void_ref
    } else {
        decl.return_type.as_ref().unwrap_or(&void_ref)
    };

    let (id, errors) = table.create_method(&decl.name, return_type, decl.is_main);
    push_all(reports, errors, decl.span);

    for param in &decl.params {
        push_all(
            reports,
            table.add_parameter(id, &param.ty, &param.name),
            param.span,
        );
    }
    for local in &decl.locals {
        push_all(
            reports,
            table.add_local_variable(id, &local.ty, &local.name),
            local.span,
        );
    }
}

fn push_all(reports: &mut Vec<Report>, errors: Vec<SemanticError>, span: Span) {
    reports.extend(errors.into_iter().map(|error| error.into_report(span)));
}
