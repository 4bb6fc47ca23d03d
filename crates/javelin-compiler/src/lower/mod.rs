//! AST to IR lowering
//!
//! Two cooperating visitors, one for statements and declarations and one
//! for expressions, share a per-method context of symbol-table method,
//! fresh-temporary generator, and fresh-label generator. Expressions lower
//! to an operand plus the preamble instructions that must run before the
//! operand can be referenced.

mod expr;
mod stmt;

use crate::error::{CompileError, CompileResult};
use crate::ir::{ClassUnit, Descriptor, Field, InstrKind, Method, Operand};
use javelin_ast::{Ast, MethodDecl};
use javelin_checker::{MethodId, SymbolTable, TypeMap};
use javelin_types::Type;

/// Lower the checked program into an IR class unit.
pub fn lower(ast: &Ast, table: &SymbolTable, types: &TypeMap) -> CompileResult<ClassUnit> {
    let mut unit = ClassUnit::new(table.this_class().clone());

    unit.imports = table
        .imports()
        .iter()
        .map(|class| class.qualified_name().to_string())
        .collect();

    for field in table.fields() {
        unit.fields.push(Field {
            name: field.name.clone(),
            ty: field.ty.clone(),
            initial_value: None,
        });
    }

    for decl in &ast.program.class.methods {
        let Some((method_id, _)) = table.method_by_name(&decl.name) else {
            continue;
        };
        let lowerer = MethodLowerer::new(ast, table, types, method_id, decl);
        unit.methods.push(lowerer.lower()?);
    }

    Ok(unit)
}

/// Per-method lowering context.
pub(crate) struct MethodLowerer<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) table: &'a SymbolTable,
    pub(crate) types: &'a TypeMap,
    pub(crate) method_id: MethodId,
    decl: &'a MethodDecl,
    pub(crate) method: Method,
    /// Parameters, locals, then temporaries, in storage-slot order.
    ordered_vars: Vec<String>,
    next_temp: usize,
    next_label: usize,
}

impl<'a> MethodLowerer<'a> {
    fn new(
        ast: &'a Ast,
        table: &'a SymbolTable,
        types: &'a TypeMap,
        method_id: MethodId,
        decl: &'a MethodDecl,
    ) -> Self {
        let signature = table.method(method_id);
        let mut method = Method::new(
            signature.name(),
            decl.is_public,
            signature.is_static(),
            signature.return_type().clone(),
        );

        let mut ordered_vars = Vec::new();
        for param in signature.params() {
            method.params.push((param.name.clone(), param.ty.clone()));
            method.var_table.insert(
                param.name.clone(),
                Descriptor {
                    ty: param.ty.clone(),
                    virtual_reg: -1,
                },
            );
            ordered_vars.push(param.name.clone());
        }
        for local in signature.locals() {
            method.var_table.insert(
                local.name.clone(),
                Descriptor {
                    ty: local.ty.clone(),
                    virtual_reg: -1,
                },
            );
            ordered_vars.push(local.name.clone());
        }

        MethodLowerer {
            ast,
            table,
            types,
            method_id,
            decl,
            method,
            ordered_vars,
            next_temp: 0,
            next_label: 1,
        }
    }

    fn lower(mut self) -> CompileResult<Method> {
        for &stmt in &self.decl.body {
            self.lower_stmt(stmt)?;
        }

        match self.decl.return_expr {
            None => {
                self.emit(InstrKind::Return {
                    value: None,
                    ty: Type::Void,
                });
            }
            Some(ret) => {
                let return_type = self.table.method(self.method_id).return_type().clone();
                let lowered = self.lower_expr(ret, Some(&return_type))?;
                for kind in lowered.code {
                    self.emit(kind);
                }
                self.emit(InstrKind::Return {
                    value: lowered.operand,
                    ty: return_type,
                });
            }
        }

        self.finalize_registers();
        Ok(self.method)
    }

    /// Assign sequential virtual registers: the implicit `this` slot on
    /// instance methods, then parameters, locals, and temporaries in order.
    fn finalize_registers(&mut self) {
        let mut register = if self.method.is_static { 0 } else { 1 };
        for name in &self.ordered_vars {
            if let Some(descriptor) = self.method.var_table.get_mut(name) {
                descriptor.virtual_reg = register;
                register += 1;
            }
        }
    }

    pub(crate) fn emit(&mut self, kind: InstrKind) {
        self.method.push(kind);
    }

    pub(crate) fn label_here(&mut self, label: String) {
        self.method.add_label(label);
    }

    /// A fresh temporary holding one expression result.
    pub(crate) fn fresh_temp(&mut self, ty: &Type) -> Operand {
        let name = loop {
            let candidate = format!("t{}", self.next_temp);
            self.next_temp += 1;
            if !self.method.var_table.contains_key(&candidate) {
                break candidate;
            }
        };
        self.method.var_table.insert(
            name.clone(),
            Descriptor {
                ty: ty.clone(),
                virtual_reg: -1,
            },
        );
        self.ordered_vars.push(name.clone());
        Operand::var(name, ty.clone())
    }

    /// Drop a temporary that was renamed away into a real destination.
    pub(crate) fn discard_temp(&mut self, name: &str) {
        self.method.var_table.remove(name);
        self.ordered_vars.retain(|var| var != name);
    }

    pub(crate) fn new_if_labels(&mut self) -> (String, String) {
        let id = self.next_label;
        self.next_label += 1;
        (format!("if{}", id), format!("endif{}", id))
    }

    pub(crate) fn new_while_labels(&mut self) -> (String, String, String) {
        let id = self.next_label;
        self.next_label += 1;
        (
            format!("whileCond{}", id),
            format!("whileLoop{}", id),
            format!("whileEnd{}", id),
        )
    }

    pub(crate) fn expr_type(&self, id: javelin_ast::ExprId) -> CompileResult<Type> {
        self.types
            .expr(id)
            .cloned()
            .ok_or(CompileError::UntypedExpr(id.0))
    }

    pub(crate) fn this_operand(&self) -> Operand {
        Operand::this(self.table.this_class().clone())
    }
}
