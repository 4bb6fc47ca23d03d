//! Statement lowering
//!
//! Control flow becomes explicit labels and gotos. Assignments resolve
//! their target in the same order as the type checker (local or parameter
//! first, then field through `this`) and rewrite the lowered expression's
//! result temporary into the real destination instead of emitting a copy.

use super::MethodLowerer;
use crate::error::{CompileError, CompileResult};
use crate::ir::{InstrKind, Operand};
use javelin_ast::{StmtId, StmtKind};
use javelin_types::Type;

impl MethodLowerer<'_> {
    pub(crate) fn lower_stmt(&mut self, id: StmtId) -> CompileResult<()> {
        let ast = self.ast;
        let node = ast.stmt(id);
        match &node.kind {
            StmtKind::Block(items) => {
                for &item in items {
                    self.lower_stmt(item)?;
                }
                Ok(())
            }

            StmtKind::Expr(expr) => {
                let lowered = self.lower_expr(*expr, None)?;
                for kind in lowered.code {
                    self.emit(kind);
                }
                Ok(())
            }

            StmtKind::Assign { name, value } => {
                let target_ty = self.stmt_type(id)?;
                let lowered = self.lower_expr(*value, Some(&target_ty))?;

                match self.storage_operand(name, &target_ty) {
                    Some(dest) => {
                        let (operand, mut code) = lowered.value()?;
                        if code.is_empty() {
                            self.emit(InstrKind::Assign {
                                dest,
                                src: Box::new(InstrKind::SingleOp { operand }),
                            });
                        } else {
                            // The expression already computed its result into a
                            // temporary; rename it to the destination instead
                            // of copying.
                            let temp = operand.name().ok_or_else(|| {
                                CompileError::Internal(
                                    "expression preamble without a result temporary".to_string(),
                                )
                            })?;
                            let temp = temp.to_string();
                            for kind in &mut code {
                                rename_kind(kind, &temp, &dest);
                            }
                            self.discard_temp(&temp);
                            for kind in code {
                                self.emit(kind);
                            }
                        }
                    }
                    None => {
                        let (operand, code) = lowered.value()?;
                        for kind in code {
                            self.emit(kind);
                        }
                        self.emit(InstrKind::PutField {
                            object: self.this_operand(),
                            field: Operand::var(name, target_ty),
                            value: operand,
                        });
                    }
                }
                Ok(())
            }

            StmtKind::ArrayAssign { name, index, value } => {
                let element_ty = self.stmt_type(id)?;
                let (index_operand, index_code) = self.lower_expr(*index, None)?.value()?;
                let (value_operand, value_code) = self.lower_expr(*value, None)?.value()?;
                for kind in index_code {
                    self.emit(kind);
                }
                for kind in value_code {
                    self.emit(kind);
                }

                let array_ty = Type::array_of(element_ty.clone());
                match self.storage_operand(name, &array_ty) {
                    Some(base) => {
                        let Operand::Var {
                            name, is_parameter, ..
                        } = base
                        else {
                            unreachable!("storage operands are named variables");
                        };
                        self.emit(InstrKind::Assign {
                            dest: Operand::ArrayElem {
                                name,
                                index: Box::new(index_operand),
                                ty: element_ty,
                                is_parameter,
                            },
                            src: Box::new(InstrKind::SingleOp {
                                operand: value_operand,
                            }),
                        });
                    }
                    None => {
                        // Field arrays are fetched into a temporary first.
                        let temp = self.fresh_temp(&array_ty);
                        self.emit(InstrKind::Assign {
                            dest: temp.clone(),
                            src: Box::new(InstrKind::GetField {
                                object: self.this_operand(),
                                field: Operand::var(name, array_ty),
                            }),
                        });
                        let temp_name = temp.name().unwrap_or_default().to_string();
                        self.emit(InstrKind::Assign {
                            dest: Operand::ArrayElem {
                                name: temp_name,
                                index: Box::new(index_operand),
                                ty: element_ty,
                                is_parameter: false,
                            },
                            src: Box::new(InstrKind::SingleOp {
                                operand: value_operand,
                            }),
                        });
                    }
                }
                Ok(())
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (cond_operand, cond_code) = self.lower_expr(*cond, None)?.value()?;
                for kind in cond_code {
                    self.emit(kind);
                }

                let (then_label, end_label) = self.new_if_labels();
                self.emit(InstrKind::Branch {
                    cond: Box::new(InstrKind::SingleOp {
                        operand: cond_operand,
                    }),
                    label: then_label.clone(),
                });

                // The not-taken path runs first; without an else branch it is
                // an always-taken path of zero statements.
                if let Some(else_branch) = else_branch {
                    self.lower_stmt(*else_branch)?;
                }
                self.emit(InstrKind::Goto {
                    label: end_label.clone(),
                });

                self.label_here(then_label);
                self.lower_stmt(*then_branch)?;

                self.label_here(end_label);
                Ok(())
            }

            StmtKind::While { cond, body } => {
                let (cond_label, loop_label, end_label) = self.new_while_labels();

                self.label_here(cond_label.clone());
                let (cond_operand, cond_code) = self.lower_expr(*cond, None)?.value()?;
                for kind in cond_code {
                    self.emit(kind);
                }
                self.emit(InstrKind::Branch {
                    cond: Box::new(InstrKind::SingleOp {
                        operand: cond_operand,
                    }),
                    label: loop_label.clone(),
                });
                self.emit(InstrKind::Goto {
                    label: end_label.clone(),
                });

                self.label_here(loop_label);
                self.lower_stmt(*body)?;
                self.emit(InstrKind::Goto { label: cond_label });

                self.label_here(end_label);
                Ok(())
            }
        }
    }

    fn stmt_type(&self, id: StmtId) -> CompileResult<Type> {
        self.types
            .stmt(id)
            .cloned()
            .ok_or(CompileError::UntypedStmt(id.0))
    }

    /// Assignment-target storage: a local or parameter operand, or `None`
    /// for a field (stored through `this`).
    fn storage_operand(&self, name: &str, ty: &Type) -> Option<Operand> {
        let method = self.table.method(self.method_id);
        if method.param_index(name).is_some() {
            return Some(Operand::param(name, ty.clone()));
        }
        if method.local_by_name(name).is_some() {
            return Some(Operand::var(name, ty.clone()));
        }
        None
    }
}

/// Replace every reference to the temporary `from` with `to`.
fn rename_kind(kind: &mut InstrKind, from: &str, to: &Operand) {
    match kind {
        InstrKind::Assign { dest, src } => {
            rename_operand(dest, from, to);
            rename_kind(src, from, to);
        }
        InstrKind::Goto { .. } => {}
        InstrKind::Branch { cond, .. } => rename_kind(cond, from, to),
        InstrKind::Call { callee, args, .. } => {
            rename_operand(callee, from, to);
            for arg in args {
                rename_operand(arg, from, to);
            }
        }
        InstrKind::Return { value, .. } => {
            if let Some(value) = value {
                rename_operand(value, from, to);
            }
        }
        InstrKind::PutField {
            object,
            field,
            value,
        } => {
            rename_operand(object, from, to);
            rename_operand(field, from, to);
            rename_operand(value, from, to);
        }
        InstrKind::GetField { object, field } => {
            rename_operand(object, from, to);
            rename_operand(field, from, to);
        }
        InstrKind::UnaryOp { operand, .. } | InstrKind::SingleOp { operand } => {
            rename_operand(operand, from, to);
        }
        InstrKind::BinaryOp { lhs, rhs, .. } => {
            rename_operand(lhs, from, to);
            rename_operand(rhs, from, to);
        }
    }
}

fn rename_operand(operand: &mut Operand, from: &str, to: &Operand) {
    match operand {
        Operand::Var { name, .. } if name == from => *operand = to.clone(),
        Operand::ArrayElem {
            name,
            index,
            is_parameter,
            ..
        } => {
            if name == from {
                if let Operand::Var {
                    name: to_name,
                    is_parameter: to_is_param,
                    ..
                } = to
                {
                    *name = to_name.clone();
                    *is_parameter = *to_is_param;
                }
            }
            rename_operand(index, from, to);
        }
        _ => {}
    }
}
