//! Expression lowering
//!
//! Each non-trivial expression allocates one fresh temporary and one
//! assignment instruction computing it. Literals, named variables,
//! parameters, and `this` need no temporary; field reads always
//! materialize through one.

use super::MethodLowerer;
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryAluOp, CallKind, InstrKind, Operand, UnaryAluOp};
use javelin_ast::{BinaryOp, ExprId, ExprKind, UnaryOp};
use javelin_types::Type;

/// A lowered expression: the operand that references its result, plus the
/// preamble instructions that must be emitted first. Calls lowered in a
/// discarded position produce no operand.
pub(crate) struct Lowered {
    pub operand: Option<Operand>,
    pub code: Vec<InstrKind>,
}

impl Lowered {
    fn leaf(operand: Operand) -> Self {
        Lowered {
            operand: Some(operand),
            code: Vec::new(),
        }
    }

    /// The result operand, for positions that require a value.
    pub fn value(self) -> CompileResult<(Operand, Vec<InstrKind>)> {
        match self.operand {
            Some(operand) => Ok((operand, self.code)),
            None => Err(CompileError::Internal(
                "a void expression was used as a value".to_string(),
            )),
        }
    }
}

impl MethodLowerer<'_> {
    /// Lower one expression. `expected` is the type the surrounding
    /// context assigns to the value; it only matters for calls on
    /// externally-structured classes, whose own type is `Unknown`.
    pub(crate) fn lower_expr(
        &mut self,
        id: ExprId,
        expected: Option<&Type>,
    ) -> CompileResult<Lowered> {
        let ast = self.ast;
        let node = ast.expr(id);
        match &node.kind {
            ExprKind::Paren(inner) => self.lower_expr(*inner, expected),

            ExprKind::Int(value) => Ok(Lowered::leaf(Operand::int(*value))),
            ExprKind::Bool(value) => Ok(Lowered::leaf(Operand::bool(*value))),
            ExprKind::This => Ok(Lowered::leaf(self.this_operand())),

            ExprKind::Var(name) => self.lower_var(id, name),

            ExprKind::ArrayIndex { array, index } => {
                let ty = self.expr_type(id)?;
                let (array_operand, mut code) = self.lower_expr(*array, None)?.value()?;
                let (index_operand, index_code) = self.lower_expr(*index, None)?.value()?;
                code.extend(index_code);

                let Operand::Var {
                    name, is_parameter, ..
                } = array_operand
                else {
                    return Err(CompileError::Internal(
                        "array access base is not a named variable".to_string(),
                    ));
                };

                let temp = self.fresh_temp(&ty);
                code.push(InstrKind::Assign {
                    dest: temp.clone(),
                    src: Box::new(InstrKind::SingleOp {
                        operand: Operand::ArrayElem {
                            name,
                            index: Box::new(index_operand),
                            ty,
                            is_parameter,
                        },
                    }),
                });
                Ok(Lowered {
                    operand: Some(temp),
                    code,
                })
            }

            ExprKind::Property { object, .. } => {
                // The only property is an array's `length`.
                let ty = self.expr_type(id)?;
                let (object_operand, mut code) = self.lower_expr(*object, None)?.value()?;

                let temp = self.fresh_temp(&ty);
                code.push(InstrKind::Assign {
                    dest: temp.clone(),
                    src: Box::new(InstrKind::Call {
                        kind: CallKind::ArrayLength,
                        callee: object_operand,
                        method: "length".to_string(),
                        args: Vec::new(),
                        return_type: ty.clone(),
                    }),
                });
                Ok(Lowered {
                    operand: Some(temp),
                    code,
                })
            }

            ExprKind::Unary { op, operand } => {
                let ty = self.expr_type(id)?;
                let (operand, mut code) = self.lower_expr(*operand, None)?.value()?;

                let temp = self.fresh_temp(&ty);
                code.push(InstrKind::Assign {
                    dest: temp.clone(),
                    src: Box::new(InstrKind::UnaryOp {
                        op: lower_unary_op(*op),
                        operand,
                    }),
                });
                Ok(Lowered {
                    operand: Some(temp),
                    code,
                })
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let ty = self.expr_type(id)?;
                let (lhs, mut code) = self.lower_expr(*lhs, None)?.value()?;
                let (rhs, rhs_code) = self.lower_expr(*rhs, None)?.value()?;
                code.extend(rhs_code);

                let temp = self.fresh_temp(&ty);
                code.push(InstrKind::Assign {
                    dest: temp.clone(),
                    src: Box::new(InstrKind::BinaryOp {
                        op: lower_binary_op(*op),
                        lhs,
                        rhs,
                    }),
                });
                Ok(Lowered {
                    operand: Some(temp),
                    code,
                })
            }

            ExprKind::NewArray { size } => {
                let ty = self.expr_type(id)?;
                let (size_operand, mut code) = self.lower_expr(*size, None)?.value()?;

                let temp = self.fresh_temp(&ty);
                code.push(InstrKind::Assign {
                    dest: temp.clone(),
                    src: Box::new(InstrKind::Call {
                        kind: CallKind::New,
                        callee: Operand::var("array", ty.clone()),
                        method: "<init>".to_string(),
                        args: vec![size_operand],
                        return_type: ty.clone(),
                    }),
                });
                Ok(Lowered {
                    operand: Some(temp),
                    code,
                })
            }

            ExprKind::NewObject { .. } => {
                let ty = self.expr_type(id)?;
                let temp = self.fresh_temp(&ty);
                let code = vec![
                    InstrKind::Assign {
                        dest: temp.clone(),
                        src: Box::new(InstrKind::Call {
                            kind: CallKind::New,
                            callee: Operand::var(
                                ty.suffix().unwrap_or_default(),
                                ty.clone(),
                            ),
                            method: "<init>".to_string(),
                            args: Vec::new(),
                            return_type: ty.clone(),
                        }),
                    },
                    InstrKind::Call {
                        kind: CallKind::Special,
                        callee: temp.clone(),
                        method: "<init>".to_string(),
                        args: Vec::new(),
                        return_type: Type::Void,
                    },
                ];
                Ok(Lowered {
                    operand: Some(temp),
                    code,
                })
            }

            ExprKind::Call { callee, name, args } => {
                self.lower_call(id, *callee, name, args, expected)
            }
        }
    }

    fn lower_var(&mut self, id: ExprId, name: &str) -> CompileResult<Lowered> {
        let ty = self.expr_type(id)?;

        if let Type::StaticRef(class) = &ty {
            let simple = class.simple_name().to_string();
            return Ok(Lowered::leaf(Operand::Var {
                name: simple,
                ty,
                is_parameter: false,
            }));
        }

        let method = self.table.method(self.method_id);
        if method.param_index(name).is_some() {
            return Ok(Lowered::leaf(Operand::param(name, ty)));
        }
        if method.local_by_name(name).is_some() {
            return Ok(Lowered::leaf(Operand::var(name, ty)));
        }

        // Field read: always materialized through a temporary.
        let temp = self.fresh_temp(&ty);
        let code = vec![InstrKind::Assign {
            dest: temp.clone(),
            src: Box::new(InstrKind::GetField {
                object: self.this_operand(),
                field: Operand::var(name, ty),
            }),
        }];
        Ok(Lowered {
            operand: Some(temp),
            code,
        })
    }

    /// Invocation-kind rule: a call whose static target is a method of the
    /// current class is direct (static or virtual per the method's own
    /// staticness); otherwise the callee is external and the kind follows
    /// from whether the callee expression is a static reference.
    fn lower_call(
        &mut self,
        id: ExprId,
        callee: ExprId,
        name: &str,
        args: &[ExprId],
        expected: Option<&Type>,
    ) -> CompileResult<Lowered> {
        let node_ty = self.expr_type(id)?;
        let callee_ty = self.expr_type(callee)?;

        let (is_static_call, return_type) = if node_ty.is_unknown() {
            let is_static = matches!(callee_ty, Type::StaticRef(_));
            let return_type = expected.cloned().unwrap_or(Type::Void);
            (is_static, return_type)
        } else {
            let (_, target) = self.table.method_by_name(name).ok_or_else(|| {
                CompileError::Internal(format!("call target `{}` vanished after checking", name))
            })?;
            (target.is_static(), node_ty)
        };
        let kind = if is_static_call {
            CallKind::Static
        } else {
            CallKind::Virtual
        };

        let (callee_operand, mut code) = self.lower_expr(callee, None)?.value()?;
        let mut arg_operands = Vec::with_capacity(args.len());
        for &arg in args {
            let (operand, arg_code) = self.lower_expr(arg, None)?.value()?;
            code.extend(arg_code);
            arg_operands.push(operand);
        }

        let call = InstrKind::Call {
            kind,
            callee: callee_operand,
            method: name.to_string(),
            args: arg_operands,
            return_type: return_type.clone(),
        };

        if return_type == Type::Void {
            code.push(call);
            return Ok(Lowered {
                operand: None,
                code,
            });
        }

        let temp = self.fresh_temp(&return_type);
        code.push(InstrKind::Assign {
            dest: temp.clone(),
            src: Box::new(call),
        });
        Ok(Lowered {
            operand: Some(temp),
            code,
        })
    }
}

fn lower_unary_op(op: UnaryOp) -> UnaryAluOp {
    match op {
        UnaryOp::Not => UnaryAluOp::Not,
    }
}

fn lower_binary_op(op: BinaryOp) -> BinaryAluOp {
    match op {
        BinaryOp::Add => BinaryAluOp::Add,
        BinaryOp::Sub => BinaryAluOp::Sub,
        BinaryOp::Mul => BinaryAluOp::Mul,
        BinaryOp::Div => BinaryAluOp::Div,
        BinaryOp::Lt => BinaryAluOp::Lt,
        BinaryOp::And => BinaryAluOp::And,
    }
}
