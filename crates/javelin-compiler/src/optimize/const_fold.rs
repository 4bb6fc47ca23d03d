//! Constant folding and propagation
//!
//! An AST-to-AST rewrite driven by a per-path context of statically known
//! variable values. Expressions fold only when fully known; statements
//! thread the context forward, branches intersect it, and loops probe
//! their body once on a clone to learn which bindings survive. The
//! one-pass loop approximation is deliberate and must not be replaced by a
//! fixed point: a corrected version would change observable output.

use javelin_ast::{Ast, BinaryOp, ExprId, ExprKind, StmtId, StmtKind, UnaryOp};
use std::collections::BTreeMap;

/// A statically known scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Int(i32),
    Bool(bool),
}

/// Known values per variable name along one control-flow path.
#[derive(Debug, Clone, Default, PartialEq)]
struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    fn assign(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    fn drop_value(&mut self, name: &str) {
        self.values.remove(name);
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    /// Keep only the names mapped to the identical value in both contexts.
    fn intersect(&self, other: &Context) -> Context {
        let values = self
            .values
            .iter()
            .filter(|(name, value)| other.values.get(*name) == Some(value))
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        Context { values }
    }
}

/// Fold constants in every method body. The context starts empty per
/// method: fields and cross-call effects are never tracked.
pub fn fold_constants(ast: &mut Ast) {
    let methods: Vec<(Vec<StmtId>, Option<ExprId>)> = ast
        .program
        .class
        .methods
        .iter()
        .map(|method| (method.body.clone(), method.return_expr))
        .collect();

    for (body, return_expr) in methods {
        let mut ctx = Context::default();
        for stmt in body {
            ctx = fold_stmt(ast, stmt, ctx);
        }
        if let Some(return_expr) = return_expr {
            fold_expr_in_place(ast, return_expr, &ctx);
        }
    }
}

fn fold_stmt(ast: &mut Ast, id: StmtId, mut ctx: Context) -> Context {
    match ast.stmt(id).kind.clone() {
        StmtKind::Block(items) => {
            for item in items {
                ctx = fold_stmt(ast, item, ctx);
            }
            ctx
        }

        StmtKind::Expr(expr) => {
            fold_expr_in_place(ast, expr, &ctx);
            ctx
        }

        StmtKind::Assign { name, value } => {
            // Fold the right-hand side's sub-expressions in place, then
            // evaluate the whole of it; only a fully known value is
            // recorded.
            fold_children_in_place(ast, value, &ctx);
            ctx.drop_value(&name);
            if let Some(known) = eval(ast, value, &ctx) {
                ctx.assign(&name, known);
            }
            ctx
        }

        StmtKind::ArrayAssign { index, value, .. } => {
            fold_expr_in_place(ast, index, &ctx);
            fold_expr_in_place(ast, value, &ctx);
            ctx
        }

        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => match eval(ast, cond, &ctx) {
            Some(Value::Bool(true)) => {
                let branch_ctx = fold_stmt(ast, then_branch, ctx.clone());
                let replacement = ast.stmt(then_branch).kind.clone();
                ast.replace_stmt(id, replacement);
                branch_ctx
            }
            Some(Value::Bool(false)) => match else_branch {
                Some(else_branch) => {
                    let branch_ctx = fold_stmt(ast, else_branch, ctx.clone());
                    let replacement = ast.stmt(else_branch).kind.clone();
                    ast.replace_stmt(id, replacement);
                    branch_ctx
                }
                None => {
                    ast.replace_stmt(id, StmtKind::Block(Vec::new()));
                    ctx
                }
            },
            _ => {
                fold_expr_in_place(ast, cond, &ctx);
                let true_ctx = fold_stmt(ast, then_branch, ctx.clone());
                let false_ctx = match else_branch {
                    Some(else_branch) => fold_stmt(ast, else_branch, ctx.clone()),
                    None => ctx.clone(),
                };
                true_ctx.intersect(&false_ctx)
            }
        },

        StmtKind::While { cond, body } => {
            // Probe the body once against a private clone to discover which
            // bindings the loop may invalidate, then run the real traversal
            // under the intersection.
            let probe = ast.clone_stmt_deep(body);
            let probe_ctx = fold_stmt(ast, probe, ctx.clone());
            let merged = probe_ctx.intersect(&ctx);

            fold_expr_in_place(ast, cond, &merged);
            fold_stmt(ast, body, merged)
        }
    }
}

/// Fold an expression's children, then replace the expression itself by a
/// literal if its value is fully known.
fn fold_expr_in_place(ast: &mut Ast, id: ExprId, ctx: &Context) {
    fold_children_in_place(ast, id, ctx);
    if let Some(value) = eval(ast, id, ctx) {
        let kind = match value {
            Value::Int(v) => ExprKind::Int(v),
            Value::Bool(v) => ExprKind::Bool(v),
        };
        ast.replace_expr(id, kind);
    }
}

fn fold_children_in_place(ast: &mut Ast, id: ExprId, ctx: &Context) {
    match ast.expr(id).kind.clone() {
        ExprKind::Paren(inner) => fold_expr_in_place(ast, inner, ctx),
        ExprKind::ArrayIndex { array, index } => {
            fold_expr_in_place(ast, array, ctx);
            fold_expr_in_place(ast, index, ctx);
        }
        ExprKind::Call { callee, args, .. } => {
            fold_expr_in_place(ast, callee, ctx);
            for arg in args {
                fold_expr_in_place(ast, arg, ctx);
            }
        }
        ExprKind::Property { object, .. } => fold_expr_in_place(ast, object, ctx),
        ExprKind::Unary { operand, .. } => fold_expr_in_place(ast, operand, ctx),
        ExprKind::Binary { lhs, rhs, .. } => {
            fold_expr_in_place(ast, lhs, ctx);
            fold_expr_in_place(ast, rhs, ctx);
        }
        ExprKind::NewArray { size } => fold_expr_in_place(ast, size, ctx),
        ExprKind::NewObject { .. }
        | ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::This
        | ExprKind::Var(_) => {}
    }
}

/// Pure evaluation against the context. `None` means not statically known;
/// no partial folding of one known operand happens here.
fn eval(ast: &Ast, id: ExprId, ctx: &Context) -> Option<Value> {
    match &ast.expr(id).kind {
        ExprKind::Paren(inner) => eval(ast, *inner, ctx),
        ExprKind::Int(value) => Some(Value::Int(*value)),
        ExprKind::Bool(value) => Some(Value::Bool(*value)),
        ExprKind::Var(name) => ctx.get(name),
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => match eval(ast, *operand, ctx)? {
            Value::Bool(value) => Some(Value::Bool(!value)),
            Value::Int(_) => None,
        },
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs = eval(ast, *lhs, ctx)?;
            let rhs = eval(ast, *rhs, ctx)?;
            match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Lt => {
                    let (Value::Int(l), Value::Int(r)) = (lhs, rhs) else {
                        return None;
                    };
                    match op {
                        BinaryOp::Add => Some(Value::Int(l.wrapping_add(r))),
                        BinaryOp::Sub => Some(Value::Int(l.wrapping_sub(r))),
                        BinaryOp::Mul => Some(Value::Int(l.wrapping_mul(r))),
                        // A zero divisor simply never folds.
                        BinaryOp::Div => l.checked_div(r).map(Value::Int),
                        BinaryOp::Lt => Some(Value::Bool(l < r)),
                        BinaryOp::And => unreachable!(),
                    }
                }
                BinaryOp::And => {
                    let (Value::Bool(l), Value::Bool(r)) = (lhs, rhs) else {
                        return None;
                    };
                    Some(Value::Bool(l && r))
                }
            }
        }
        _ => None,
    }
}
