//! Type checking pass
//!
//! A second top-down traversal that attaches a type to every expression
//! and validates every statement against the symbol table. Failure paths
//! still record a best-effort type, or none at all, so one error does not
//! cascade into its parents: an absent type means "already reported".

use crate::report::Report;
use crate::symbol_table::{MethodId, SymbolTable};
use crate::SemanticError;
use javelin_ast::{Ast, BinaryOp, ExprId, ExprKind, MethodDecl, Span, StmtId, StmtKind, UnaryOp};
use javelin_types::Type;
use rustc_hash::FxHashMap;

/// Types inferred for AST nodes, keyed by node identity.
///
/// A missing entry means an error was already reported for that node and
/// dependent checks were skipped.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    exprs: FxHashMap<ExprId, Type>,
    stmts: FxHashMap<StmtId, Type>,
}

impl TypeMap {
    pub fn expr(&self, id: ExprId) -> Option<&Type> {
        self.exprs.get(&id)
    }

    pub fn set_expr(&mut self, id: ExprId, ty: Type) {
        self.exprs.insert(id, ty);
    }

    pub fn stmt(&self, id: StmtId) -> Option<&Type> {
        self.stmts.get(&id)
    }

    pub fn set_stmt(&mut self, id: StmtId, ty: Type) {
        self.stmts.insert(id, ty);
    }
}

/// Type-check the program against its symbol table.
pub fn check(ast: &Ast, table: &SymbolTable) -> (TypeMap, Vec<Report>) {
    let mut checker = Checker {
        ast,
        table,
        types: TypeMap::default(),
        reports: Vec::new(),
    };
    for decl in &ast.program.class.methods {
        checker.check_method(decl);
    }
    (checker.types, checker.reports)
}

struct Checker<'a> {
    ast: &'a Ast,
    table: &'a SymbolTable,
    types: TypeMap,
    reports: Vec<Report>,
}

impl<'a> Checker<'a> {
    fn report(&mut self, error: SemanticError, span: Span) {
        self.reports.push(error.into_report(span));
    }

    fn report_all(&mut self, errors: Vec<SemanticError>, span: Span) {
        for error in errors {
            self.report(error, span);
        }
    }

    fn check_method(&mut self, decl: &MethodDecl) {
        if decl.is_main {
            if decl.name != "main" {
                self.report(SemanticError::BadMainMethodName, decl.span);
                return;
            }
            let args_ok = decl.params.len() == 1
                && decl.params[0].ty.is_array
                && decl.params[0].ty.name == "String";
            if !args_ok {
                self.report(SemanticError::BadMainMethodArguments, decl.span);
                return;
            }
        }

        let Some((id, _)) = self.table.method_by_name(&decl.name) else {
            return;
        };

        for &stmt in &decl.body {
            self.check_stmt(stmt, id);
        }

        if let Some(ret) = decl.return_expr {
            self.check_expr(ret, id);
            let source = self.types.expr(ret).cloned();
            let target = self.table.method(id).return_type().clone();
            if let Err(errors) = self.try_to_assign(source.as_ref(), &target, true) {
                let span = self.ast.expr(ret).span;
                self.report_all(errors, span);
            }
        }
    }

    fn check_stmt(&mut self, id: StmtId, method: MethodId) {
        let ast = self.ast;
        let node = ast.stmt(id);
        match &node.kind {
            StmtKind::Block(items) => {
                for &item in items {
                    self.check_stmt(item, method);
                }
            }
            StmtKind::Expr(expr) => self.check_expr(*expr, method),
            StmtKind::Assign { name, value } => {
                self.check_expr(*value, method);

                let target = match self.resolve_variable(method, name, false) {
                    Ok(target) => target,
                    Err(errors) => {
                        self.report_all(errors, node.span);
                        return;
                    }
                };

                let source = self.types.expr(*value).cloned();
                match self.try_to_assign(source.as_ref(), &target, true) {
                    Ok(ty) => self.types.set_stmt(id, ty),
                    Err(errors) => self.report_all(errors, ast.expr(*value).span),
                }
            }
            StmtKind::ArrayAssign { name, index, value } => {
                self.check_expr(*index, method);
                self.check_expr(*value, method);

                let target = match self.resolve_variable(method, name, false) {
                    Ok(target) => target,
                    Err(errors) => {
                        self.report_all(errors, node.span);
                        return;
                    }
                };
                let Type::Array(element) = target else {
                    self.report(SemanticError::incompatible_with("array", &target), node.span);
                    return;
                };

                let index_ty = self.types.expr(*index).cloned();
                if let Err(errors) = self.try_to_assign(index_ty.as_ref(), &Type::Int, false) {
                    self.report_all(errors, ast.expr(*index).span);
                    return;
                }

                let source = self.types.expr(*value).cloned();
                match self.try_to_assign(source.as_ref(), &element, true) {
                    Ok(ty) => self.types.set_stmt(id, ty),
                    Err(errors) => self.report_all(errors, ast.expr(*value).span),
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(*cond, method);
                self.check_stmt(*then_branch, method);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(*else_branch, method);
                }
                self.check_condition(id, *cond);
            }
            StmtKind::While { cond, body } => {
                self.check_expr(*cond, method);
                self.check_stmt(*body, method);
                self.check_condition(id, *cond);
            }
        }
    }

    fn check_condition(&mut self, stmt: StmtId, cond: ExprId) {
        let ty = self.types.expr(cond).cloned();
        match self.try_to_assign(ty.as_ref(), &Type::Boolean, false) {
            Ok(ty) => self.types.set_stmt(stmt, ty),
            Err(errors) => {
                let span = self.ast.stmt(stmt).span;
                self.report_all(errors, span);
            }
        }
    }

    fn check_expr(&mut self, id: ExprId, method: MethodId) {
        let ast = self.ast;
        let node = ast.expr(id);
        match &node.kind {
            ExprKind::Paren(inner) => {
                self.check_expr(*inner, method);
                if let Some(ty) = self.types.expr(*inner).cloned() {
                    self.types.set_expr(id, ty);
                }
            }
            ExprKind::ArrayIndex { array, index } => {
                self.check_expr(*array, method);
                self.check_expr(*index, method);

                let Some(array_ty) = self.types.expr(*array).cloned() else {
                    return;
                };
                let Type::Array(element) = array_ty else {
                    self.report(
                        SemanticError::incompatible_with("array", &array_ty),
                        ast.expr(*array).span,
                    );
                    return;
                };

                let index_ty = self.types.expr(*index).cloned();
                match self.try_to_assign(index_ty.as_ref(), &Type::Int, false) {
                    Ok(_) => self.types.set_expr(id, *element),
                    Err(errors) => self.report_all(errors, ast.expr(*index).span),
                }
            }
            ExprKind::Call { callee, name, args } => {
                self.check_call(id, node.span, *callee, name, args, method);
            }
            ExprKind::Property { object, name } => {
                self.check_expr(*object, method);

                let Some(object_ty) = self.types.expr(*object).cloned() else {
                    return;
                };
                if !matches!(object_ty, Type::Array(_)) {
                    self.report(
                        SemanticError::incompatible_with("array", &object_ty),
                        ast.expr(*object).span,
                    );
                    return;
                }
                if name != "length" {
                    self.report(
                        SemanticError::SymbolNotFound(format!("{}#{}", object_ty, name)),
                        node.span,
                    );
                    return;
                }
                self.types.set_expr(id, Type::Int);
            }
            ExprKind::Unary { op, operand } => {
                self.check_expr(*operand, method);
                let (operand_ty, result) = unary_signature(*op);
                self.check_operands(id, node.span, &operand_ty, result, &[*operand]);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_expr(*lhs, method);
                self.check_expr(*rhs, method);
                let (operand_ty, result) = binary_signature(*op);
                self.check_operands(id, node.span, &operand_ty, result, &[*lhs, *rhs]);
            }
            ExprKind::NewArray { size } => {
                self.check_expr(*size, method);
                let size_ty = self.types.expr(*size).cloned();
                match self.try_to_assign(size_ty.as_ref(), &Type::Int, false) {
                    Ok(_) => self.types.set_expr(id, Type::array_of(Type::Int)),
                    Err(errors) => self.report_all(errors, node.span),
                }
            }
            ExprKind::NewObject { class } => match self.table.class_in_scope(class) {
                Some(class) => self.types.set_expr(id, Type::Class(class)),
                None => self.report(SemanticError::SymbolNotFound(class.clone()), node.span),
            },
            ExprKind::Int(_) => self.types.set_expr(id, Type::Int),
            ExprKind::Bool(_) => self.types.set_expr(id, Type::Boolean),
            ExprKind::This => {
                if self.table.method(method).is_static() {
                    self.report(SemanticError::ThisInStaticContext, node.span);
                    return;
                }
                self.types
                    .set_expr(id, Type::Class(self.table.this_class().clone()));
            }
            ExprKind::Var(name) => match self.resolve_variable(method, name, true) {
                Ok(ty) => self.types.set_expr(id, ty),
                Err(errors) => self.report_all(errors, node.span),
            },
        }
    }

    /// Operand checking shared by unary and binary operators: every operand
    /// is reported independently, and the result type is only attached when
    /// all of them fit the signature.
    fn check_operands(
        &mut self,
        id: ExprId,
        span: Span,
        operand_ty: &Type,
        result: Type,
        operands: &[ExprId],
    ) {
        let mut all_valid = true;
        for &operand in operands {
            let ty = self.types.expr(operand).cloned();
            if let Err(errors) = self.try_to_assign(ty.as_ref(), operand_ty, false) {
                self.report_all(errors, span);
                all_valid = false;
            }
        }
        if all_valid {
            self.types.set_expr(id, result);
        }
    }

    fn check_call(
        &mut self,
        id: ExprId,
        span: Span,
        callee: ExprId,
        name: &str,
        args: &[ExprId],
        method: MethodId,
    ) {
        let ast = self.ast;
        self.check_expr(callee, method);
        for &arg in args {
            self.check_expr(arg, method);
        }

        let Some(callee_ty) = self.types.expr(callee).cloned() else {
            return;
        };
        let (accessed, is_static_access) = match callee_ty {
            Type::Class(class) => (class, false),
            Type::StaticRef(class) => (class, true),
            other => {
                self.report(
                    SemanticError::incompatible_with("object or static reference", &other),
                    ast.expr(callee).span,
                );
                return;
            }
        };

        // A class without a statically known structure is external: accept
        // the call, type it Unknown, and skip signature checking.
        let mut resolved = None;
        let return_type = if !accessed.has_known_structure() {
            Some(Type::Unknown)
        } else if accessed == *self.table.this_class() {
            self.table.method_by_name(name).map(|(target_id, target)| {
                resolved = Some(target_id);
                target.return_type().clone()
            })
        } else {
            None
        };

        let Some(return_type) = return_type else {
            self.report(
                SemanticError::SymbolNotFound(format!("{}#{}", accessed.simple_name(), name)),
                span,
            );
            return;
        };

        self.types.set_expr(id, return_type);
        let Some(target_id) = resolved else {
            return;
        };
        let target = self.table.method(target_id);

        // Static/instance mismatch, arity, and per-argument assignability
        // are reported independently.
        if !target.is_static() && is_static_access {
            self.report(
                SemanticError::InstanceMethodInStaticContext(name.to_string()),
                span,
            );
        }

        let expected = target.params().len();
        if args.len() != expected {
            self.report(
                SemanticError::WrongArgumentCount {
                    expected,
                    found: args.len(),
                },
                span,
            );
        }

        let param_types: Vec<Type> = target
            .params()
            .iter()
            .take(args.len())
            .map(|param| param.ty.clone())
            .collect();
        for (index, param_ty) in param_types.iter().enumerate() {
            let arg = args[index];
            if let Some(arg_ty) = self.types.expr(arg).cloned() {
                if !arg_ty.is_assignable_to(param_ty) {
                    self.report(
                        SemanticError::incompatible(param_ty, &arg_ty),
                        ast.expr(arg).span,
                    );
                }
            }
        }
    }

    /// Resolution order: method locals, then parameters, then (in instance
    /// context) fields, then, only where permitted, class names in scope as
    /// a static reference.
    fn resolve_variable(
        &self,
        method: MethodId,
        name: &str,
        allow_static_ref: bool,
    ) -> Result<Type, Vec<SemanticError>> {
        let method = self.table.method(method);
        if let Some(symbol) = method
            .local_by_name(name)
            .or_else(|| method.param_by_name(name))
        {
            return Ok(symbol.ty.clone());
        }

        if let Some(field) = self.table.field_by_name(name) {
            if method.is_static() {
                return Err(vec![SemanticError::InstanceFieldInStaticContext(
                    name.to_string(),
                )]);
            }
            return Ok(field.ty.clone());
        }

        if allow_static_ref {
            if let Some(class) = self.table.class_in_scope(name) {
                return Ok(Type::StaticRef(class));
            }
        }

        Err(vec![SemanticError::SymbolNotFound(name.to_string())])
    }

    /// The single assignability rule used by assignments, conditions, and
    /// arguments. A `None` source means the error is already reported.
    fn try_to_assign(
        &self,
        source: Option<&Type>,
        target: &Type,
        allow_unknown_source: bool,
    ) -> Result<Type, Vec<SemanticError>> {
        let Some(source) = source else {
            return Err(Vec::new());
        };
        if (allow_unknown_source && source.is_unknown()) || source.is_assignable_to(target) {
            Ok(target.clone())
        } else {
            Err(vec![SemanticError::incompatible(target, source)])
        }
    }
}

fn unary_signature(op: UnaryOp) -> (Type, Type) {
    match op {
        UnaryOp::Not => (Type::Boolean, Type::Boolean),
    }
}

fn binary_signature(op: BinaryOp) -> (Type, Type) {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => (Type::Int, Type::Int),
        BinaryOp::Lt => (Type::Int, Type::Boolean),
        BinaryOp::And => (Type::Boolean, Type::Boolean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use javelin_ast::{ClassDecl, Import, Program, TypeRef, VarDecl};

    struct Builder {
        ast: Ast,
    }

    impl Builder {
        fn new() -> Self {
            Builder { ast: Ast::new() }
        }

        fn expr(&mut self, kind: ExprKind) -> ExprId {
            self.ast.add_expr(kind, Span::new(1, 1))
        }

        fn stmt(&mut self, kind: StmtKind) -> StmtId {
            self.ast.add_stmt(kind, Span::new(1, 1))
        }

        fn var(ty: &str, is_array: bool, name: &str) -> VarDecl {
            VarDecl {
                ty: TypeRef::new(ty, is_array, Span::NONE),
                name: name.to_string(),
                span: Span::NONE,
            }
        }

        fn method(
            name: &str,
            return_type: &str,
            params: Vec<VarDecl>,
            locals: Vec<VarDecl>,
            body: Vec<StmtId>,
            return_expr: Option<ExprId>,
        ) -> MethodDecl {
            MethodDecl {
                name: name.to_string(),
                is_main: false,
                is_public: true,
                return_type: Some(TypeRef::new(return_type, false, Span::NONE)),
                params,
                locals,
                body,
                return_expr,
                span: Span::NONE,
            }
        }

        fn finish(mut self, methods: Vec<MethodDecl>, fields: Vec<VarDecl>) -> Ast {
            self.ast.program = Program {
                imports: Vec::new(),
                class: ClassDecl {
                    name: "Test".to_string(),
                    super_name: None,
                    fields,
                    methods,
                    span: Span::NONE,
                },
            };
            self.ast
        }
    }

    fn errors_of(reports: &[Report]) -> Vec<String> {
        reports
            .iter()
            .filter(|report| report.is_error())
            .map(|report| report.message.clone())
            .collect()
    }

    #[test]
    fn test_arithmetic_types() {
        let mut b = Builder::new();
        let two = b.expr(ExprKind::Int(2));
        let three = b.expr(ExprKind::Int(3));
        let sum = b.expr(ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: two,
            rhs: three,
        });
        let method = Builder::method("m", "int", Vec::new(), Vec::new(), Vec::new(), Some(sum));
        let ast = b.finish(vec![method], Vec::new());

        let (_, types, reports) = analyze(&ast);
        assert!(errors_of(&reports).is_empty());
        assert_eq!(types.expr(sum), Some(&Type::Int));
    }

    #[test]
    fn test_operand_mismatch_reports_but_siblings_survive() {
        let mut b = Builder::new();
        let truthy = b.expr(ExprKind::Bool(true));
        let one = b.expr(ExprKind::Int(1));
        let sum = b.expr(ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: truthy,
            rhs: one,
        });
        let method = Builder::method("m", "int", Vec::new(), Vec::new(), Vec::new(), Some(sum));
        let ast = b.finish(vec![method], Vec::new());

        let (_, types, reports) = analyze(&ast);
        // The malformed operand is reported and the node stays untyped; the
        // untyped return then fails silently (no cascade).
        assert_eq!(
            errors_of(&reports),
            vec!["Expected `int`, found `boolean`".to_string()]
        );
        assert_eq!(types.expr(sum), None);
        assert_eq!(types.expr(one), Some(&Type::Int));
    }

    #[test]
    fn test_undeclared_assignment_is_single_fatal() {
        let mut b = Builder::new();
        let one = b.expr(ExprKind::Int(1));
        let assign = b.stmt(StmtKind::Assign {
            name: "x".to_string(),
            value: one,
        });
        let ret = b.expr(ExprKind::Int(0));
        let method = Builder::method("m", "int", Vec::new(), Vec::new(), vec![assign], Some(ret));
        let ast = b.finish(vec![method], Vec::new());

        let (_, types, reports) = analyze(&ast);
        assert_eq!(
            errors_of(&reports),
            vec!["Could not find symbol `x`".to_string()]
        );
        assert_eq!(types.stmt(assign), None);
    }

    #[test]
    fn test_static_context_rejects_fields_and_this() {
        let mut b = Builder::new();
        let read = b.expr(ExprKind::Var("count".to_string()));
        let assign = b.stmt(StmtKind::Assign {
            name: "dummy".to_string(),
            value: read,
        });
        let this = b.expr(ExprKind::This);
        let use_this = b.stmt(StmtKind::Expr(this));

        let main = MethodDecl {
            name: "main".to_string(),
            is_main: true,
            is_public: true,
            return_type: None,
            params: vec![Builder::var("String", true, "args")],
            locals: vec![Builder::var("int", false, "dummy")],
            body: vec![assign, use_this],
            return_expr: None,
            span: Span::NONE,
        };
        let ast = b.finish(vec![main], vec![Builder::var("int", false, "count")]);

        let (_, _, reports) = analyze(&ast);
        let errors = errors_of(&reports);
        assert!(errors
            .iter()
            .any(|m| m.contains("`count` cannot be referenced in a static context")));
        assert!(errors
            .iter()
            .any(|m| m.contains("`this` cannot be referenced in a static context")));
    }

    #[test]
    fn test_known_call_checks_arity_and_arguments() {
        let mut b = Builder::new();
        let this = b.expr(ExprKind::This);
        let flag = b.expr(ExprKind::Bool(false));
        let call = b.expr(ExprKind::Call {
            callee: this,
            name: "helper".to_string(),
            args: vec![flag],
        });
        let caller = Builder::method("m", "int", Vec::new(), Vec::new(), Vec::new(), Some(call));

        let helper_ret = b.expr(ExprKind::Int(0));
        let helper = Builder::method(
            "helper",
            "int",
            vec![Builder::var("int", false, "a"), Builder::var("int", false, "b")],
            Vec::new(),
            Vec::new(),
            Some(helper_ret),
        );
        let ast = b.finish(vec![caller, helper], Vec::new());

        let (_, types, reports) = analyze(&ast);
        let errors = errors_of(&reports);
        assert!(errors
            .iter()
            .any(|m| m.contains("expected `2` but found `1`")));
        assert!(errors
            .iter()
            .any(|m| m.contains("Expected `int`, found `boolean`")));
        // The call still carries the callee's declared return type.
        assert_eq!(types.expr(call), Some(&Type::Int));
    }

    #[test]
    fn test_external_call_is_permissive() {
        let mut b = Builder::new();
        let io = b.expr(ExprKind::Var("io".to_string()));
        let arg = b.expr(ExprKind::Int(1));
        let call = b.expr(ExprKind::Call {
            callee: io,
            name: "println".to_string(),
            args: vec![arg],
        });
        let body = b.stmt(StmtKind::Expr(call));
        let ret = b.expr(ExprKind::Int(0));
        let method = Builder::method("m", "int", Vec::new(), Vec::new(), vec![body], Some(ret));

        let mut ast = b.finish(vec![method], Vec::new());
        ast.program.imports.push(Import {
            path: vec!["io".to_string()],
            span: Span::NONE,
        });

        let (_, types, reports) = analyze(&ast);
        assert!(errors_of(&reports).is_empty());
        assert_eq!(types.expr(call), Some(&Type::Unknown));
        assert!(matches!(types.expr(io), Some(Type::StaticRef(_))));
    }

    #[test]
    fn test_array_rules() {
        let mut b = Builder::new();
        let arr = b.expr(ExprKind::Var("data".to_string()));
        let idx = b.expr(ExprKind::Bool(true));
        let read = b.expr(ExprKind::ArrayIndex {
            array: arr,
            index: idx,
        });
        let first = b.stmt(StmtKind::Expr(read));

        let arr2 = b.expr(ExprKind::Var("data".to_string()));
        let len = b.expr(ExprKind::Property {
            object: arr2,
            name: "size".to_string(),
        });
        let second = b.stmt(StmtKind::Expr(len));

        let ret = b.expr(ExprKind::Int(0));
        let method = Builder::method(
            "m",
            "int",
            Vec::new(),
            vec![Builder::var("int", true, "data")],
            vec![first, second],
            Some(ret),
        );
        let ast = b.finish(vec![method], Vec::new());

        let (_, types, reports) = analyze(&ast);
        let errors = errors_of(&reports);
        assert!(errors.iter().any(|m| m.contains("Expected `int`, found `boolean`")));
        assert!(errors.iter().any(|m| m.contains("Could not find symbol `int[]#size`")));
        assert_eq!(types.expr(read), None);
    }

    #[test]
    fn test_while_condition_must_be_boolean() {
        let mut b = Builder::new();
        let cond = b.expr(ExprKind::Int(1));
        let body = b.stmt(StmtKind::Block(Vec::new()));
        let while_stmt = b.stmt(StmtKind::While { cond, body });
        let ret = b.expr(ExprKind::Int(0));
        let method = Builder::method("m", "int", Vec::new(), Vec::new(), vec![while_stmt], Some(ret));
        let ast = b.finish(vec![method], Vec::new());

        let (_, _, reports) = analyze(&ast);
        assert_eq!(
            errors_of(&reports),
            vec!["Expected `boolean`, found `int`".to_string()]
        );
    }

    #[test]
    fn test_subclass_argument_is_accepted() {
        let mut b = Builder::new();
        let obj = b.expr(ExprKind::NewObject {
            class: "Test".to_string(),
        });
        let assign = b.stmt(StmtKind::Assign {
            name: "o".to_string(),
            value: obj,
        });
        let ret = b.expr(ExprKind::Int(0));
        let method = Builder::method(
            "m",
            "int",
            Vec::new(),
            vec![Builder::var("Object", false, "o")],
            vec![assign],
            Some(ret),
        );
        let ast = b.finish(vec![method], Vec::new());

        let (_, types, reports) = analyze(&ast);
        assert!(errors_of(&reports).is_empty());
        // The assignment carries the declared (target) type.
        assert!(matches!(types.stmt(assign), Some(Type::Class(c)) if c.simple_name() == "Object"));
    }
}
