//! Arena-backed syntax tree
//!
//! Expressions and statements are stored in flat arenas and addressed by
//! stable ids. Declarations (imports, class, fields, methods) form a small
//! owned tree on top; method bodies reference statements by id.

use crate::span::Span;

/// Index of an expression node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a statement node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(pub u32);

impl StmtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical not (!)
    Not,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Less-than comparison (<)
    Lt,
    /// Logical and (&&)
    And,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::And => "&&",
        };
        write!(f, "{}", s)
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Parenthesized expression, transparent for typing and folding
    Paren(ExprId),
    /// `array[index]`
    ArrayIndex { array: ExprId, index: ExprId },
    /// `callee.name(args...)`
    Call {
        callee: ExprId,
        name: String,
        args: Vec<ExprId>,
    },
    /// `object.name` (only `length` on arrays is meaningful)
    Property { object: ExprId, name: String },
    Unary { op: UnaryOp, operand: ExprId },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `new int[size]`
    NewArray { size: ExprId },
    /// `new Class()`
    NewObject { class: String },
    Int(i32),
    Bool(bool),
    This,
    Var(String),
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct StmtNode {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Expr(ExprId),
    /// `name = value;`
    Assign { name: String, value: ExprId },
    /// `name[index] = value;`
    ArrayAssign {
        name: String,
        index: ExprId,
        value: ExprId,
    },
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While { cond: ExprId, body: StmtId },
}

/// A type written in source, resolved by name during analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub is_array: bool,
    pub span: Span,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, is_array: bool, span: Span) -> Self {
        TypeRef {
            name: name.into(),
            is_array,
            span,
        }
    }
}

/// A field, parameter, or local-variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: TypeRef,
    pub name: String,
    pub span: Span,
}

/// An `import a.b.C;` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: Vec<String>,
    pub span: Span,
}

/// A method declaration.
///
/// The distinguished main method carries no return type node (it is always
/// `void`) and no trailing return expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub is_main: bool,
    pub is_public: bool,
    pub return_type: Option<TypeRef>,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<StmtId>,
    pub return_expr: Option<ExprId>,
    pub span: Span,
}

/// The single class a compilation unit declares.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub super_name: Option<String>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

/// A parsed compilation unit: imports followed by one class.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub imports: Vec<Import>,
    pub class: ClassDecl,
}

impl Default for Program {
    fn default() -> Self {
        Program {
            imports: Vec::new(),
            class: ClassDecl {
                name: String::new(),
                super_name: None,
                fields: Vec::new(),
                methods: Vec::new(),
                span: Span::NONE,
            },
        }
    }
}

/// The whole tree: node arenas plus the declaration structure.
///
/// The parser allocates nodes bottom-up and fills `program` last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    exprs: Vec<ExprNode>,
    stmts: Vec<StmtNode>,
    pub program: Program,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn add_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(ExprNode { kind, span });
        id
    }

    pub fn add_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(StmtNode { kind, span });
        id
    }

    pub fn expr(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &StmtNode {
        &self.stmts[id.index()]
    }

    /// Replace an expression in place, keeping its span.
    pub fn replace_expr(&mut self, id: ExprId, kind: ExprKind) {
        self.exprs[id.index()].kind = kind;
    }

    /// Replace a statement in place, keeping its span.
    pub fn replace_stmt(&mut self, id: StmtId, kind: StmtKind) {
        self.stmts[id.index()].kind = kind;
    }

    /// Clone a whole statement subtree into fresh nodes.
    ///
    /// Used to probe a loop body without disturbing the real tree.
    pub fn clone_stmt_deep(&mut self, id: StmtId) -> StmtId {
        let node = self.stmts[id.index()].clone();
        let kind = match node.kind {
            StmtKind::Block(items) => {
                let items = items
                    .into_iter()
                    .map(|item| self.clone_stmt_deep(item))
                    .collect();
                StmtKind::Block(items)
            }
            StmtKind::Expr(expr) => StmtKind::Expr(self.clone_expr_deep(expr)),
            StmtKind::Assign { name, value } => StmtKind::Assign {
                name,
                value: self.clone_expr_deep(value),
            },
            StmtKind::ArrayAssign { name, index, value } => StmtKind::ArrayAssign {
                name,
                index: self.clone_expr_deep(index),
                value: self.clone_expr_deep(value),
            },
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.clone_expr_deep(cond),
                then_branch: self.clone_stmt_deep(then_branch),
                else_branch: else_branch.map(|branch| self.clone_stmt_deep(branch)),
            },
            StmtKind::While { cond, body } => StmtKind::While {
                cond: self.clone_expr_deep(cond),
                body: self.clone_stmt_deep(body),
            },
        };
        self.add_stmt(kind, node.span)
    }

    /// Clone a whole expression subtree into fresh nodes.
    pub fn clone_expr_deep(&mut self, id: ExprId) -> ExprId {
        let node = self.exprs[id.index()].clone();
        let kind = match node.kind {
            ExprKind::Paren(inner) => ExprKind::Paren(self.clone_expr_deep(inner)),
            ExprKind::ArrayIndex { array, index } => ExprKind::ArrayIndex {
                array: self.clone_expr_deep(array),
                index: self.clone_expr_deep(index),
            },
            ExprKind::Call { callee, name, args } => ExprKind::Call {
                callee: self.clone_expr_deep(callee),
                name,
                args: args
                    .into_iter()
                    .map(|arg| self.clone_expr_deep(arg))
                    .collect(),
            },
            ExprKind::Property { object, name } => ExprKind::Property {
                object: self.clone_expr_deep(object),
                name,
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: self.clone_expr_deep(operand),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.clone_expr_deep(lhs),
                rhs: self.clone_expr_deep(rhs),
            },
            ExprKind::NewArray { size } => ExprKind::NewArray {
                size: self.clone_expr_deep(size),
            },
            kind @ (ExprKind::NewObject { .. }
            | ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::This
            | ExprKind::Var(_)) => kind,
        };
        self.add_expr(kind, node.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_ids_are_stable() {
        let mut ast = Ast::new();
        let one = ast.add_expr(ExprKind::Int(1), Span::NONE);
        let two = ast.add_expr(ExprKind::Int(2), Span::NONE);
        let sum = ast.add_expr(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: one,
                rhs: two,
            },
            Span::NONE,
        );

        assert_eq!(ast.expr(one).kind, ExprKind::Int(1));
        assert_eq!(ast.expr(two).kind, ExprKind::Int(2));
        assert!(matches!(ast.expr(sum).kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_replace_keeps_span() {
        let mut ast = Ast::new();
        let span = Span::new(3, 7);
        let id = ast.add_expr(ExprKind::Var("x".to_string()), span);

        ast.replace_expr(id, ExprKind::Int(42));

        assert_eq!(ast.expr(id).kind, ExprKind::Int(42));
        assert_eq!(ast.expr(id).span, span);
    }

    #[test]
    fn test_clone_stmt_deep_is_independent() {
        let mut ast = Ast::new();
        let value = ast.add_expr(ExprKind::Int(1), Span::NONE);
        let assign = ast.add_stmt(
            StmtKind::Assign {
                name: "x".to_string(),
                value,
            },
            Span::NONE,
        );
        let block = ast.add_stmt(StmtKind::Block(vec![assign]), Span::NONE);

        let copy = ast.clone_stmt_deep(block);
        assert_ne!(copy, block);

        // Mutating the copy leaves the original untouched.
        let StmtKind::Block(items) = ast.stmt(copy).kind.clone() else {
            panic!("clone changed the statement kind");
        };
        let StmtKind::Assign { value: copied, .. } = ast.stmt(items[0]).kind.clone() else {
            panic!("clone changed the statement kind");
        };
        assert_ne!(copied, value);
        ast.replace_expr(copied, ExprKind::Int(99));
        assert_eq!(ast.expr(value).kind, ExprKind::Int(1));
    }
}
