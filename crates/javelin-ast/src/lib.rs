//! Javelin abstract syntax tree
//!
//! The contract between the external parser and the compilation pipeline.
//! Nodes live in index-addressed arenas so that later stages can decorate
//! and replace them without aliasing the tree.

mod ast;
mod span;

pub use ast::{
    Ast, BinaryOp, ClassDecl, ExprId, ExprKind, ExprNode, Import, MethodDecl, Program, StmtId,
    StmtKind, StmtNode, TypeRef, UnaryOp, VarDecl,
};
pub use span::Span;
