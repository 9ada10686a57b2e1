//! Typed intermediate representation
//!
//! The lowering pass produces this tree from the AST; every name reference
//! is already resolved to the context that declares it, and the checker
//! fills in expression types. Code generators read it together with the
//! context tree and the type table.

mod expr;
mod stmt;

pub use expr::{Expr, ExprKind, Symbol};
pub use stmt::{
    functions_mut, ExportNode, FunctionNode, ImportBinding, ImportNode, ObjectNode, OperatorNode,
    ParamNode, Stmt, StmtKind, SwitchCase,
};

use crate::common::{ContextId, Span};

/// Lowered and checked module
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub root: ContextId,
    pub body: Vec<Stmt>,
    pub span: Span,
}
