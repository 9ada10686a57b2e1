//! BType AST definitions

mod types;
mod expr;
mod stmt;

pub use types::*;
pub use expr::*;
pub use stmt::*;

use crate::common::Span;

/// A complete source file
#[derive(Debug, Clone)]
pub struct Module {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}
