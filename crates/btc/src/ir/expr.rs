//! Typed-IR expressions

use crate::common::{ContextId, Span};
use crate::frontend::ast::{BinOp, UnaryOp};
use crate::types::Type;

/// Expression node. `ty` is filled in by the checker.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span, ty: None }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
    Symbol(Symbol),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        /// Assigned name of the overload implementing this operation
        overload: Option<String>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        base: Box<Expr>,
        member: String,
        /// Set when `member` names a method rather than a data member
        is_method: bool,
    },
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
        overload: Option<String>,
    },
    New {
        target: Type,
        args: Vec<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        target: Type,
    },
    Tuple(Vec<Expr>),
}

/// A resolved reference to a named binding
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub assigned_name: String,
    /// Context that declares the binding
    pub ref_context: ContextId,
    pub is_func: bool,
}

impl Expr {
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Root binding reached through member and subscript bases. A call
    /// result is an effect boundary and has no root.
    pub fn root_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Symbol(symbol) => Some(symbol),
            ExprKind::Member { base, .. } | ExprKind::Subscript { base, .. } => base.root_symbol(),
            _ => None,
        }
    }
}
