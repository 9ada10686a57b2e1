//! Expression AST nodes

use super::TypeExpr;
use crate::common::Span;
use std::fmt;

/// An expression
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal: 42, 0xFF
    IntLiteral(i64),
    /// Float literal: 3.14
    FloatLiteral(f64),
    /// Boolean literal: true, false
    BoolLiteral(bool),
    /// String literal: "hello"
    StringLiteral(String),
    /// null
    Null,

    /// Identifier: x, foo, self
    Identifier(String),

    /// Binary operation: a + b
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation: -x, !x, ~x
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Call: foo(x, y), obj.method(x)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Member access: x.field
    Member {
        base: Box<Expr>,
        member: String,
    },
    /// Subscript: array[i]
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    /// Instantiation: new Point(1, 2), new array<int>(8)
    New {
        ty: TypeExpr,
        args: Vec<Expr>,
    },
    /// Type cast: x as float
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    /// Tuple literal: [: 1, 2.0]
    Tuple(Vec<Expr>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Logical
    And,
    Or,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Checking family a binary operator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpClass {
    Arithmetic,
    Bitwise,
    Logical,
    Equality,
    Relative,
}

impl BinOp {
    /// Get operator precedence (higher = binds tighter)
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne => 3,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 4,
            BinOp::BitOr => 5,
            BinOp::BitXor => 6,
            BinOp::BitAnd => 7,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 10,
        }
    }

    pub fn class(self) -> BinOpClass {
        match self {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => BinOpClass::Arithmetic,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
                BinOpClass::Bitwise
            }
            BinOp::And | BinOp::Or => BinOpClass::Logical,
            BinOp::Eq | BinOp::Ne => BinOpClass::Equality,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => BinOpClass::Relative,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation: -x
    Neg,
    /// Logical not: !x, not x
    Not,
    /// Bitwise complement: ~x
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::BitNot => write!(f, "~"),
        }
    }
}

/// Operators that may be overloaded with an `operator` declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverloadOp {
    Binary(BinOp),
    /// `base[index]`
    Subscript,
}

impl fmt::Display for OverloadOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverloadOp::Binary(op) => write!(f, "{op}"),
            OverloadOp::Subscript => write!(f, "[]"),
        }
    }
}
