//! Statement and declaration AST nodes

use super::{Expr, OverloadOp, TypeExpr};
use crate::common::Span;

/// A braced block of statements
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

/// A statement
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement: foo();
    Expr(Expr),

    /// Assignment: target = value;
    Assign { target: Expr, value: Expr },

    /// Variable declaration: `var x = e;`, `const x = e;`, `int:x = e;`
    Var {
        name: String,
        ty: Option<TypeExpr>,
        value: Expr,
        is_const: bool,
    },

    /// return; / return e;
    Return(Option<Expr>),

    /// if (c) { } else { }; `else if` nests an `If` inside the else block
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    /// while (c) { }
    While { condition: Expr, body: Block },
    /// do { } while (c);
    DoWhile { body: Block, condition: Expr },
    /// for (init; cond; step) { }
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Block,
    },
    Break,
    Continue,

    /// Function declaration
    Func(FuncDecl),
    /// Struct declaration
    Object(ObjectDecl),
    /// Operator overload declaration
    Operator(OperatorDecl),

    /// switchtype (e) { case T { } ... }
    SwitchType { expr: Expr, cases: Vec<SwitchCase> },

    Import(ImportDecl),
    /// export name;
    Export { name: String },
}

/// A typed parameter: `int:x`
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Function (or method/constructor) declaration
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub return_type: Option<TypeExpr>,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// Data member of an object: `[final] [private] T:name;`
#[derive(Debug, Clone)]
pub struct ObjectMember {
    pub name: String,
    pub ty: TypeExpr,
    pub is_final: bool,
    pub is_private: bool,
    pub span: Span,
}

/// Method of an object: `[private] func [T:]name(...) { }`
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub func: FuncDecl,
    pub is_private: bool,
}

/// `object Name { members; new(...) { } methods }`
#[derive(Debug, Clone)]
pub struct ObjectDecl {
    pub name: String,
    pub members: Vec<ObjectMember>,
    /// Constructor, named `new` with no return type
    pub constructor: Option<FuncDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

/// `operator (T:a OP U:b) R { }`
#[derive(Debug, Clone)]
pub struct OperatorDecl {
    pub op: OverloadOp,
    pub left: Param,
    pub right: Param,
    pub return_type: TypeExpr,
    pub body: Block,
    pub span: Span,
}

/// `case T { }`
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub ty: TypeExpr,
    pub body: Block,
    pub span: Span,
}

/// `import a.b [as c];` or `from a.b import x, y;`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: Vec<String>,
    pub alias: Option<String>,
    /// Names pulled in by `from ... import`; empty for a plain import
    pub members: Vec<String>,
    pub span: Span,
}

impl ImportDecl {
    /// Name the module is bound to by a plain `import`
    pub fn binding(&self) -> &str {
        self.alias
            .as_deref()
            .or_else(|| self.path.last().map(String::as_str))
            .unwrap_or_default()
    }
}
