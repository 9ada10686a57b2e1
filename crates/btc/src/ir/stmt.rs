//! Typed-IR statements and declarations

use super::expr::Expr;
use crate::common::{ContextId, FunctionId, ModuleId, Span, StructId};
use crate::frontend::ast::OverloadOp;
use crate::types::Type;

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

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    Assign {
        target: Expr,
        value: Expr,
    },
    Declaration {
        name: String,
        assigned_name: String,
        ty: Type,
        value: Expr,
        is_const: bool,
    },
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Function(FunctionNode),
    Object(ObjectNode),
    Operator(OperatorNode),
    SwitchType {
        expr: Expr,
        cases: Vec<SwitchCase>,
        /// Index of the case whose type equals the switched expression's
        matched: Option<usize>,
    },
    Import(ImportNode),
    Export(ExportNode),
}

/// Function, method, constructor or operator body
#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub id: FunctionId,
    pub name: String,
    pub assigned_name: String,
    pub params: Vec<ParamNode>,
    /// Declared type; methods and constructors include the leading `self`
    pub ty: Type,
    pub body: Vec<Stmt>,
    /// Context of the body, set once the deferred body has been lowered
    pub body_context: Option<ContextId>,
}

impl FunctionNode {
    pub fn return_type(&self) -> Option<&Type> {
        self.ty.as_func().and_then(|(ret, _)| ret)
    }
}

#[derive(Debug, Clone)]
pub struct ParamNode {
    pub name: String,
    pub assigned_name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub struct_id: StructId,
    pub name: String,
    pub assigned_name: String,
    pub constructor: Option<FunctionNode>,
    pub methods: Vec<FunctionNode>,
}

#[derive(Debug, Clone)]
pub struct OperatorNode {
    pub op: OverloadOp,
    pub left: Type,
    pub right: Type,
    pub function: FunctionNode,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub ty: Type,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A binding introduced by an import
#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub name: String,
    pub assigned_name: String,
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub module: ModuleId,
    pub path: Vec<String>,
    pub bindings: Vec<ImportBinding>,
}

#[derive(Debug, Clone)]
pub struct ExportNode {
    pub name: String,
    pub assigned_name: String,
}

/// Visit every function node owned by `stmts` without entering function
/// bodies, which belong to their own scope
pub fn functions_mut<'a>(stmts: &'a mut [Stmt], out: &mut Vec<&'a mut FunctionNode>) {
    for stmt in stmts {
        match &mut stmt.kind {
            StmtKind::Function(function) => out.push(function),
            StmtKind::Object(object) => {
                out.extend(object.constructor.as_mut());
                out.extend(object.methods.iter_mut());
            }
            StmtKind::Operator(operator) => out.push(&mut operator.function),
            StmtKind::If { then_body, else_body, .. } => {
                functions_mut(then_body, out);
                if let Some(else_body) = else_body {
                    functions_mut(else_body, out);
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => functions_mut(body, out),
            StmtKind::For { init, step, body, .. } => {
                if let Some(init) = init {
                    functions_mut(std::slice::from_mut(init.as_mut()), out);
                }
                if let Some(step) = step {
                    functions_mut(std::slice::from_mut(step.as_mut()), out);
                }
                functions_mut(body, out);
            }
            StmtKind::SwitchType { cases, .. } => {
                for case in cases {
                    functions_mut(&mut case.body, out);
                }
            }
            StmtKind::Expr(_)
            | StmtKind::Assign { .. }
            | StmtKind::Declaration { .. }
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Import(_)
            | StmtKind::Export(_) => {}
        }
    }
}
