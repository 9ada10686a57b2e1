//! Lowering state: the scope stack and deferred function bodies

use super::context::ScopeKind;
use crate::common::{CompileError, CompileResult, ContextId, FunctionId, ModuleId};
use crate::driver::Environment;
use crate::frontend::ast::FuncDecl;
use crate::ir::{self, OperatorNode};
use crate::types::{Overload, Type};
use std::path::{Path, PathBuf};

/// A function whose body is lowered once its declaring scope is complete
#[derive(Debug, Clone)]
pub struct PendingFunction {
    pub id: FunctionId,
    pub decl: FuncDecl,
    pub kind: ScopeKind,
    /// Type of the implicit `self` parameter of methods and constructors
    pub self_type: Option<Type>,
}

struct Scope {
    context: ContextId,
    pending: Vec<PendingFunction>,
}

/// Walks one module's AST, populating contexts as it goes
pub struct Builder<'e> {
    pub(crate) env: &'e mut Environment,
    module: ModuleId,
    path: PathBuf,
    root: ContextId,
    scopes: Vec<Scope>,
}

impl<'e> Builder<'e> {
    pub fn new(env: &'e mut Environment, module: ModuleId) -> Self {
        let info = env.module(module);
        let root = info.root;
        let path = info.path.clone();
        Self {
            env,
            module,
            path,
            root,
            scopes: vec![Scope {
                context: root,
                pending: Vec::new(),
            }],
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ==================== Scopes ====================

    /// Enter a fresh child of the current context
    pub fn push_scope(&mut self, kind: ScopeKind, function: Option<FunctionId>) -> ContextId {
        let parent = self.current_scope();
        let context = self.env.contexts.create(Some(parent), kind);
        self.env.contexts.get_mut(context).function = function;
        self.scopes.push(Scope {
            context,
            pending: Vec::new(),
        });
        context
    }

    pub fn pop_scope(&mut self) -> CompileResult<ContextId> {
        if self.scopes.len() == 1 {
            return Err(CompileError::reference("cannot leave the module scope"));
        }
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| CompileError::reference("scope stack is empty"))?;
        if let Some(pending) = scope.pending.first() {
            return Err(CompileError::reference(format!(
                "body of {} was never lowered",
                pending.decl.name
            )));
        }
        Ok(scope.context)
    }

    pub fn current_scope(&self) -> ContextId {
        self.scopes.last().map_or(self.root, |scope| scope.context)
    }

    pub fn root_scope(&self) -> ContextId {
        self.root
    }

    // ==================== Deferred bodies ====================

    pub fn register_pending_function(&mut self, pending: PendingFunction) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.pending.push(pending);
        }
    }

    /// Lower every body deferred in the current scope and attach it to its
    /// node in `stmts`
    pub fn process_pending_functions(&mut self, stmts: &mut [ir::Stmt]) -> CompileResult<()> {
        let pending = match self.scopes.last_mut() {
            Some(scope) => std::mem::take(&mut scope.pending),
            None => return Ok(()),
        };
        if pending.is_empty() {
            return Ok(());
        }

        let mut nodes = Vec::new();
        ir::functions_mut(stmts, &mut nodes);

        for function in pending {
            let node = nodes
                .iter_mut()
                .find(|node| node.id == function.id)
                .ok_or_else(|| {
                    CompileError::reference(format!("no declaration for {}", function.decl.name))
                })?;
            self.lower_function_body(&function, node)?;
        }
        Ok(())
    }

    // ==================== Operators ====================

    pub fn register_operator_overload(&mut self, node: &OperatorNode) -> CompileResult<()> {
        let left = self.env.types.key(&node.left);
        let right = self.env.types.key(&node.right);
        let return_type = node
            .function
            .return_type()
            .cloned()
            .unwrap_or_else(Type::void);
        self.env.operators.register(
            left,
            right,
            node.op,
            Overload {
                function: node.function.assigned_name.clone(),
                return_type,
            },
        )
    }
}
