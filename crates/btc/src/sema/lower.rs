//! AST to typed-IR lowering
//!
//! Each scope is populated in two passes. Statements are lowered in
//! textual order, so straight-line code can only see bindings declared
//! before it. A function declaration binds its name and type immediately
//! but its body is deferred until every statement of the enclosing scope
//! has been lowered; bodies can therefore refer to siblings declared
//! later in the same scope.

use super::builder::{Builder, PendingFunction};
use super::check::Checker;
use super::closure;
use super::context::{BindingKind, Export, ExportKind, ScopeKind};
use crate::common::{CompileError, CompileResult, ContextId, FunctionId, ModuleId, ResultExt, StructId};
use crate::driver::{self, Environment, FunctionInfo};
use crate::frontend::ast;
use crate::ir::{self, FunctionNode, ImportBinding, ImportNode, ObjectNode, OperatorNode, ParamNode};
use crate::types::{StructConstructor, StructMethod, StructType, Type};
use std::collections::HashMap;

/// How an expression's value is used by its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Value,
    Callee,
    AssignTarget,
}

/// Lower a parsed module into typed IR, populating its root context
pub fn lower_module(
    env: &mut Environment,
    module: ModuleId,
    ast: &ast::Module,
) -> CompileResult<ir::Module> {
    let name = env.module(module).name.clone();
    let mut builder = Builder::new(env, module);
    let body = builder.lower_scope_body(&ast.stmts)?;
    Ok(ir::Module {
        name,
        root: builder.root_scope(),
        body,
        span: ast.span,
    })
}

impl Builder<'_> {
    /// Lower the statements of a whole scope, then its deferred bodies
    fn lower_scope_body(&mut self, stmts: &[ast::Stmt]) -> CompileResult<Vec<ir::Stmt>> {
        let mut hoisted = self.hoist_declarations(stmts)?;

        let mut lowered = Vec::with_capacity(stmts.len());
        for (i, stmt) in stmts.iter().enumerate() {
            match hoisted.remove(&i) {
                Some(kind) => lowered.push(ir::Stmt::new(kind, stmt.span)),
                None => lowered.push(self.lower_stmt(stmt)?),
            }
        }

        self.process_pending_functions(&mut lowered)?;
        Ok(lowered)
    }

    /// Declare the objects and operators written directly in a scope ahead
    /// of its other statements, so every expression of the scope sees the
    /// complete operator registry. Struct names are registered first so
    /// objects and operators may mention any of them.
    fn hoist_declarations(&mut self, stmts: &[ast::Stmt]) -> CompileResult<HashMap<usize, ir::StmtKind>> {
        let mut objects = Vec::new();
        for (i, stmt) in stmts.iter().enumerate() {
            if let ast::StmtKind::Object(decl) = &stmt.kind {
                let id = self.declare_struct(decl).at(stmt.span)?;
                objects.push((i, decl, id));
            }
        }

        let mut hoisted = HashMap::new();
        for (i, decl, id) in objects {
            let node = self.define_struct(decl, id).at(stmts[i].span)?;
            hoisted.insert(i, ir::StmtKind::Object(node));
        }
        for (i, stmt) in stmts.iter().enumerate() {
            if let ast::StmtKind::Operator(decl) = &stmt.kind {
                let node = self.lower_operator(decl).at(stmt.span)?;
                hoisted.insert(i, ir::StmtKind::Operator(node));
            }
        }
        Ok(hoisted)
    }

    fn lower_stmts(&mut self, stmts: &[ast::Stmt]) -> CompileResult<Vec<ir::Stmt>> {
        stmts.iter().map(|stmt| self.lower_stmt(stmt)).collect()
    }

    pub(super) fn lower_function_body(
        &mut self,
        pending: &PendingFunction,
        node: &mut FunctionNode,
    ) -> CompileResult<()> {
        let context = self.push_scope(pending.kind, Some(pending.id));
        let (params, body) = self.lower_function_scope(pending, context)?;
        self.pop_scope()?;

        node.params = params;
        node.body = body;
        node.body_context = Some(context);
        self.env.function_mut(pending.id).body_context = Some(context);
        Ok(())
    }

    fn lower_function_scope(
        &mut self,
        pending: &PendingFunction,
        context: ContextId,
    ) -> CompileResult<(Vec<ParamNode>, Vec<ir::Stmt>)> {
        let mut params = Vec::new();

        if let Some(self_type) = &pending.self_type {
            let assigned =
                self.env
                    .contexts
                    .add_param(context, "self", self_type.clone(), &mut self.env.names)?;
            params.push(ParamNode {
                name: "self".to_string(),
                assigned_name: assigned,
                ty: self_type.clone(),
            });
        }

        for param in &pending.decl.params {
            let ty = self.resolve_type_expr(&param.ty).at(param.span)?;
            let assigned = self
                .env
                .contexts
                .add_param(context, &param.name, ty.clone(), &mut self.env.names)
                .at(param.span)?;
            params.push(ParamNode {
                name: param.name.clone(),
                assigned_name: assigned,
                ty,
            });
        }

        let body = self.lower_scope_body(&pending.decl.body.stmts)?;
        Ok((params, body))
    }

    // ==================== Statements ====================

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> CompileResult<ir::Stmt> {
        let kind = self.lower_stmt_kind(&stmt.kind).at(stmt.span)?;
        Ok(ir::Stmt::new(kind, stmt.span))
    }

    fn lower_stmt_kind(&mut self, kind: &ast::StmtKind) -> CompileResult<ir::StmtKind> {
        use ast::StmtKind as S;

        Ok(match kind {
            S::Expr(expr) => ir::StmtKind::Expr(self.lower_expr(expr)?),
            S::Assign { target, value } => {
                let target = self.lower_expr_as(target, Usage::AssignTarget)?;
                let value = self.lower_expr(value)?;
                let current = self.current_scope();
                closure::record_assignment(&mut self.env.contexts, current, &target);
                ir::StmtKind::Assign { target, value }
            }
            S::Var { name, ty, value, is_const } => self.lower_declaration(name, ty.as_ref(), value, *is_const)?,
            S::Return(value) => {
                ir::StmtKind::Return(value.as_ref().map(|v| self.lower_expr(v)).transpose()?)
            }
            S::If { condition, then_block, else_block } => ir::StmtKind::If {
                condition: self.lower_expr(condition)?,
                then_body: self.lower_stmts(&then_block.stmts)?,
                else_body: else_block
                    .as_ref()
                    .map(|block| self.lower_stmts(&block.stmts))
                    .transpose()?,
            },
            S::While { condition, body } => ir::StmtKind::While {
                condition: self.lower_expr(condition)?,
                body: self.lower_stmts(&body.stmts)?,
            },
            S::DoWhile { body, condition } => ir::StmtKind::DoWhile {
                body: self.lower_stmts(&body.stmts)?,
                condition: self.lower_expr(condition)?,
            },
            S::For { init, condition, step, body } => ir::StmtKind::For {
                init: init
                    .as_deref()
                    .map(|s| self.lower_stmt(s).map(Box::new))
                    .transpose()?,
                condition: condition.as_ref().map(|c| self.lower_expr(c)).transpose()?,
                step: step
                    .as_deref()
                    .map(|s| self.lower_stmt(s).map(Box::new))
                    .transpose()?,
                body: self.lower_stmts(&body.stmts)?,
            },
            S::Break => ir::StmtKind::Break,
            S::Continue => ir::StmtKind::Continue,
            S::Func(decl) => ir::StmtKind::Function(self.lower_function_decl(decl)?),
            S::Object(decl) => ir::StmtKind::Object(self.lower_object(decl)?),
            S::Operator(decl) => ir::StmtKind::Operator(self.lower_operator(decl)?),
            S::SwitchType { expr, cases } => {
                let expr = self.lower_expr(expr)?;
                let cases = cases
                    .iter()
                    .map(|case| {
                        Ok(ir::SwitchCase {
                            ty: self.resolve_type_expr(&case.ty).at(case.span)?,
                            body: self.lower_stmts(&case.body.stmts)?,
                            span: case.span,
                        })
                    })
                    .collect::<CompileResult<Vec<_>>>()?;
                ir::StmtKind::SwitchType { expr, cases, matched: None }
            }
            S::Import(decl) => ir::StmtKind::Import(self.lower_import(decl)?),
            S::Export { name } => ir::StmtKind::Export(self.lower_export(name)?),
        })
    }

    /// The initializer is lowered before the name is bound, so it cannot
    /// see the binding it initializes
    fn lower_declaration(
        &mut self,
        name: &str,
        ty: Option<&ast::TypeExpr>,
        value: &ast::Expr,
        is_const: bool,
    ) -> CompileResult<ir::StmtKind> {
        let mut value = self.lower_expr(value)?;
        let current = self.current_scope();

        let ty = match ty {
            Some(ty) => self.resolve_type_expr(ty)?,
            None => {
                let inferred = Checker::new(&*self.env).resolve_type(&mut value, current, None)?;
                if inferred.is_null() || inferred.is_void() {
                    return Err(CompileError::type_error(format!(
                        "cannot infer the type of {name} from {}",
                        inferred.as_primitive().map_or("?", |p| p.name())
                    )));
                }
                inferred
            }
        };

        let contexts = &mut self.env.contexts;
        let names = &mut self.env.names;
        let assigned_name = if is_const {
            contexts.add_const(current, name, ty.clone(), names)?
        } else {
            contexts.add_var(current, name, ty.clone(), None, names)?
        };

        Ok(ir::StmtKind::Declaration {
            name: name.to_string(),
            assigned_name,
            ty,
            value,
            is_const,
        })
    }

    // ==================== Declarations ====================

    /// Type of a function declaration; methods get a leading `self`
    fn function_type(&self, decl: &ast::FuncDecl, self_type: Option<&Type>) -> CompileResult<Type> {
        let ret = decl
            .return_type
            .as_ref()
            .map(|ty| self.resolve_type_expr(ty))
            .transpose()?;
        let mut params: Vec<Type> = self_type.cloned().into_iter().collect();
        for param in &decl.params {
            params.push(self.resolve_type_expr(&param.ty).at(param.span)?);
        }
        Ok(Type::func(ret, params))
    }

    /// Record a function and defer its body; the returned node is empty
    /// until the enclosing scope processes its pending bodies
    fn declare_function(
        &mut self,
        decl: &ast::FuncDecl,
        kind: ScopeKind,
        self_type: Option<Type>,
        assigned_name: String,
    ) -> CompileResult<FunctionNode> {
        let ty = self.function_type(decl, self_type.as_ref())?;
        let id = self.env.add_function(FunctionInfo {
            name: decl.name.clone(),
            assigned_name: assigned_name.clone(),
            ty: ty.clone(),
            declared_in: self.current_scope(),
            body_context: None,
            first_class: false,
        });

        self.register_pending_function(PendingFunction {
            id,
            decl: decl.clone(),
            kind,
            self_type,
        });

        Ok(FunctionNode {
            id,
            name: decl.name.clone(),
            assigned_name,
            params: Vec::new(),
            ty,
            body: Vec::new(),
            body_context: None,
        })
    }

    fn lower_function_decl(&mut self, decl: &ast::FuncDecl) -> CompileResult<FunctionNode> {
        let current = self.current_scope();
        let assigned = self.env.names.next(&decl.name);
        let node = self.declare_function(decl, ScopeKind::Function, None, assigned.clone())?;

        self.env
            .contexts
            .add_func(current, &decl.name, node.ty.clone(), node.id, Some(assigned), &mut self.env.names)
            .at(decl.span)?;
        Ok(node)
    }

    /// The struct type is registered before its members so members and
    /// methods can refer to it
    fn lower_object(&mut self, decl: &ast::ObjectDecl) -> CompileResult<ObjectNode> {
        let id = self.declare_struct(decl)?;
        self.define_struct(decl, id)
    }

    /// Register an empty struct under its name in the current scope
    fn declare_struct(&mut self, decl: &ast::ObjectDecl) -> CompileResult<StructId> {
        let current = self.current_scope();
        let assigned_name = self.env.names.next(&decl.name);
        let id = self
            .env
            .types
            .add_struct(StructType::new(&decl.name, &assigned_name));
        self.env
            .contexts
            .register_type(current, &decl.name, Type::Struct(id))
            .at(decl.span)?;
        Ok(id)
    }

    fn define_struct(&mut self, decl: &ast::ObjectDecl, id: StructId) -> CompileResult<ObjectNode> {
        let assigned_name = self.env.types.get(id).assigned_name.clone();
        let self_type = Type::Struct(id);

        for member in &decl.members {
            let ty = self.resolve_type_expr(&member.ty).at(member.span)?;
            self.env
                .types
                .add_member(id, &member.name, ty, member.is_final, member.is_private)
                .at(member.span)?;
        }

        let mut methods = Vec::new();
        for method in &decl.methods {
            let assigned = self.env.names.next(&format!("{}_{}", decl.name, method.func.name));
            let node = self.declare_function(
                &method.func,
                ScopeKind::Method(id),
                Some(self_type.clone()),
                assigned,
            )?;
            self.env
                .types
                .add_method(
                    id,
                    StructMethod {
                        name: node.name.clone(),
                        assigned_name: node.assigned_name.clone(),
                        function: node.id,
                        ty: node.ty.clone(),
                    },
                    method.is_private,
                )
                .at(method.func.span)?;
            methods.push(node);
        }

        let constructor = match &decl.constructor {
            Some(ctor) => {
                let assigned = self.env.names.next(&format!("{}_new", decl.name));
                let node = self.declare_function(
                    ctor,
                    ScopeKind::Constructor(id),
                    Some(self_type.clone()),
                    assigned,
                )?;
                self.env
                    .types
                    .set_constructor(
                        id,
                        StructConstructor {
                            assigned_name: node.assigned_name.clone(),
                            function: node.id,
                            ty: node.ty.clone(),
                        },
                    )
                    .at(ctor.span)?;
                Some(node)
            }
            None => None,
        };

        Ok(ObjectNode {
            struct_id: id,
            name: decl.name.clone(),
            assigned_name,
            constructor,
            methods,
        })
    }

    fn lower_operator(&mut self, decl: &ast::OperatorDecl) -> CompileResult<OperatorNode> {
        let left = self.resolve_type_expr(&decl.left.ty).at(decl.left.span)?;
        let right = self.resolve_type_expr(&decl.right.ty).at(decl.right.span)?;

        let func = ast::FuncDecl {
            name: "operator".to_string(),
            return_type: Some(decl.return_type.clone()),
            params: vec![decl.left.clone(), decl.right.clone()],
            body: decl.body.clone(),
            span: decl.span,
        };
        let assigned = self.env.names.next("operator");
        let function = self.declare_function(&func, ScopeKind::Function, None, assigned)?;

        let node = OperatorNode {
            op: decl.op,
            left,
            right,
            function,
        };
        self.register_operator_overload(&node)?;
        Ok(node)
    }

    // ==================== Modules ====================

    fn lower_import(&mut self, decl: &ast::ImportDecl) -> CompileResult<ImportNode> {
        let current = self.current_scope();
        let target = self.env.loader().resolve(self.path(), &decl.path);
        let module = driver::compile_module(self.env, &target)?;

        let root = self.env.module(module).root;
        let exports = self.env.contexts.get(root).exports.clone();
        self.env.contexts.get_mut(current).imports.push(module);

        let mut bindings = Vec::new();
        if decl.members.is_empty() {
            let module_type = Type::Module {
                name: decl.path.join("."),
                exports: exports
                    .iter()
                    .filter(|(_, export)| export.kind == ExportKind::Function)
                    .map(|(name, export)| (name.clone(), export.ty.clone()))
                    .collect(),
            };
            let name = decl.binding();
            let assigned_name = self
                .env
                .contexts
                .add_var(current, name, module_type, None, &mut self.env.names)?;
            self.env
                .contexts
                .get_mut(current)
                .module_bindings
                .insert(assigned_name.clone(), module);
            bindings.push(ImportBinding {
                name: name.to_string(),
                assigned_name,
            });
        } else {
            for member in &decl.members {
                let export = exports.get(member).ok_or_else(|| {
                    CompileError::reference(format!(
                        "{} does not export {member}",
                        decl.path.join(".")
                    ))
                })?;
                match export.kind {
                    ExportKind::Function => {
                        self.env.contexts.bind(
                            current,
                            member,
                            export.ty.clone(),
                            Some(export.assigned_name.clone()),
                            BindingKind::Function,
                            &mut self.env.names,
                        )?;
                        if let Some(function) = export.function {
                            self.env
                                .contexts
                                .get_mut(current)
                                .imported_functions
                                .insert(export.assigned_name.clone(), function);
                        }
                    }
                    ExportKind::Type => {
                        self.env
                            .contexts
                            .register_type(current, member, export.ty.clone())?;
                    }
                }
                bindings.push(ImportBinding {
                    name: member.clone(),
                    assigned_name: export.assigned_name.clone(),
                });
            }
        }

        Ok(ImportNode {
            module,
            path: decl.path.clone(),
            bindings,
        })
    }

    fn lower_export(&mut self, name: &str) -> CompileResult<ir::ExportNode> {
        let current = self.current_scope();
        if current != self.root_scope() {
            return Err(CompileError::type_error(format!(
                "cannot export {name} outside the module scope"
            )));
        }

        let ctx = self.env.contexts.get(current);
        let export = if let Some(assigned) = ctx.assigned_name(name) {
            if !ctx.is_func(assigned) {
                return Err(CompileError::type_error(format!(
                    "only functions and types can be exported, {name} is a variable"
                )));
            }
            Export {
                assigned_name: assigned.to_string(),
                ty: ctx.type_of(assigned).cloned().unwrap_or_else(Type::void),
                kind: ExportKind::Function,
                function: ctx.declared_function(assigned),
            }
        } else if let Some(ty) = ctx.types.get(name) {
            let assigned_name = match ty {
                Type::Struct(id) => self.env.types.get(*id).assigned_name.clone(),
                _ => name.to_string(),
            };
            Export {
                assigned_name,
                ty: ty.clone(),
                kind: ExportKind::Type,
                function: None,
            }
        } else {
            return Err(CompileError::reference(format!("cannot export undefined {name}")));
        };

        let assigned_name = export.assigned_name.clone();
        let exports = &mut self.env.contexts.get_mut(current).exports;
        if exports.contains_key(name) {
            return Err(CompileError::redeclaration(name));
        }
        exports.insert(name.to_string(), export);

        Ok(ir::ExportNode {
            name: name.to_string(),
            assigned_name,
        })
    }

    // ==================== Expressions ====================

    fn lower_expr(&mut self, expr: &ast::Expr) -> CompileResult<ir::Expr> {
        self.lower_expr_as(expr, Usage::Value)
    }

    fn lower_expr_as(&mut self, expr: &ast::Expr, usage: Usage) -> CompileResult<ir::Expr> {
        let kind = self.lower_expr_kind(&expr.kind, usage).at(expr.span)?;
        Ok(ir::Expr::new(kind, expr.span))
    }

    fn lower_expr_kind(&mut self, kind: &ast::ExprKind, usage: Usage) -> CompileResult<ir::ExprKind> {
        use ast::ExprKind as E;

        Ok(match kind {
            E::IntLiteral(value) => ir::ExprKind::Int(*value),
            E::FloatLiteral(value) => ir::ExprKind::Float(*value),
            E::BoolLiteral(value) => ir::ExprKind::Bool(*value),
            E::StringLiteral(value) => ir::ExprKind::Str(value.clone()),
            E::Null => ir::ExprKind::Null,
            E::Identifier(name) => ir::ExprKind::Symbol(self.lower_symbol(name, usage)?),
            E::Binary { op, left, right } => ir::ExprKind::Binary {
                op: *op,
                left: Box::new(self.lower_expr(left)?),
                right: Box::new(self.lower_expr(right)?),
                overload: None,
            },
            E::Unary { op, operand } => ir::ExprKind::Unary {
                op: *op,
                operand: Box::new(self.lower_expr(operand)?),
            },
            E::Call { callee, args } => ir::ExprKind::Call {
                callee: Box::new(self.lower_expr_as(callee, Usage::Callee)?),
                args: args.iter().map(|arg| self.lower_expr(arg)).collect::<CompileResult<_>>()?,
            },
            E::Member { base, member } => {
                let base = self.lower_expr(base)?;
                if usage == Usage::Value {
                    self.mark_module_member(&base, member);
                }
                ir::ExprKind::Member {
                    base: Box::new(base),
                    member: member.clone(),
                    is_method: false,
                }
            }
            E::Subscript { base, index } => ir::ExprKind::Subscript {
                base: Box::new(self.lower_expr(base)?),
                index: Box::new(self.lower_expr(index)?),
                overload: None,
            },
            E::New { ty, args } => ir::ExprKind::New {
                target: self.resolve_type_expr(ty)?,
                args: args.iter().map(|arg| self.lower_expr(arg)).collect::<CompileResult<_>>()?,
            },
            E::Cast { expr, ty } => ir::ExprKind::Cast {
                expr: Box::new(self.lower_expr(expr)?),
                target: self.resolve_type_expr(ty)?,
            },
            E::Tuple(elements) => ir::ExprKind::Tuple(
                elements
                    .iter()
                    .map(|element| self.lower_expr(element))
                    .collect::<CompileResult<_>>()?,
            ),
        })
    }

    /// Resolve a name and report the reference to the closure analysis
    fn lower_symbol(&mut self, name: &str, usage: Usage) -> CompileResult<ir::Symbol> {
        let current = self.current_scope();
        let (definer, assigned_name) = self.env.contexts.resolve_var(current, name)?;
        closure::record_lookup(&mut self.env.contexts, current, definer, &assigned_name);

        let ctx = self.env.contexts.get(definer);
        let is_func = ctx.is_func(&assigned_name);
        if is_func && usage == Usage::Value {
            if let Some(function) = ctx.declared_function(&assigned_name) {
                self.mark_first_class(function);
            }
        }

        Ok(ir::Symbol {
            name: name.to_string(),
            assigned_name,
            ref_context: definer,
            is_func,
        })
    }

    fn mark_first_class(&mut self, function: FunctionId) {
        self.env.function_mut(function).first_class = true;
    }

    /// `module.f` read as a value lets the exported function escape
    fn mark_module_member(&mut self, base: &ir::Expr, member: &str) {
        let Some(symbol) = base.as_symbol() else {
            return;
        };
        let bindings = &self.env.contexts.get(symbol.ref_context).module_bindings;
        let Some(&module) = bindings.get(&symbol.assigned_name) else {
            return;
        };
        let root = self.env.module(module).root;
        let exported = self
            .env
            .contexts
            .get(root)
            .exports
            .get(member)
            .and_then(|export| export.function);
        if let Some(function) = exported {
            self.mark_first_class(function);
        }
    }

    // ==================== Types ====================

    fn resolve_type_expr(&self, ty: &ast::TypeExpr) -> CompileResult<Type> {
        use ast::TypeExprKind as T;

        let current = self.current_scope();
        let resolved = match &ty.kind {
            T::Named(name) => self.env.contexts.resolve_type(current, name),
            T::Array(element) => Ok(Type::array(self.resolve_type_expr(element)?)),
            T::Tuple(elements) => Ok(Type::Tuple(
                elements
                    .iter()
                    .map(|e| self.resolve_type_expr(e))
                    .collect::<CompileResult<_>>()?,
            )),
            T::Func { ret, params } => Ok(Type::func(
                ret.as_deref().map(|r| self.resolve_type_expr(r)).transpose()?,
                params
                    .iter()
                    .map(|p| self.resolve_type_expr(p))
                    .collect::<CompileResult<_>>()?,
            )),
        };
        resolved.at(ty.span)
    }
}
