//! Type checking of the typed IR
//!
//! [`Checker::resolve_type`] computes and records the type of an expression;
//! [`Checker::settle_types`] validates a statement and everything below it.
//! The first violated rule aborts with an error positioned at the innermost
//! node that detected it.

use crate::common::{CompileError, CompileResult, ContextId, ResultExt, StructId};
use crate::driver::Environment;
use crate::frontend::ast::{BinOp, BinOpClass, OverloadOp, UnaryOp};
use crate::ir::{self, Expr, ExprKind, FunctionNode, Stmt, StmtKind};
use crate::types::{Primitive, Type};

/// Check a lowered module
pub fn check_module(env: &Environment, module: &mut ir::Module) -> CompileResult<()> {
    Checker::new(env).settle_block(&mut module.body, module.root)
}

pub struct Checker<'e> {
    env: &'e Environment,
    loop_depth: usize,
}

impl<'e> Checker<'e> {
    pub fn new(env: &'e Environment) -> Self {
        Self { env, loop_depth: 0 }
    }

    fn describe(&self, ty: &Type) -> String {
        self.env.types.describe(ty)
    }

    fn equals(&self, a: &Type, b: &Type) -> bool {
        self.env.types.equals(a, b)
    }

    fn expect_type(&self, actual: &Type, expected: &Type, what: &str) -> CompileResult<()> {
        if self.equals(actual, expected) {
            Ok(())
        } else {
            Err(CompileError::type_error(format!(
                "{what}: expected {}, got {}",
                self.describe(expected),
                self.describe(actual)
            )))
        }
    }

    // ==================== Statements ====================

    pub fn settle_block(&mut self, stmts: &mut [Stmt], ctx: ContextId) -> CompileResult<()> {
        for stmt in stmts {
            self.settle_types(stmt, ctx)?;
        }
        Ok(())
    }

    pub fn settle_types(&mut self, stmt: &mut Stmt, ctx: ContextId) -> CompileResult<()> {
        let span = stmt.span;
        self.settle_kind(&mut stmt.kind, ctx).at(span)
    }

    fn settle_kind(&mut self, kind: &mut StmtKind, ctx: ContextId) -> CompileResult<()> {
        match kind {
            StmtKind::Expr(expr) => {
                self.resolve_type(expr, ctx, None)?;
            }
            StmtKind::Assign { target, value } => self.settle_assignment(target, value, ctx)?,
            StmtKind::Declaration { name, ty, value, .. } => {
                let value_ty = self.resolve_type(value, ctx, Some(&*ty))?;
                self.expect_type(&value_ty, ty, &format!("cannot initialize {name}"))
                    .at(value.span)?;
            }
            StmtKind::Return(value) => self.settle_return(value.as_mut(), ctx)?,
            StmtKind::If { condition, then_body, else_body } => {
                self.settle_condition(condition, ctx)?;
                self.settle_block(then_body, ctx)?;
                if let Some(else_body) = else_body {
                    self.settle_block(else_body, ctx)?;
                }
            }
            StmtKind::While { condition, body } | StmtKind::DoWhile { body, condition } => {
                self.settle_condition(condition, ctx)?;
                self.settle_loop_body(body, ctx)?;
            }
            StmtKind::For { init, condition, step, body } => {
                if let Some(init) = init {
                    self.settle_types(init, ctx)?;
                }
                if let Some(condition) = condition {
                    self.settle_condition(condition, ctx)?;
                }
                if let Some(step) = step {
                    self.settle_types(step, ctx)?;
                }
                self.settle_loop_body(body, ctx)?;
            }
            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(CompileError::type_error("break and continue are only allowed inside loops"));
                }
            }
            StmtKind::Function(function) => self.settle_function(function)?,
            StmtKind::Object(object) => {
                if let Some(constructor) = &mut object.constructor {
                    self.settle_function(constructor)?;
                }
                for method in &mut object.methods {
                    self.settle_function(method)?;
                }
            }
            StmtKind::Operator(operator) => self.settle_function(&mut operator.function)?,
            StmtKind::SwitchType { expr, cases, matched } => {
                let switched = self.resolve_type(expr, ctx, None)?;

                for (i, case) in cases.iter().enumerate() {
                    if cases[..i].iter().any(|earlier| self.equals(&earlier.ty, &case.ty)) {
                        return Err(CompileError::type_error_at(
                            format!("duplicate case for {}", self.describe(&case.ty)),
                            case.span,
                        ));
                    }
                }

                let index = cases
                    .iter()
                    .position(|case| self.equals(&case.ty, &switched))
                    .ok_or_else(|| {
                        CompileError::type_error(format!(
                            "no case matches {}",
                            self.describe(&switched)
                        ))
                    })?;
                *matched = Some(index);

                for case in cases.iter_mut() {
                    self.settle_block(&mut case.body, ctx)?;
                }
            }
            StmtKind::Import(_) | StmtKind::Export(_) => {}
        }
        Ok(())
    }

    fn settle_condition(&mut self, condition: &mut Expr, ctx: ContextId) -> CompileResult<()> {
        let ty = self.resolve_type(condition, ctx, None)?;
        self.expect_type(&ty, &Type::bool(), "condition must be bool")
            .at(condition.span)
    }

    fn settle_loop_body(&mut self, body: &mut [Stmt], ctx: ContextId) -> CompileResult<()> {
        self.loop_depth += 1;
        let result = self.settle_block(body, ctx);
        self.loop_depth -= 1;
        result
    }

    fn settle_function(&mut self, function: &mut FunctionNode) -> CompileResult<()> {
        let context = function.body_context.ok_or_else(|| {
            CompileError::reference(format!("body of {} was never lowered", function.name))
        })?;

        let outer_depth = std::mem::replace(&mut self.loop_depth, 0);
        let result = self.settle_block(&mut function.body, context);
        self.loop_depth = outer_depth;
        result
    }

    fn settle_return(&mut self, value: Option<&mut Expr>, ctx: ContextId) -> CompileResult<()> {
        let function = self
            .env
            .contexts
            .enclosing_function(ctx)
            .ok_or_else(|| CompileError::type_error("return outside of a function"))?;
        let expected = self
            .env
            .function(function)
            .ty
            .as_func()
            .and_then(|(ret, _)| ret.cloned());

        match (value, expected) {
            (None, None) => Ok(()),
            (None, Some(expected)) => Err(CompileError::type_error(format!(
                "missing return value, expected {}",
                self.describe(&expected)
            ))),
            (Some(value), None) => {
                let ty = self.resolve_type(value, ctx, None)?;
                Err(CompileError::type_error_at(
                    format!("function without a return type returns {}", self.describe(&ty)),
                    value.span,
                ))
            }
            (Some(value), Some(expected)) => {
                let ty = self.resolve_type(value, ctx, Some(&expected))?;
                self.expect_type(&ty, &expected, "mismatched return type")
                    .at(value.span)
            }
        }
    }

    fn settle_assignment(&mut self, target: &mut Expr, value: &mut Expr, ctx: ContextId) -> CompileResult<()> {
        let target_ty = self.resolve_type(target, ctx, None)?;

        match &target.kind {
            ExprKind::Symbol(symbol) => {
                let definer = self.env.contexts.get(symbol.ref_context);
                if definer.is_func(&symbol.assigned_name) {
                    return Err(CompileError::type_error_at(
                        format!("cannot assign to function declaration {}", symbol.name),
                        target.span,
                    ));
                }
                if definer.is_const(&symbol.assigned_name) {
                    return Err(CompileError::type_error_at(
                        format!("cannot assign to constant {}", symbol.name),
                        target.span,
                    ));
                }
            }
            ExprKind::Member { base, member, is_method } => {
                if *is_method {
                    return Err(CompileError::type_error_at(
                        format!("cannot assign to method {member}"),
                        target.span,
                    ));
                }
                match &base.ty {
                    Some(Type::Struct(id)) => self.check_final_write(*id, member, ctx).at(target.span)?,
                    Some(Type::Module { name, .. }) => {
                        return Err(CompileError::type_error_at(
                            format!("cannot assign to {member} exported by {name}"),
                            target.span,
                        ));
                    }
                    _ => {}
                }
            }
            ExprKind::Subscript { overload, .. } => {
                if overload.is_some() {
                    return Err(CompileError::type_error_at(
                        "cannot assign through an overloaded []",
                        target.span,
                    ));
                }
            }
            _ => {
                return Err(CompileError::type_error_at("invalid assignment target", target.span));
            }
        }

        let value_ty = self.resolve_type(value, ctx, Some(&target_ty))?;
        self.expect_type(&value_ty, &target_ty, "mismatched types in assignment")
            .at(value.span)
    }

    fn check_final_write(&self, owner: StructId, member: &str, ctx: ContextId) -> CompileResult<()> {
        let def = self.env.types.get(owner);
        if def.is_final(member) && !self.env.contexts.inside_constructor(ctx, owner) {
            return Err(CompileError::type_error(format!(
                "{member} is final and can only be set in the constructor of {}",
                def.name
            )));
        }
        Ok(())
    }

    // ==================== Expressions ====================

    /// Compute the type of `expr` and record it on the node
    ///
    /// `expected` is a hint from the parent: it types `null` literals and
    /// must match the result of calls.
    pub fn resolve_type(
        &mut self,
        expr: &mut Expr,
        ctx: ContextId,
        expected: Option<&Type>,
    ) -> CompileResult<Type> {
        let span = expr.span;
        let ty = self.resolve_kind(&mut expr.kind, ctx, expected).at(span)?;
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn resolve_kind(
        &mut self,
        kind: &mut ExprKind,
        ctx: ContextId,
        expected: Option<&Type>,
    ) -> CompileResult<Type> {
        match kind {
            ExprKind::Int(_) => Ok(Type::int()),
            ExprKind::Float(_) => Ok(Type::float()),
            ExprKind::Bool(_) => Ok(Type::bool()),
            ExprKind::Str(_) => Ok(Type::str()),
            ExprKind::Null => Ok(expected
                .filter(|ty| ty.is_reference())
                .cloned()
                .unwrap_or_else(Type::null)),
            ExprKind::Symbol(symbol) => self
                .env
                .contexts
                .get(symbol.ref_context)
                .type_of(&symbol.assigned_name)
                .cloned()
                .ok_or_else(|| CompileError::reference(format!("{} is not defined", symbol.name))),
            ExprKind::Binary { op, left, right, overload } => {
                self.resolve_binary(*op, left, right, overload, ctx)
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.resolve_type(operand, ctx, None)?;
                let allowed = match (*op, ty.as_primitive()) {
                    (UnaryOp::Neg, Some(p)) => p.is_numeric(),
                    (UnaryOp::Not, Some(p)) => p == Primitive::Bool,
                    (UnaryOp::BitNot, Some(p)) => p.is_integral(),
                    (_, None) => false,
                };
                if !allowed {
                    return Err(CompileError::type_error(format!(
                        "cannot apply {op} to {}",
                        self.describe(&ty)
                    )));
                }
                Ok(ty)
            }
            ExprKind::Call { callee, args } => self.resolve_call(callee, args, ctx, expected),
            ExprKind::Member { base, member, is_method } => {
                self.resolve_member(base, member, is_method, ctx)
            }
            ExprKind::Subscript { base, index, overload } => {
                self.resolve_subscript(base, index, overload, ctx)
            }
            ExprKind::New { target, args } => {
                let target = target.clone();
                self.resolve_new(&target, args, ctx)?;
                Ok(target)
            }
            ExprKind::Cast { expr, target } => {
                let source = self.resolve_type(expr, ctx, None)?;
                if !is_castable(&source) || !is_castable(target) {
                    return Err(CompileError::type_error(format!(
                        "cannot cast {} to {}",
                        self.describe(&source),
                        self.describe(target)
                    )));
                }
                Ok(target.clone())
            }
            ExprKind::Tuple(elements) => {
                let hints = match expected {
                    Some(Type::Tuple(hints)) if hints.len() == elements.len() => Some(hints.as_slice()),
                    _ => None,
                };
                let mut types = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter_mut().enumerate() {
                    let hint = hints.and_then(|h| h.get(i));
                    types.push(self.resolve_type(element, ctx, hint)?);
                }
                Ok(Type::Tuple(types))
            }
        }
    }

    /// Registered overloads take precedence over every built-in rule
    fn resolve_binary(
        &mut self,
        op: BinOp,
        left: &mut Expr,
        right: &mut Expr,
        overload: &mut Option<String>,
        ctx: ContextId,
    ) -> CompileResult<Type> {
        let mut left_ty = self.resolve_type(left, ctx, None)?;
        let hint = matches!(right.kind, ExprKind::Null).then(|| left_ty.clone());
        let right_ty = self.resolve_type(right, ctx, hint.as_ref())?;
        if left_ty.is_null() && right_ty.is_reference() {
            left_ty = self.resolve_type(left, ctx, Some(&right_ty))?;
        }

        let types = &self.env.types;
        if let Some(found) = self.env.operators.lookup(
            &types.key(&left_ty),
            &types.key(&right_ty),
            OverloadOp::Binary(op),
        ) {
            *overload = Some(found.function.clone());
            return Ok(found.return_type.clone());
        }

        if !self.equals(&left_ty, &right_ty) {
            return Err(CompileError::type_error(format!(
                "mismatched operand types for {op}: {} and {}",
                self.describe(&left_ty),
                self.describe(&right_ty)
            )));
        }

        let primitive = left_ty.as_primitive();
        let allowed = match op.class() {
            BinOpClass::Equality => true,
            BinOpClass::Relative => primitive.is_some_and(Primitive::is_numeric),
            BinOpClass::Logical => primitive == Some(Primitive::Bool),
            BinOpClass::Bitwise => primitive.is_some_and(Primitive::is_integral),
            BinOpClass::Arithmetic => match op {
                BinOp::Add => primitive.is_some_and(|p| p.is_numeric() || p == Primitive::Str),
                _ => primitive.is_some_and(Primitive::is_numeric),
            },
        };
        if !allowed {
            return Err(CompileError::type_error(format!(
                "{op} is not defined for {}",
                self.describe(&left_ty)
            )));
        }

        Ok(match op.class() {
            BinOpClass::Equality | BinOpClass::Relative => Type::bool(),
            BinOpClass::Logical | BinOpClass::Bitwise | BinOpClass::Arithmetic => left_ty,
        })
    }

    fn resolve_call(
        &mut self,
        callee: &mut Expr,
        args: &mut [Expr],
        ctx: ContextId,
        expected: Option<&Type>,
    ) -> CompileResult<Type> {
        let callee_ty = self.resolve_type(callee, ctx, None)?;
        let Some((ret, params)) = callee_ty.as_func() else {
            return Err(CompileError::type_error(format!(
                "{} is not callable",
                self.describe(&callee_ty)
            )));
        };

        // Methods take their receiver implicitly
        let is_method = matches!(callee.kind, ExprKind::Member { is_method: true, .. });
        let params = if is_method { params.get(1..).unwrap_or_default() } else { params };

        self.check_arguments(params, args, ctx)?;

        let result = ret.cloned().unwrap_or_else(Type::void);
        if let Some(expected) = expected {
            if !result.is_void() {
                self.expect_type(&result, expected, "mismatched call result")?;
            }
        }
        Ok(result)
    }

    fn check_arguments(&mut self, params: &[Type], args: &mut [Expr], ctx: ContextId) -> CompileResult<()> {
        if args.len() != params.len() {
            return Err(CompileError::type_error(format!(
                "expected {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        for (i, (arg, param)) in args.iter_mut().zip(params).enumerate() {
            let ty = self.resolve_type(arg, ctx, Some(param))?;
            self.expect_type(&ty, param, &format!("argument {}", i + 1))
                .at(arg.span)?;
        }
        Ok(())
    }

    fn resolve_member(
        &mut self,
        base: &mut Expr,
        member: &str,
        is_method: &mut bool,
        ctx: ContextId,
    ) -> CompileResult<Type> {
        let base_ty = self.resolve_type(base, ctx, None)?;

        match &base_ty {
            Type::Struct(id) => {
                let def = self.env.types.get(*id);
                if def.is_private(member) && !self.env.contexts.inside_struct(ctx, *id) {
                    return Err(CompileError::type_error(format!(
                        "{member} is private to {}",
                        def.name
                    )));
                }
                if let Some(method) = def.method(member) {
                    *is_method = true;
                    return Ok(method.ty.clone());
                }
                def.member(member).cloned().ok_or_else(|| {
                    CompileError::type_error(format!("{} has no member {member}", def.name))
                })
            }
            Type::Module { name, exports } => exports.get(member).cloned().ok_or_else(|| {
                CompileError::reference(format!("{name} does not export {member}"))
            }),
            Type::Array(_) | Type::Primitive(Primitive::Str) if member == "length" => Ok(Type::int()),
            _ => Err(CompileError::type_error(format!(
                "{} has no member {member}",
                self.describe(&base_ty)
            ))),
        }
    }

    fn resolve_subscript(
        &mut self,
        base: &mut Expr,
        index: &mut Expr,
        overload: &mut Option<String>,
        ctx: ContextId,
    ) -> CompileResult<Type> {
        let base_ty = self.resolve_type(base, ctx, None)?;
        let index_ty = self.resolve_type(index, ctx, None)?;

        let types = &self.env.types;
        if let Some(found) = self.env.operators.lookup(
            &types.key(&base_ty),
            &types.key(&index_ty),
            OverloadOp::Subscript,
        ) {
            *overload = Some(found.function.clone());
            return Ok(found.return_type.clone());
        }

        self.expect_type(&index_ty, &Type::int(), "subscript index")
            .at(index.span)?;

        match &base_ty {
            Type::Array(element) => Ok((**element).clone()),
            Type::Primitive(Primitive::Str) => Ok(Type::byte()),
            Type::Tuple(elements) => {
                let ExprKind::Int(position) = index.kind else {
                    return Err(CompileError::type_error_at(
                        "tuple subscripts must be integer literals",
                        index.span,
                    ));
                };
                usize::try_from(position)
                    .ok()
                    .and_then(|i| elements.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        CompileError::type_error_at(
                            format!(
                                "index {position} is out of range for {}",
                                self.describe(&base_ty)
                            ),
                            index.span,
                        )
                    })
            }
            _ => Err(CompileError::type_error(format!(
                "{} is not subscriptable",
                self.describe(&base_ty)
            ))),
        }
    }

    fn resolve_new(&mut self, target: &Type, args: &mut [Expr], ctx: ContextId) -> CompileResult<()> {
        let env = self.env;
        match target {
            Type::Struct(id) => match &env.types.get(*id).constructor {
                Some(constructor) => {
                    let params = constructor
                        .ty
                        .as_func()
                        .map(|(_, params)| params.get(1..).unwrap_or_default())
                        .unwrap_or_default();
                    self.check_arguments(params, args, ctx)
                }
                None if args.is_empty() => Ok(()),
                None => Err(CompileError::type_error(format!(
                    "{} has no constructor and takes no arguments",
                    self.describe(target)
                ))),
            },
            Type::Array(_) => self.check_arguments(&[Type::int()], args, ctx),
            Type::Tuple(_) if args.is_empty() => Ok(()),
            _ => Err(CompileError::type_error(format!(
                "cannot instantiate {}",
                self.describe(target)
            ))),
        }
    }
}

/// Scalars that `as` converts between
fn is_castable(ty: &Type) -> bool {
    ty.as_primitive()
        .is_some_and(|p| p.is_numeric() || p == Primitive::Bool)
}
