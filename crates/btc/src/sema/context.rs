//! Lexical scopes and symbol resolution
//!
//! Every module root and every function body owns one [`Context`]. Blocks
//! inside a function (if/loop bodies, switchtype cases) share the function's
//! context. Contexts live in a [`ContextTree`] arena and refer to each other
//! by [`ContextId`].

use crate::common::{CompileError, CompileResult, ContextId, FunctionId, ModuleId, StructId};
use crate::driver::NameGenerator;
use crate::types::{builtin_type, Type};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// What owns a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module(ModuleId),
    Function,
    Method(StructId),
    Constructor(StructId),
}

/// Kind of a named binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Constant,
    Function,
    Parameter,
}

/// What a module export refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Function,
    Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub assigned_name: String,
    pub ty: Type,
    pub kind: ExportKind,
    /// Declaration behind a function export
    pub function: Option<FunctionId>,
}

/// Symbol table for one lexical scope
#[derive(Debug)]
pub struct Context {
    pub id: ContextId,
    pub parent: Option<ContextId>,
    pub kind: ScopeKind,
    /// Function whose body this context is
    pub function: Option<FunctionId>,
    /// Given name to assigned name
    pub name_map: HashMap<String, String>,
    /// Assigned name to type
    pub type_map: HashMap<String, Type>,
    pub binding_kinds: HashMap<String, BindingKind>,
    /// Given names of parameters not yet shadowed by a local declaration
    shadowable: HashSet<String>,
    /// Type names declared here
    pub types: HashMap<String, Type>,
    /// Functions declared directly in this scope, in declaration order
    pub functions: Vec<FunctionId>,
    /// Assigned name to function
    pub function_declarations: HashMap<String, FunctionId>,
    pub exports: BTreeMap<String, Export>,
    pub imports: Vec<ModuleId>,
    /// Assigned name to declaration, for functions bound by `from ... import`
    pub imported_functions: HashMap<String, FunctionId>,
    /// Assigned name to module, for bindings made by `import`
    pub module_bindings: HashMap<String, ModuleId>,
    pub accesses_global_scope: bool,
    pub accesses_lexical_scope: bool,
    pub side_effect_free: bool,
    /// Assigned names of enclosing-scope variables mutated from here
    pub lexical_modifications: BTreeSet<String>,
    /// Assigned names read from enclosing non-root scopes, with their definers
    pub lexical_lookups: BTreeMap<String, ContextId>,
}

impl Context {
    fn new(id: ContextId, parent: Option<ContextId>, kind: ScopeKind) -> Self {
        Self {
            id,
            parent,
            kind,
            function: None,
            name_map: HashMap::new(),
            type_map: HashMap::new(),
            binding_kinds: HashMap::new(),
            shadowable: HashSet::new(),
            types: HashMap::new(),
            functions: Vec::new(),
            function_declarations: HashMap::new(),
            exports: BTreeMap::new(),
            imports: Vec::new(),
            imported_functions: HashMap::new(),
            module_bindings: HashMap::new(),
            accesses_global_scope: false,
            accesses_lexical_scope: false,
            side_effect_free: true,
            lexical_modifications: BTreeSet::new(),
            lexical_lookups: BTreeMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_var(&self, given: &str) -> bool {
        self.name_map.contains_key(given)
    }

    pub fn assigned_name(&self, given: &str) -> Option<&str> {
        self.name_map.get(given).map(String::as_str)
    }

    pub fn type_of(&self, assigned: &str) -> Option<&Type> {
        self.type_map.get(assigned)
    }

    pub fn binding_kind(&self, assigned: &str) -> Option<BindingKind> {
        self.binding_kinds.get(assigned).copied()
    }

    pub fn is_func(&self, assigned: &str) -> bool {
        self.binding_kind(assigned) == Some(BindingKind::Function)
    }

    /// Declaration a function binding refers to, local or imported
    pub fn declared_function(&self, assigned: &str) -> Option<FunctionId> {
        self.function_declarations
            .get(assigned)
            .or_else(|| self.imported_functions.get(assigned))
            .copied()
    }

    pub fn is_const(&self, assigned: &str) -> bool {
        self.binding_kind(assigned) == Some(BindingKind::Constant)
    }
}

/// Arena of contexts for one compilation
#[derive(Debug, Default)]
pub struct ContextTree {
    contexts: Vec<Context>,
}

impl ContextTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, parent: Option<ContextId>, kind: ScopeKind) -> ContextId {
        let id = ContextId(self.contexts.len());
        self.contexts.push(Context::new(id, parent, kind));
        id
    }

    pub fn get(&self, id: ContextId) -> &Context {
        &self.contexts[id.0]
    }

    pub fn get_mut(&mut self, id: ContextId) -> &mut Context {
        &mut self.contexts[id.0]
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// `id` followed by each of its ancestors, nearest first
    pub fn chain(&self, id: ContextId) -> impl Iterator<Item = &Context> {
        std::iter::successors(Some(self.get(id)), |ctx| ctx.parent.map(|p| self.get(p)))
    }

    pub fn root_of(&self, id: ContextId) -> ContextId {
        self.chain(id).last().map_or(id, |ctx| ctx.id)
    }

    pub fn is_root(&self, id: ContextId) -> bool {
        self.get(id).is_root()
    }

    // ==================== Bindings ====================

    /// Declare `given` in `ctx` and return its assigned name
    ///
    /// Redeclaring a name already bound in the same context fails,
    /// whatever kind either binding has. A parameter may be shadowed
    /// once by a declaration in its function body.
    pub fn add_var(
        &mut self,
        ctx: ContextId,
        given: &str,
        ty: Type,
        assigned: Option<String>,
        names: &mut NameGenerator,
    ) -> CompileResult<String> {
        self.bind(ctx, given, ty, assigned, BindingKind::Variable, names)
    }

    pub fn add_const(
        &mut self,
        ctx: ContextId,
        given: &str,
        ty: Type,
        names: &mut NameGenerator,
    ) -> CompileResult<String> {
        self.bind(ctx, given, ty, None, BindingKind::Constant, names)
    }

    pub fn add_param(
        &mut self,
        ctx: ContextId,
        given: &str,
        ty: Type,
        names: &mut NameGenerator,
    ) -> CompileResult<String> {
        let assigned = self.bind(ctx, given, ty, None, BindingKind::Parameter, names)?;
        self.get_mut(ctx).shadowable.insert(given.to_string());
        Ok(assigned)
    }

    /// Declare a function literal found directly in `ctx`'s body
    pub fn add_func(
        &mut self,
        ctx: ContextId,
        given: &str,
        ty: Type,
        function: FunctionId,
        assigned: Option<String>,
        names: &mut NameGenerator,
    ) -> CompileResult<String> {
        let assigned = self.bind(ctx, given, ty, assigned, BindingKind::Function, names)?;
        let context = self.get_mut(ctx);
        context.functions.push(function);
        context.function_declarations.insert(assigned.clone(), function);
        Ok(assigned)
    }

    /// Bind `given` with an explicit kind; imports use this to rebind
    /// another module's exports under their original assigned names
    pub fn bind(
        &mut self,
        ctx: ContextId,
        given: &str,
        ty: Type,
        assigned: Option<String>,
        kind: BindingKind,
        names: &mut NameGenerator,
    ) -> CompileResult<String> {
        let context = self.get_mut(ctx);
        if context.has_var(given) && !context.shadowable.remove(given) {
            return Err(CompileError::redeclaration(given));
        }

        let assigned = assigned.unwrap_or_else(|| names.next(given));
        context.name_map.insert(given.to_string(), assigned.clone());
        context.type_map.insert(assigned.clone(), ty);
        context.binding_kinds.insert(assigned.clone(), kind);
        Ok(assigned)
    }

    /// Nearest context, starting at `ctx`, that declares `given`
    pub fn lookup_var(&self, ctx: ContextId, given: &str) -> CompileResult<ContextId> {
        self.chain(ctx)
            .find(|c| c.has_var(given))
            .map(|c| c.id)
            .ok_or_else(|| CompileError::reference(format!("{given} is not defined")))
    }

    /// Declaring context and assigned name of `given` as seen from `ctx`
    pub fn resolve_var(&self, ctx: ContextId, given: &str) -> CompileResult<(ContextId, String)> {
        let definer = self.lookup_var(ctx, given)?;
        let assigned = self
            .get(definer)
            .assigned_name(given)
            .map(str::to_string)
            .ok_or_else(|| CompileError::reference(format!("{given} is not defined")))?;
        Ok((definer, assigned))
    }

    // ==================== Types ====================

    pub fn register_type(&mut self, ctx: ContextId, name: &str, ty: Type) -> CompileResult<()> {
        let context = self.get_mut(ctx);
        if context.types.contains_key(name) {
            return Err(CompileError::redeclaration(name));
        }
        context.types.insert(name.to_string(), ty);
        Ok(())
    }

    /// Look a type name up the scope chain, falling back to the built-ins
    pub fn resolve_type(&self, ctx: ContextId, name: &str) -> CompileResult<Type> {
        self.chain(ctx)
            .find_map(|c| c.types.get(name).cloned())
            .or_else(|| builtin_type(name))
            .ok_or_else(|| CompileError::reference(format!("type {name} is not defined")))
    }

    // ==================== Ownership ====================

    /// Struct whose method or constructor body lexically encloses `ctx`
    pub fn enclosing_struct(&self, ctx: ContextId) -> Option<StructId> {
        self.chain(ctx).find_map(|c| match c.kind {
            ScopeKind::Method(id) | ScopeKind::Constructor(id) => Some(id),
            ScopeKind::Module(_) | ScopeKind::Function => None,
        })
    }

    /// Is `ctx` lexically inside the constructor of `owner`?
    pub fn inside_constructor(&self, ctx: ContextId, owner: StructId) -> bool {
        self.chain(ctx)
            .any(|c| c.kind == ScopeKind::Constructor(owner))
    }

    /// Is `ctx` lexically inside a method or the constructor of `owner`?
    pub fn inside_struct(&self, ctx: ContextId, owner: StructId) -> bool {
        self.chain(ctx).any(|c| {
            matches!(c.kind, ScopeKind::Method(id) | ScopeKind::Constructor(id) if id == owner)
        })
    }

    /// Function whose body is `ctx` or its nearest function ancestor
    pub fn enclosing_function(&self, ctx: ContextId) -> Option<FunctionId> {
        self.chain(ctx).find_map(|c| c.function)
    }
}
