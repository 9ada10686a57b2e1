//! Per-compilation state
//!
//! An [`Environment`] is created for each top-level compile request and
//! passed explicitly to everything that needs shared state. Separate
//! environments share nothing, so independent compilations never interfere.

use super::config::CompileConfig;
use super::loader::SourceLoader;
use crate::common::{CompileError, CompileResult, ContextId, FunctionId, ModuleId};
use crate::ir;
use crate::sema::ContextTree;
use crate::types::{OperatorRegistry, Type, TypeTable};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Produces collision-free assigned names: `{given}${n}`
#[derive(Debug, Default)]
pub struct NameGenerator {
    counter: usize,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, given: &str) -> String {
        let name = format!("{given}${}", self.counter);
        self.counter += 1;
        name
    }
}

/// Any declared function: free function, method, constructor or operator
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub assigned_name: String,
    pub ty: Type,
    /// Context the declaration appears in
    pub declared_in: ContextId,
    pub body_context: Option<ContextId>,
    /// Referenced as a value somewhere, so it needs a code+capture pair
    pub first_class: bool,
}

#[derive(Debug)]
pub struct ModuleInfo {
    pub name: String,
    pub path: PathBuf,
    pub root: ContextId,
    /// `None` while the module is still being compiled
    pub ir: Option<ir::Module>,
}

/// Shared state of one compilation
pub struct Environment {
    pub config: CompileConfig,
    pub contexts: ContextTree,
    pub types: TypeTable,
    pub functions: Vec<FunctionInfo>,
    pub operators: OperatorRegistry,
    pub names: NameGenerator,
    modules: Vec<ModuleInfo>,
    module_paths: HashMap<PathBuf, ModuleId>,
    loader: Box<dyn SourceLoader>,
    /// File that raised the first error, for diagnostics
    failed_file: Option<PathBuf>,
}

impl Environment {
    pub fn new(config: CompileConfig, loader: Box<dyn SourceLoader>) -> Self {
        Self {
            config,
            contexts: ContextTree::new(),
            types: TypeTable::new(),
            functions: Vec::new(),
            operators: OperatorRegistry::new(),
            names: NameGenerator::new(),
            modules: Vec::new(),
            module_paths: HashMap::new(),
            loader,
            failed_file: None,
        }
    }

    // ==================== Functions ====================

    pub fn add_function(&mut self, info: FunctionInfo) -> FunctionId {
        let id = FunctionId(self.functions.len());
        self.functions.push(info);
        id
    }

    pub fn function(&self, id: FunctionId) -> &FunctionInfo {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut FunctionInfo {
        &mut self.functions[id.0]
    }

    // ==================== Modules ====================

    pub fn module(&self, id: ModuleId) -> &ModuleInfo {
        &self.modules[id.0]
    }

    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    pub fn loader(&self) -> &dyn SourceLoader {
        self.loader.as_ref()
    }

    pub fn failed_file(&self) -> Option<&Path> {
        self.failed_file.as_deref()
    }

    /// Cached module for `path`; importing a module that is still being
    /// compiled is a cycle
    pub fn cached_module(&self, path: &Path) -> CompileResult<Option<ModuleId>> {
        let Some(&id) = self.module_paths.get(path) else {
            return Ok(None);
        };
        if self.module(id).ir.is_none() {
            return Err(CompileError::reference(format!(
                "circular import of {}",
                path.display()
            )));
        }
        Ok(Some(id))
    }

    /// Reserve a module slot and its root context before compiling it
    pub fn begin_module(&mut self, name: &str, path: &Path) -> ModuleId {
        let id = ModuleId(self.modules.len());
        let root = self
            .contexts
            .create(None, crate::sema::ScopeKind::Module(id));
        self.modules.push(ModuleInfo {
            name: name.to_string(),
            path: path.to_path_buf(),
            root,
            ir: None,
        });
        self.module_paths.insert(path.to_path_buf(), id);
        id
    }

    pub fn finish_module(&mut self, id: ModuleId, module: ir::Module) {
        self.modules[id.0].ir = Some(module);
    }

    pub(crate) fn record_failure(&mut self, path: &Path) {
        if self.failed_file.is_none() {
            self.failed_file = Some(path.to_path_buf());
        }
    }
}
