//! Compilation driver and pipeline orchestration
//!
//! Modules are compiled one at a time, depth-first through the import
//! graph: parse, lower, check. The first error aborts the compilation.

mod config;
mod env;
mod loader;

pub use config::CompileConfig;
pub use env::{Environment, FunctionInfo, ModuleInfo, NameGenerator};
pub use loader::{FsLoader, MemoryLoader, SourceLoader, SOURCE_EXTENSION};

use crate::common::{CompileError, CompileResult, ModuleId};
use crate::frontend::lexer::Lexer;
use crate::frontend::parse;
use crate::ir;
use crate::sema::{self, ExportKind};
use crate::types::Type;
use std::path::Path;

/// Compile the program rooted at `path`
pub fn compile(env: &mut Environment, path: &Path) -> CompileResult<ModuleId> {
    env.config.validate()?;

    let entry = compile_module(env, path)?;
    verify_runtime_entry(env, entry)?;

    if env.config.verbose {
        eprintln!(
            "Compiled {} module(s), {} function(s), {} struct(s)",
            env.modules().len(),
            env.functions.len(),
            env.types.len()
        );
    }
    Ok(entry)
}

/// Compile one module, reusing the cached result if it was already built
pub fn compile_module(env: &mut Environment, path: &Path) -> CompileResult<ModuleId> {
    if let Some(id) = env.cached_module(path)? {
        return Ok(id);
    }

    let source = env.loader().read(path)?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("main")
        .to_string();
    let id = env.begin_module(&name, path);

    match build_module(env, id, path, &source) {
        Ok(module) => {
            env.finish_module(id, module);
            Ok(id)
        }
        Err(err) => {
            env.record_failure(path);
            Err(err)
        }
    }
}

fn build_module(
    env: &mut Environment,
    id: ModuleId,
    path: &Path,
    source: &str,
) -> CompileResult<ir::Module> {
    let verbose = env.config.verbose;

    if env.config.dump_tokens {
        let tokens = Lexer::new(source).tokenize_all()?;
        eprintln!("=== Tokens: {} ===", path.display());
        for token in &tokens {
            eprintln!("  {:?} @ {}..{}", token.kind, token.span.start, token.span.end);
        }
        eprintln!("=== End Tokens ===\n");
    }

    if verbose {
        eprintln!("Parsing {}...", path.display());
    }
    let ast = parse(source)?;

    if env.config.dump_ast {
        eprintln!("=== AST: {} ===", path.display());
        eprintln!("{:#?}", ast);
        eprintln!("=== End AST ===\n");
    }

    if verbose {
        eprintln!("Lowering {}...", path.display());
    }
    let mut module = sema::lower_module(env, id, &ast)?;

    if verbose {
        eprintln!("Checking {}...", path.display());
    }
    sema::check_module(env, &mut module)?;

    Ok(module)
}

/// The configured entry point must be an exported `func<void>`
fn verify_runtime_entry(env: &Environment, entry: ModuleId) -> CompileResult<()> {
    let Some(name) = &env.config.runtime_entry else {
        return Ok(());
    };

    let root = env.module(entry).root;
    let export = env
        .contexts
        .get(root)
        .exports
        .get(name)
        .ok_or_else(|| CompileError::reference(format!("runtime entry {name} is not exported")))?;

    let entry_type = Type::func(None, Vec::new());
    if export.kind != ExportKind::Function || !env.types.equals(&export.ty, &entry_type) {
        return Err(CompileError::type_error(format!(
            "runtime entry {name} must be func<void>, found {}",
            env.types.describe(&export.ty)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn env_with(files: &[(&str, &str)], config: CompileConfig) -> Environment {
        let mut loader = MemoryLoader::new();
        for (path, source) in files {
            loader.add_file(*path, *source);
        }
        Environment::new(config, Box::new(loader))
    }

    fn runtime(entry: &str) -> CompileConfig {
        CompileConfig {
            runtime: true,
            runtime_entry: Some(entry.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_runtime_entry_must_be_exported() {
        let mut env = env_with(&[("main.bt", "func main() { }")], runtime("main"));
        let err = compile(&mut env, Path::new("main.bt")).unwrap_err();
        assert!(err.is_reference_error());
    }

    #[test]
    fn test_runtime_entry_signature() {
        let mut env = env_with(&[("main.bt", "func main() { } export main;")], runtime("main"));
        assert!(compile(&mut env, Path::new("main.bt")).is_ok());

        let mut env = env_with(
            &[("main.bt", "func int:main() { return 0; } export main;")],
            runtime("main"),
        );
        assert!(compile(&mut env, Path::new("main.bt")).unwrap_err().is_type_error());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_compiling() {
        let config = CompileConfig {
            runtime_entry: Some("main".to_string()),
            ..Default::default()
        };
        let mut env = env_with(&[], config);
        let err = compile(&mut env, Path::new("main.bt")).unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn test_failed_file_points_at_innermost_module() {
        let mut env = env_with(
            &[
                ("main.bt", "import util;"),
                ("util.bt", "var x = 1; var x = 2;"),
            ],
            CompileConfig::default(),
        );
        assert!(compile(&mut env, Path::new("main.bt")).is_err());
        assert_eq!(env.failed_file(), Some(PathBuf::from("util.bt").as_path()));
    }
}
