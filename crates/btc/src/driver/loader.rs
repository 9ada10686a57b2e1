//! Module source loading

use crate::common::{CompileError, CompileResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of BType sources
pub const SOURCE_EXTENSION: &str = "bt";

/// Maps import paths to files and reads their source
pub trait SourceLoader {
    /// File imported as `path` from the module at `importer`
    fn resolve(&self, importer: &Path, path: &[String]) -> PathBuf {
        let mut resolved = importer.parent().map(Path::to_path_buf).unwrap_or_default();
        for segment in path {
            resolved.push(segment);
        }
        resolved.set_extension(SOURCE_EXTENSION);
        resolved
    }

    fn read(&self, path: &Path) -> CompileResult<String>;
}

/// Loads modules from the filesystem
#[derive(Debug, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn read(&self, path: &Path) -> CompileResult<String> {
        if !path.exists() {
            return Err(CompileError::reference(format!(
                "module {} could not be found",
                path.display()
            )));
        }
        Ok(fs::read_to_string(path)?)
    }
}

/// Serves modules from memory
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.add_file(path, source);
        self
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn read(&self, path: &Path) -> CompileResult<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            CompileError::reference(format!("module {} could not be found", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_is_relative_to_importer() {
        let loader = MemoryLoader::new();
        let path = ["util".to_string(), "math".to_string()];
        assert_eq!(
            loader.resolve(Path::new("src/main.bt"), &path),
            PathBuf::from("src/util/math.bt")
        );
        assert_eq!(loader.resolve(Path::new("main.bt"), &path[1..]), PathBuf::from("math.bt"));
    }

    #[test]
    fn test_memory_loader_reports_missing_module() {
        let loader = MemoryLoader::new().with_file("a.bt", "var x = 1;");
        assert_eq!(loader.read(Path::new("a.bt")).unwrap(), "var x = 1;");
        assert!(loader.read(Path::new("b.bt")).unwrap_err().is_reference_error());
    }
}
