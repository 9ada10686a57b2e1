//! Compiler configuration

use crate::common::{CompileError, CompileResult};
use std::path::PathBuf;

/// Options consulted by the front end
#[derive(Debug, Clone, Default)]
pub struct CompileConfig {
    /// A runtime initializer is required
    pub runtime: bool,
    /// Exported `func<void>` used as the program entry point
    pub runtime_entry: Option<String>,
    pub debug_info: bool,
    pub debug_info_output: Option<PathBuf>,
    pub verbose: bool,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_ir: bool,
}

impl CompileConfig {
    pub fn validate(&self) -> CompileResult<()> {
        if self.runtime_entry.is_some() && !self.runtime {
            return Err(CompileError::config("a runtime entry requires the runtime to be enabled"));
        }
        if self.debug_info_output.is_some() && !self.debug_info {
            return Err(CompileError::config("a debug info output path requires debug info"));
        }
        Ok(())
    }
}
