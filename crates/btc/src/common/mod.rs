//! Common infrastructure shared across the front end

mod error;
mod id;
mod span;

pub use error::{CompileError, CompileResult, DiagnosticReporter, ResultExt};
pub use id::{ContextId, FunctionId, ModuleId, StructId};
pub use span::Span;
