//! BType compiler front end
//!
//! This library parses BType source, resolves every name against a tree of
//! lexical scopes, analyzes closures and produces a fully type-checked IR
//! for code generators to consume.
//!
//! ## Architecture
//!
//! The compiler is organized into:
//! - **Frontend** (`frontend/`): Lexer, AST and parser
//! - **Semantic analysis** (`sema/`): Contexts, closure analysis, lowering and checking
//! - **IR** (`ir/`): Typed intermediate representation
//! - **Types** (`types/`): Type representation, struct layout and operator overloads
//! - **Driver** (`driver/`): Configuration, module loading and the compile pipeline
//! - **Common** (`common/`): Shared infrastructure (errors, spans, arena ids)

pub mod common;
pub mod types;
pub mod frontend;
pub mod ir;
pub mod sema;
pub mod driver;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use driver::{compile, CompileConfig, Environment, FsLoader, MemoryLoader, SourceLoader};
