//! Semantic analysis
//!
//! Lowering turns the AST into typed IR while building the context tree
//! and recording closure information; checking then validates every node.

mod builder;
mod check;
mod closure;
mod context;
mod lower;

#[cfg(test)]
mod tests;

pub use builder::{Builder, PendingFunction};
pub use check::{check_module, Checker};
pub use closure::{record_assignment, record_lookup};
pub use context::{BindingKind, Context, ContextTree, Export, ExportKind, ScopeKind};
pub use lower::lower_module;
