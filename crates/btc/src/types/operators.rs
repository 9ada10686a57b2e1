//! Operator-overload registry
//!
//! `operator (T:a OP U:b) R { ... }` declarations register an implementing
//! function for the `(T, U, OP)` triple. The checker consults this table
//! before applying any built-in binary or subscript semantics.

use super::Type;
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::OverloadOp;
use std::collections::HashMap;

/// Implementation registered for an operator triple
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    /// Assigned name of the implementing function
    pub function: String,
    pub return_type: Type,
}

/// Compile-time table mapping `(left key, right key, op)` to an implementation
///
/// Keys are produced by [`TypeTable::key`](super::TypeTable::key).
#[derive(Debug, Default)]
pub struct OperatorRegistry {
    overloads: HashMap<(String, String, OverloadOp), Overload>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        left: String,
        right: String,
        op: OverloadOp,
        overload: Overload,
    ) -> CompileResult<()> {
        let key = (left, right, op);
        if self.overloads.contains_key(&key) {
            return Err(CompileError::redeclaration(format!(
                "operator ({} {} {})",
                key.0, key.2, key.1
            )));
        }
        self.overloads.insert(key, overload);
        Ok(())
    }

    pub fn lookup(&self, left: &str, right: &str, op: OverloadOp) -> Option<&Overload> {
        self.overloads
            .get(&(left.to_string(), right.to_string(), op))
    }

    pub fn len(&self) -> usize {
        self.overloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overloads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::BinOp;

    fn add_overload() -> Overload {
        Overload {
            function: "vecAdd$3".to_string(),
            return_type: Type::int(),
        }
    }

    #[test]
    fn test_lookup_is_keyed_by_both_sides_and_op() {
        let mut registry = OperatorRegistry::new();
        registry
            .register("Vec$1".into(), "Vec$1".into(), OverloadOp::Binary(BinOp::Add), add_overload())
            .unwrap();

        assert_eq!(
            registry.lookup("Vec$1", "Vec$1", OverloadOp::Binary(BinOp::Add)),
            Some(&add_overload())
        );
        assert!(registry.lookup("Vec$1", "Vec$1", OverloadOp::Binary(BinOp::Sub)).is_none());
        assert!(registry.lookup("Vec$1", "int", OverloadOp::Binary(BinOp::Add)).is_none());
        assert!(registry.lookup("Vec$1", "Vec$1", OverloadOp::Subscript).is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = OperatorRegistry::new();
        registry
            .register("a".into(), "b".into(), OverloadOp::Subscript, add_overload())
            .unwrap();
        let err = registry
            .register("a".into(), "b".into(), OverloadOp::Subscript, add_overload())
            .unwrap_err();
        assert!(err.is_reference_error());
        assert_eq!(registry.len(), 1);
    }
}
