//! Closure and side-effect analysis
//!
//! Lowering reports every symbol read and every assignment here. The flags
//! recorded on each [`Context`](super::Context) tell code generation whether
//! a function needs a captured-scope parameter and which names go in it.

use super::context::ContextTree;
use crate::common::ContextId;
use crate::ir::Expr;

/// Record a read of `assigned`, declared in `definer`, from code in `current`
pub fn record_lookup(tree: &mut ContextTree, current: ContextId, definer: ContextId, assigned: &str) {
    if definer == current {
        return;
    }
    if tree.is_root(definer) {
        tree.get_mut(current).accesses_global_scope = true;
        return;
    }

    for id in between(tree, current, definer) {
        let ctx = tree.get_mut(id);
        ctx.accesses_lexical_scope = true;
        ctx.lexical_lookups.insert(assigned.to_string(), definer);
    }
}

/// Record an assignment to `target` made from code in `current`
///
/// The written binding is the root symbol of the target; writes through a
/// call result are not attributed to any binding. Writes to module-level
/// or local bindings leave the flags untouched.
pub fn record_assignment(tree: &mut ContextTree, current: ContextId, target: &Expr) {
    let Some(symbol) = target.root_symbol() else {
        return;
    };
    let definer = symbol.ref_context;
    if definer == current || tree.is_root(definer) {
        return;
    }

    for id in between(tree, current, definer) {
        let ctx = tree.get_mut(id);
        ctx.side_effect_free = false;
        ctx.lexical_modifications.insert(symbol.assigned_name.clone());
    }
}

/// Contexts from `current` (inclusive) up to `definer` (exclusive)
fn between(tree: &ContextTree, current: ContextId, definer: ContextId) -> Vec<ContextId> {
    tree.chain(current)
        .map(|ctx| ctx.id)
        .take_while(|id| *id != definer)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ModuleId, Span};
    use crate::ir::{ExprKind, Symbol};
    use crate::sema::context::ScopeKind;
    use pretty_assertions::assert_eq;

    struct Nest {
        tree: ContextTree,
        root: ContextId,
        outer: ContextId,
        middle: ContextId,
        inner: ContextId,
    }

    fn nest() -> Nest {
        let mut tree = ContextTree::new();
        let root = tree.create(None, ScopeKind::Module(ModuleId(0)));
        let outer = tree.create(Some(root), ScopeKind::Function);
        let middle = tree.create(Some(outer), ScopeKind::Function);
        let inner = tree.create(Some(middle), ScopeKind::Function);
        Nest { tree, root, outer, middle, inner }
    }

    fn symbol(assigned: &str, ref_context: ContextId) -> Expr {
        Expr::new(
            ExprKind::Symbol(Symbol {
                name: "x".to_string(),
                assigned_name: assigned.to_string(),
                ref_context,
                is_func: false,
            }),
            Span::default(),
        )
    }

    #[test]
    fn test_global_read_marks_only_current() {
        let Nest { mut tree, root, middle, inner, .. } = nest();
        record_lookup(&mut tree, inner, root, "g$0");

        assert!(tree.get(inner).accesses_global_scope);
        assert!(!tree.get(middle).accesses_global_scope);
        assert!(!tree.get(inner).accesses_lexical_scope);
    }

    #[test]
    fn test_lexical_read_marks_every_intermediate_context() {
        let Nest { mut tree, outer, middle, inner, .. } = nest();
        record_lookup(&mut tree, inner, outer, "x$1");

        for id in [inner, middle] {
            let ctx = tree.get(id);
            assert!(ctx.accesses_lexical_scope);
            assert_eq!(ctx.lexical_lookups.get("x$1"), Some(&outer));
        }
        assert!(!tree.get(outer).accesses_lexical_scope);
    }

    #[test]
    fn test_local_read_marks_nothing() {
        let Nest { mut tree, inner, .. } = nest();
        record_lookup(&mut tree, inner, inner, "x$1");
        let ctx = tree.get(inner);
        assert!(!ctx.accesses_lexical_scope && !ctx.accesses_global_scope);
    }

    #[test]
    fn test_lexical_mutation_propagates_up_to_definer() {
        let Nest { mut tree, outer, middle, inner, .. } = nest();
        record_assignment(&mut tree, inner, &symbol("x$1", outer));

        for id in [inner, middle] {
            let ctx = tree.get(id);
            assert!(!ctx.side_effect_free);
            assert!(ctx.lexical_modifications.contains("x$1"));
        }
        assert!(tree.get(outer).side_effect_free);
        assert!(tree.get(outer).lexical_modifications.is_empty());
    }

    #[test]
    fn test_member_write_resolves_to_root_symbol() {
        let Nest { mut tree, outer, inner, .. } = nest();
        let target = Expr::new(
            ExprKind::Member {
                base: Box::new(symbol("p$2", outer)),
                member: "x".to_string(),
                is_method: false,
            },
            Span::default(),
        );
        record_assignment(&mut tree, inner, &target);
        assert!(tree.get(inner).lexical_modifications.contains("p$2"));
    }

    #[test]
    fn test_global_and_local_writes_keep_side_effect_free() {
        let Nest { mut tree, root, inner, .. } = nest();
        record_assignment(&mut tree, inner, &symbol("g$0", root));
        record_assignment(&mut tree, inner, &symbol("l$3", inner));
        assert!(tree.get(inner).side_effect_free);
    }

    #[test]
    fn test_write_through_call_result_is_opaque() {
        let Nest { mut tree, outer, inner, .. } = nest();
        let target = Expr::new(
            ExprKind::Member {
                base: Box::new(Expr::new(
                    ExprKind::Call {
                        callee: Box::new(symbol("make$4", outer)),
                        args: Vec::new(),
                    },
                    Span::default(),
                )),
                member: "x".to_string(),
                is_method: false,
            },
            Span::default(),
        );
        record_assignment(&mut tree, inner, &target);
        assert!(tree.get(inner).side_effect_free);
    }
}
