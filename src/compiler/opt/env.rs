//! Constant Environment
//!
//! Maps variable names to the literal they are known to hold at the current
//! program point, on the current path. A missing entry means "unknown".

use std::collections::HashMap;

use crate::compiler::ast::Literal;

/// Known-constant bindings along one control-flow path.
///
/// Forked by value at a conditional, one copy per branch, and merged back at
/// the join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstEnv {
    bindings: HashMap<String, Literal>,
}

impl ConstEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, var: &str) -> Option<Literal> {
        self.bindings.get(var).copied()
    }

    /// Records that `var` holds `value`, returning the previous binding.
    pub fn insert(&mut self, var: &str, value: Literal) -> Option<Literal> {
        self.bindings.insert(var.to_string(), value)
    }

    /// Forgets `var`, returning the binding it had.
    pub fn remove(&mut self, var: &str) -> Option<Literal> {
        self.bindings.remove(var)
    }

    /// Forgets every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, var: &str) -> bool {
        self.bindings.contains_key(var)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns an independent copy for one branch of a conditional.
    #[inline]
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Joins the environments of two paths: a binding survives only if both
    /// paths agree on it, key and value. This is the per-variable meet, with a
    /// missing entry acting as non-constant rather than as unreached.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        self.bindings
            .retain(|var, value| other.bindings.get(var) == Some(value));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_fork_is_independent() {
        let mut env = ConstEnv::new();
        env.insert("x", Literal::Int(5));

        let mut branch = env.fork();
        branch.insert("x", Literal::Int(6));
        branch.insert("y", Literal::Bool(true));

        assert_eq!(env.get("x"), Some(Literal::Int(5)));
        assert!(!env.contains("y"));
    }

    #[test]
    fn env_merge_keeps_agreeing_bindings() {
        let mut then = ConstEnv::new();
        then.insert("x", Literal::Int(5));
        then.insert("y", Literal::Int(1));
        then.insert("z", Literal::Bool(true));

        let mut otherwise = ConstEnv::new();
        otherwise.insert("x", Literal::Int(5));
        otherwise.insert("y", Literal::Int(2));

        let merged = then.merge(&otherwise);

        assert_eq!(merged.get("x"), Some(Literal::Int(5)));
        assert_eq!(merged.get("y"), None);
        assert_eq!(merged.get("z"), None);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn env_merge_distinguishes_int_from_bool() {
        let mut a = ConstEnv::new();
        a.insert("v", Literal::Int(1));
        let mut b = ConstEnv::new();
        b.insert("v", Literal::Bool(true));

        assert!(a.merge(&b).is_empty());
    }

    #[test]
    fn env_remove_and_clear() {
        let mut env = ConstEnv::new();
        env.insert("a", Literal::Int(0));
        env.insert("b", Literal::Int(0));

        assert_eq!(env.remove("a"), Some(Literal::Int(0)));
        assert_eq!(env.remove("a"), None);

        env.clear();
        assert!(env.is_empty());
    }
}
