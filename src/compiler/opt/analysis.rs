//! Data Flow Analysis
//!
//! Generic framework for forward and backward data-flow analyses over an
//! instruction-level control-flow graph (_CFG_).

use log::trace;

use crate::compiler::opt::cfg::Cfg;

/// Trait for performing data-flow analysis over a control-flow graph.
pub trait DataFlowAnalysis {
    /// Information being tracked during analysis.
    type Fact: Clone + PartialEq;

    /// Returns `true` if this is a forward analysis.
    fn is_forward(&self) -> bool;

    /// Returns the initial fact at every program point (e.g., identity element
    /// for the `meet` function).
    fn initial(&self) -> Self::Fact;

    /// Propagates `incoming` across instruction `inst`, in the direction of the
    /// analysis, returning the fact on the other side.
    fn transfer(&self, inst: usize, incoming: &Self::Fact) -> Self::Fact;

    /// Merges facts from multiple execution paths (predecessors or successors).
    /// An empty slice yields the fact at the method boundary.
    fn meet(&self, facts: &[&Self::Fact]) -> Self::Fact;
}

/// Facts just before and just after every instruction, indexed like the
/// instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facts<F> {
    pub before: Vec<F>,
    pub after: Vec<F>,
}

impl<F: Clone> Facts<F> {
    fn new(len: usize, initial: &F) -> Self {
        Self {
            before: vec![initial.clone(); len],
            after: vec![initial.clone(); len],
        }
    }
}

/// Makes one pass over every instruction, recomputing its facts from those of
/// its neighbors. Returns `true` if any fact changed.
///
/// Backward analyses visit instructions last to first, forward analyses first
/// to last; any order reaches the same fixed point, this one just gets there
/// in fewer passes for straight-line code.
pub fn iterate<A: DataFlowAnalysis>(cfg: &Cfg, a: &A, facts: &mut Facts<A::Fact>) -> bool {
    let mut changed = false;

    let order: Vec<usize> = if a.is_forward() {
        (0..cfg.len()).collect()
    } else {
        (0..cfg.len()).rev().collect()
    };

    for i in order {
        if a.is_forward() {
            let before = {
                let incoming: Vec<_> = cfg.predecessors(i).iter().map(|&p| &facts.after[p]).collect();
                a.meet(&incoming)
            };
            let after = a.transfer(i, &before);

            changed |= store(&mut facts.before[i], before);
            changed |= store(&mut facts.after[i], after);
        } else {
            let after = {
                let incoming: Vec<_> = cfg.successors(i).iter().map(|&s| &facts.before[s]).collect();
                a.meet(&incoming)
            };
            let before = a.transfer(i, &after);

            changed |= store(&mut facts.after[i], after);
            changed |= store(&mut facts.before[i], before);
        }
    }

    changed
}

/// Fixed-point solver for a data-flow analysis over a control-flow graph,
/// which iterates over every instruction until no fact changes.
///
/// Terminates for monotone analyses over finite lattices.
pub fn run_analysis<A: DataFlowAnalysis>(cfg: &Cfg, a: &A) -> Facts<A::Fact> {
    let mut facts = Facts::new(cfg.len(), &a.initial());
    let mut passes = 1;

    while iterate(cfg, a, &mut facts) {
        passes += 1;
    }

    trace!("data-flow analysis converged after {passes} passes");

    facts
}

/// Replaces `slot` with `fact`, returning `true` if they differed.
#[inline]
fn store<F: PartialEq>(slot: &mut F, fact: F) -> bool {
    if *slot == fact {
        false
    } else {
        *slot = fact;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{Instruction, Method, Operand};

    /// Counts the instructions on the longest path from method entry, capped
    /// to keep the lattice finite.
    struct Depth;

    impl DataFlowAnalysis for Depth {
        type Fact = usize;

        fn is_forward(&self) -> bool {
            true
        }

        fn initial(&self) -> usize {
            0
        }

        fn transfer(&self, _inst: usize, incoming: &usize) -> usize {
            (incoming + 1).min(8)
        }

        fn meet(&self, facts: &[&usize]) -> usize {
            facts.iter().map(|f| **f).max().unwrap_or(0)
        }
    }

    #[test]
    fn forward_straight_line() {
        let mut m = Method::new("f", true);
        for _ in 0..3 {
            m.push(Instruction::Single(Operand::Const(0)));
        }
        let cfg = m.build_cfg().unwrap();

        let facts = run_analysis(&cfg, &Depth);

        assert_eq!(facts.before, [0, 1, 2]);
        assert_eq!(facts.after, [1, 2, 3]);
    }

    #[test]
    fn forward_loop_saturates() {
        let mut m = Method::new("f", true);
        m.label("top");
        m.push(Instruction::Single(Operand::Const(0)));
        m.push(Instruction::Goto("top".into()));
        let cfg = m.build_cfg().unwrap();

        let mut facts = run_analysis(&cfg, &Depth);

        assert_eq!(facts.after, [8, 8]);
        assert!(!iterate(&cfg, &Depth, &mut facts));
    }
}
