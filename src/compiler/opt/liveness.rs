//! Liveness Analysis
//!
//! Backward data-flow analysis computing, for every instruction of a method,
//! the variables whose current value may still be read (live-in, live-out).

use std::collections::HashSet;

use crate::compiler::ir::{Instruction, Method, Operand};
use crate::compiler::opt::analysis::{DataFlowAnalysis, Facts, iterate, run_analysis};
use crate::compiler::opt::cfg::Cfg;

/// Set of variable names.
pub type VarSet = HashSet<String>;

/// Per-instruction definitions and uses of a method's tracked variables.
#[derive(Debug, Clone)]
pub struct Liveness {
    defs: Vec<VarSet>,
    uses: Vec<VarSet>,
}

impl Liveness {
    /// Computes `def` and `use` sets for every instruction of `method`.
    #[must_use]
    pub fn new(method: &Method) -> Self {
        let defs = method
            .instructions
            .iter()
            .map(|inst| def_set(method, inst))
            .collect();

        let uses = method
            .instructions
            .iter()
            .map(|inst| {
                let mut uses = VarSet::default();
                collect_uses(method, inst, &mut uses);
                uses
            })
            .collect();

        Self { defs, uses }
    }
}

impl DataFlowAnalysis for Liveness {
    type Fact = VarSet;

    fn is_forward(&self) -> bool {
        false
    }

    fn initial(&self) -> Self::Fact {
        // Nothing is live at method exit.
        Self::Fact::default()
    }

    fn transfer(&self, inst: usize, live_out: &Self::Fact) -> Self::Fact {
        // in = use ∪ (out − def)
        let mut live_in: VarSet = live_out.difference(&self.defs[inst]).cloned().collect();
        live_in.extend(self.uses[inst].iter().cloned());
        live_in
    }

    fn meet(&self, facts: &[&Self::Fact]) -> Self::Fact {
        facts.iter().flat_map(|f| f.iter().cloned()).collect()
    }
}

/// Converged liveness information of a method.
#[derive(Debug, Clone)]
pub struct LiveSets {
    analysis: Liveness,
    facts: Facts<VarSet>,
}

impl LiveSets {
    #[inline]
    #[must_use]
    pub fn def(&self, inst: usize) -> &VarSet {
        &self.analysis.defs[inst]
    }

    #[inline]
    #[must_use]
    pub fn uses(&self, inst: usize) -> &VarSet {
        &self.analysis.uses[inst]
    }

    #[inline]
    #[must_use]
    pub fn live_in(&self, inst: usize) -> &VarSet {
        &self.facts.before[inst]
    }

    #[inline]
    #[must_use]
    pub fn live_out(&self, inst: usize) -> &VarSet {
        &self.facts.after[inst]
    }

    /// Returns the number of instructions analyzed.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.facts.before.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.facts.before.is_empty()
    }

    /// Returns `true` if one more solver pass over `cfg` leaves every set
    /// unchanged.
    #[must_use]
    pub fn is_fixed_point(&self, cfg: &Cfg) -> bool {
        let mut facts = self.facts.clone();
        !iterate(cfg, &self.analysis, &mut facts)
    }
}

/// Runs liveness analysis to a fixed point over `method`'s control-flow graph.
#[must_use]
pub fn analyze(method: &Method, cfg: &Cfg) -> LiveSets {
    let analysis = Liveness::new(method);
    let facts = run_analysis(cfg, &analysis);

    LiveSets { analysis, facts }
}

/// An assignment to a tracked variable defines it. Stores into fields and
/// array elements define nothing.
fn def_set(method: &Method, inst: &Instruction) -> VarSet {
    let mut def = VarSet::default();

    if let Instruction::Assign { dst, .. } = inst
        && let Some(name) = dst.as_var()
        && method.is_tracked(name)
    {
        def.insert(name.to_string());
    }

    def
}

fn collect_uses(method: &Method, inst: &Instruction, uses: &mut VarSet) {
    let mut read = |op: &Operand| {
        for name in op.read_vars() {
            if method.is_tracked(name) {
                uses.insert(name.to_string());
            }
        }
    };

    match inst {
        Instruction::Assign { dst, rhs } => {
            // Writing `a[i]` reads `a` and `i`.
            if let Operand::ArrayElement { .. } = dst {
                read(dst);
            }
            collect_uses(method, rhs, uses);
        }
        Instruction::Call { operands, .. } => operands.iter().for_each(read),
        Instruction::Return(val) => {
            if let Some(val) = val {
                read(val);
            }
        }
        Instruction::Unary { operand, .. } | Instruction::Single(operand) => read(operand),
        Instruction::Binary { lhs, rhs, .. } => {
            read(lhs);
            read(rhs);
        }
        // The receiver of a field access is not a use, only the stored value.
        Instruction::PutField { value, .. } => read(value),
        Instruction::Branch { cond, .. } => collect_uses(method, cond, uses),
        Instruction::GetField { .. } | Instruction::Goto(_) => {}
    }
}
