//! Register Allocation
//!
//! Assigns virtual registers to the local variables of a method so that
//! variables that are never live at the same time share a register. The
//! receiver and parameters keep their leading slots; locals are packed after
//! them according to a coloring of the interference graph.

pub mod interference;

use log::{debug, warn};

use crate::compiler::ir::Method;
use crate::compiler::opt::liveness;
use crate::opts::RegisterBudget;
use crate::{OptError, Result};

pub use interference::{Coloring, InterferenceGraph};

/// Outcome of allocating one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub method: String,
    /// Registers actually occupied, including the receiver and parameter
    /// slots. May be below the budget: see [`Coloring::colors_used`].
    pub registers: usize,
    /// Color (register offset past the reserved slots) of each local.
    pub coloring: Coloring,
}

/// Runs liveness analysis, builds the interference graph, colors it within
/// `budget` and rewrites the virtual register of every local variable in
/// `method`'s variable table.
///
/// # Errors
///
/// Returns an error if the method's control flow is malformed, or if the
/// locals cannot be colored within the budget. A failed allocation leaves the
/// variable table untouched.
pub fn allocate_registers(method: &mut Method, budget: RegisterBudget) -> Result<Allocation> {
    let cfg = method.build_cfg()?;
    let live = liveness::analyze(method, &cfg);
    let graph = InterferenceGraph::build(method, &live);

    let reserved = method.reserved_slots();

    let coloring = match budget {
        RegisterBudget::Minimal => graph.color_minimal(),
        RegisterBudget::AtMost(n) => n
            .checked_sub(reserved)
            .and_then(|k| graph.color(k))
            .ok_or_else(|| {
                warn!(
                    "method '{}': {} locals do not fit in {n} registers",
                    method.name,
                    graph.len()
                );
                OptError::RegisterPressure {
                    method: method.name.clone(),
                    budget: n,
                    reserved,
                }
            })?,
    };

    debug_assert!(coloring.is_valid_for(&graph));

    for (var, color) in coloring.iter() {
        method
            .descriptor_mut(var)
            .ok_or_else(|| OptError::malformed(format!("'{var}' missing from variable table")))?
            .set_virtual_reg(reserved + color);
    }

    let registers = reserved + coloring.colors_used();

    debug!(
        "method '{}': {} locals in {} registers ({reserved} reserved)",
        method.name,
        graph.len(),
        registers
    );

    Ok(Allocation {
        method: method.name.clone(),
        registers,
        coloring,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{BinaryOp, Instruction, Operand};

    fn add(lhs: Operand, rhs: Operand) -> Instruction {
        Instruction::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        }
    }

    /// Instance method `f(p)`: `a = p + 1; b = a + 1; c = b + a; ret c`.
    /// `a` and `b` interfere, `c` can reuse `b`'s register.
    fn sample() -> Method {
        let mut m = Method::new("f", false);
        m.add_param("p").add_local("a").add_local("b").add_local("c");
        m.push(Instruction::assign("a", add(Operand::var("p"), Operand::Const(1))));
        m.push(Instruction::assign("b", add(Operand::var("a"), Operand::Const(1))));
        m.push(Instruction::assign("c", add(Operand::var("b"), Operand::var("a"))));
        m.push(Instruction::Return(Some(Operand::var("c"))));
        m
    }

    fn reg(m: &Method, var: &str) -> usize {
        m.descriptor(var).unwrap().virtual_reg()
    }

    #[test]
    fn allocate_minimal_packs_locals_after_reserved() {
        let mut m = sample();

        let alloc = allocate_registers(&mut m, RegisterBudget::Minimal).unwrap();

        assert_eq!(alloc.coloring.k(), 2);
        assert_eq!(alloc.registers, 4);
        assert_eq!(reg(&m, "this"), 0);
        assert_eq!(reg(&m, "p"), 1);
        assert_ne!(reg(&m, "a"), reg(&m, "b"));
        for var in ["a", "b", "c"] {
            assert!((2..4).contains(&reg(&m, var)));
        }
    }

    #[test]
    fn allocate_within_budget() {
        let mut m = sample();

        let alloc = allocate_registers(&mut m, RegisterBudget::AtMost(6)).unwrap();

        // Smallest valid colors: the budget is an upper bound, not a target.
        assert_eq!(alloc.coloring.k(), 4);
        assert_eq!(alloc.coloring.colors_used(), 2);
        assert_eq!(alloc.registers, 4);
        assert!(m.locals().all(|v| reg(&m, v) < alloc.registers));
    }

    #[test]
    fn allocate_budget_too_small() {
        let mut m = sample();
        let before = m.clone();

        let err = allocate_registers(&mut m, RegisterBudget::AtMost(3)).unwrap_err();

        assert_eq!(
            err,
            OptError::RegisterPressure {
                method: "f".into(),
                budget: 3,
                reserved: 2,
            }
        );
        assert_eq!(m.var_table(), before.var_table());
    }

    #[test]
    fn allocate_budget_below_reserved_slots() {
        let mut m = sample();

        let err = allocate_registers(&mut m, RegisterBudget::AtMost(1)).unwrap_err();

        assert!(matches!(err, OptError::RegisterPressure { budget: 1, .. }));
    }

    #[test]
    fn allocate_zero_locals_for_live_variable() {
        let mut m = Method::new("main", true);
        m.add_local("x");
        m.push(Instruction::assign("x", Instruction::Single(Operand::Const(1))));
        m.push(Instruction::Return(Some(Operand::var("x"))));

        let err = allocate_registers(&mut m, RegisterBudget::AtMost(0)).unwrap_err();
        assert!(matches!(err, OptError::RegisterPressure { .. }));
    }

    #[test]
    fn allocate_method_without_locals() {
        let mut m = Method::new("id", true);
        m.add_param("x");
        m.push(Instruction::Return(Some(Operand::var("x"))));

        let alloc = allocate_registers(&mut m, RegisterBudget::Minimal).unwrap();

        assert_eq!(alloc.registers, 1);
        assert!(alloc.coloring.is_empty());
    }
}
