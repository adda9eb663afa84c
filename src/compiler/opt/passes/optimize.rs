//! Optimization Pipeline
//!
//! Executes the optimization passes on an attributed abstract syntax tree
//! (_AST_) and on the intermediate representation (_IR_) of each method,
//! based on user-specified options.

use log::debug;

use crate::Result;
use crate::compiler::ast::Ast;
use crate::compiler::ir::Method;
use crate::compiler::opt::passes::{fold_constants, propagate_constants};
use crate::compiler::opt::regalloc::{Allocation, allocate_registers};
use crate::opts::Opts;

/// Runs constant folding and constant propagation over `ast`, alternately,
/// until a round changes nothing. Returns the number of rounds run, zero if
/// `opts` does not enable them.
///
/// Each pass can expose work for the other: propagation turns identifiers
/// into literals that can be folded, and folding turns expressions into
/// literals that can be propagated.
///
/// # Errors
///
/// Returns the first error raised by either pass.
pub fn optimize_ast(ast: &mut Ast, opts: &Opts) -> Result<usize> {
    if !opts.optimize {
        return Ok(0);
    }

    let mut rounds = 0;

    loop {
        rounds += 1;

        let folded = fold_constants(ast)?;
        let propagated = propagate_constants(ast)?;

        if !folded && !propagated {
            break;
        }
    }

    debug!("AST optimization reached a fixed point after {rounds} rounds");

    Ok(rounds)
}

/// Allocates registers for every method in `methods`, according to the
/// specified `opts`. Returns one allocation per method, in order, or none if
/// allocation is disabled.
///
/// # Errors
///
/// Returns the first method's error, leaving later methods untouched.
pub fn optimize_ir(methods: &mut [Method], opts: &Opts) -> Result<Vec<Allocation>> {
    let Some(budget) = opts.registers else {
        return Ok(vec![]);
    };

    methods
        .iter_mut()
        .map(|method| allocate_registers(method, budget))
        .collect()
}
