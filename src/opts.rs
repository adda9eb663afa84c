//! Optimization options, read from the compiler's key/value configuration.

use std::collections::HashMap;

use crate::{OptError, Result};

/// Configuration key enabling the _AST_ passes.
pub const OPTIMIZE_KEY: &str = "optimize";
/// Configuration key selecting the register budget.
pub const REGISTER_ALLOCATION_KEY: &str = "registerAllocation";

/// How many registers a method may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterBudget {
    /// Use as few registers as the coloring heuristic can find.
    Minimal,
    /// Use at most `n` registers in total, including the receiver and
    /// parameter slots.
    AtMost(usize),
}

impl RegisterBudget {
    /// Interprets the numeric form used on the command line: `0` minimizes,
    /// any positive `n` is an upper bound, and a negative value disables
    /// allocation (`None`).
    #[must_use]
    pub const fn from_count(n: i64) -> Option<Self> {
        match n {
            0 => Some(RegisterBudget::Minimal),
            #[allow(clippy::cast_possible_truncation)]
            n if n > 0 => Some(RegisterBudget::AtMost(n as usize)),
            _ => None,
        }
    }
}

/// Options controlling which optimizations run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Opts {
    /// Run constant folding and constant propagation until neither changes the
    /// tree.
    pub optimize: bool,
    /// Register budget, `None` to keep the front-end's register assignment.
    pub registers: Option<RegisterBudget>,
}

impl Opts {
    /// Builds options from the compiler configuration map.
    ///
    /// Missing keys fall back to defaults: no _AST_ optimization and no
    /// register allocation.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value cannot be parsed.
    pub fn from_config(config: &HashMap<String, String>) -> Result<Self> {
        let optimize = match config.get(OPTIMIZE_KEY).map(|s| s.trim()) {
            None | Some("" | "false") => false,
            Some("true") => true,
            Some(other) => return Err(invalid(OPTIMIZE_KEY, other)),
        };

        let registers = match config.get(REGISTER_ALLOCATION_KEY) {
            None => None,
            Some(raw) => {
                let n = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| invalid(REGISTER_ALLOCATION_KEY, raw))?;
                RegisterBudget::from_count(n)
            }
        };

        Ok(Self {
            optimize,
            registers,
        })
    }

    /// Returns `true` if any pass is enabled.
    #[inline]
    #[must_use]
    pub const fn any_passes_enabled(&self) -> bool {
        self.optimize || self.registers.is_some()
    }
}

fn invalid(key: &str, value: &str) -> OptError {
    OptError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}
