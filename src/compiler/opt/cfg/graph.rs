use crate::compiler::ir::{Flow, Method};
use crate::{OptError, Result};

/// Instruction-level control-flow graph (_CFG_) of a method.
///
/// Node `i` is the method's `i`-th instruction. Control leaving the last
/// instruction, returning, or jumping to a label placed after the last
/// instruction reaches the implicit exit and has no successor here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cfg {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl Cfg {
    /// Builds the control-flow graph over the method's current instructions.
    ///
    /// # Errors
    ///
    /// Returns an error if a jump targets a label the method does not define.
    pub fn build(method: &Method) -> Result<Self> {
        /// Adds a directed edge between two instructions, ignoring edges into
        /// the exit and duplicates.
        fn add_edge(cfg: &mut Cfg, from: usize, to: usize) {
            if to >= cfg.successors.len() || cfg.successors[from].contains(&to) {
                return;
            }

            cfg.successors[from].push(to);
            cfg.predecessors[to].push(from);
        }

        let len = method.instructions.len();

        let mut cfg = Self {
            successors: vec![vec![]; len],
            predecessors: vec![vec![]; len],
        };

        let resolve = |label: &str| {
            method.label_target(label).ok_or_else(|| {
                OptError::malformed(format!(
                    "method '{}' jumps to undefined label '{label}'",
                    method.name
                ))
            })
        };

        for (i, inst) in method.instructions.iter().enumerate() {
            match inst.flow() {
                Flow::Return => {}
                Flow::Jump(label) => add_edge(&mut cfg, i, resolve(label)?),
                Flow::CondJump(label) => {
                    add_edge(&mut cfg, i, resolve(label)?);
                    add_edge(&mut cfg, i, i + 1);
                }
                Flow::Next => add_edge(&mut cfg, i, i + 1),
            }
        }

        Ok(cfg)
    }

    #[inline]
    #[must_use]
    pub fn successors(&self, inst: usize) -> &[usize] {
        &self.successors[inst]
    }

    #[inline]
    #[must_use]
    pub fn predecessors(&self, inst: usize) -> &[usize] {
        &self.predecessors[inst]
    }

    /// Returns the number of instructions in the graph.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.successors.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }
}
