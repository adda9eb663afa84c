//! Tree Optimization
//!
//! Optimization passes that transform an attributed abstract syntax tree
//! (_AST_) in place, and the pipeline that drives them together with
//! register allocation.

pub mod fold;
pub mod optimize;
pub mod propagate;

#[cfg(test)]
mod tree;

pub use fold::fold_constants;
pub use optimize::{optimize_ast, optimize_ir};
pub use propagate::propagate_constants;
