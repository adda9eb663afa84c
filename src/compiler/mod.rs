//! Optimization stage of the compiler, between semantic analysis and code
//! generation.

pub mod ast;
pub mod ir;
pub mod opt;
