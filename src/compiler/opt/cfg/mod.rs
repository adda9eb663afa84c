//! Control-Flow Graph
//!
//! Control-flow graph over the instructions of an _IR_ method, linking each
//! instruction to the ones that may execute right after it. Used by the
//! intraprocedural data-flow analyses.

pub mod graph;

pub use graph::Cfg;
