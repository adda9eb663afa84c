//! Compiler Optimization
//!
//! Compiler's optimization logic: passes over the attributed abstract syntax
//! tree (_AST_), data-flow analyses over the intermediate representation
//! (_IR_) of each method, and register allocation, which aim to generate more
//! efficient code without changing observable behavior.

pub mod analysis;
pub mod cfg;
pub mod env;
pub mod liveness;
pub mod passes;
pub mod regalloc;

pub use cfg::Cfg;
pub use env::ConstEnv;
