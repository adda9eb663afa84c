//! Optimization stage for a small Java-like language.
//!
//! Sits between semantic analysis and code generation: constant folding and
//! constant propagation over the attributed _AST_, and liveness-driven
//! graph-coloring register allocation over each method's _IR_.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::use_self)]
#![allow(clippy::redundant_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod compiler;
pub mod error;
pub mod opts;

pub use error::OptError;
pub use opts::{Opts, RegisterBudget};

pub type Result<T> = std::result::Result<T, OptError>;
