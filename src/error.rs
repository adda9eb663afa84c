//! Errors reported by the optimization stage.

use thiserror::Error;

/// Failures raised while optimizing a tree or allocating registers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptError {
    /// Both operands of a `/` are literals and the divisor is zero.
    #[error("division by zero in constant expression '{expr}' (method '{method}')")]
    DivisionByZero {
        /// Enclosing method.
        method: String,
        /// The offending expression, rendered in source form.
        expr: String,
    },
    /// The interference graph of `method` cannot be colored within `budget`
    /// registers.
    #[error(
        "method '{method}' cannot be allocated within {budget} registers ({reserved} reserved for receiver and parameters)"
    )]
    RegisterPressure {
        method: String,
        /// Requested register total, including reserved slots.
        budget: usize,
        reserved: usize,
    },
    /// A node or instruction did not have the shape its kind promises.
    ///
    /// This is a broken contract with the front-end, not a user error.
    #[error("malformed input: {0}")]
    Malformed(String),
    /// A configuration value could not be parsed.
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidConfig { key: String, value: String },
}

impl OptError {
    /// Shorthand for [`OptError::Malformed`].
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        OptError::Malformed(msg.into())
    }
}
