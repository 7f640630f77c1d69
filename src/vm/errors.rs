//! VM errors

use thiserror::Error;

/// VM result
pub type VmResult<T> = Result<T, VmError>;

/// Runtime failures; any of these aborts execution immediately
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("unsupported types for '{op}': {left} and {right}")]
    UnsupportedTypes {
        op: String,
        left: String,
        right: String,
    },

    #[error("unknown callee '{0}'")]
    UnknownCallee(String),

    #[error("unknown label '{label}' in function '{function}'")]
    UnknownLabel { function: String, label: String },

    #[error("branch condition must be conditionable, found {found}")]
    BadCondition { found: String },

    #[error("module has no 'main' function")]
    NoMain,

    #[error("call depth exceeded ({0})")]
    CallDepthExceeded(usize),

    #[error("index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("value of kind {found} cannot be indexed")]
    NotIndexable { found: String },

    #[error("value of kind {found} has no members")]
    NotAStruct { found: String },

    #[error("struct '{name}' has no field '{field}'")]
    UnknownField { name: String, field: String },

    #[error("no struct layout named '{0}'")]
    UnknownStruct(String),

    #[error("value of kind {0} cannot be a map or set key")]
    InvalidKey(String),

    #[error("malformed instruction: {0}")]
    InvalidInstruction(String),
}
