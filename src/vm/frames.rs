//! VM call frames

use std::collections::HashMap;

use crate::runtime::value::Value;

/// One function activation: the temp table and the frame-local
/// variables (parameters plus declared names)
#[derive(Debug, Default)]
pub struct Frame {
    /// Function name, for diagnostics
    pub name: String,
    /// Temp id to value; a temp is written exactly once per activation
    pub temps: HashMap<usize, Value>,
    /// Local variable storage
    pub locals: HashMap<String, Value>,
}

impl Frame {
    /// Create a frame for a function activation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            temps: HashMap::new(),
            locals: HashMap::new(),
        }
    }
}
