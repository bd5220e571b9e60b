//! Script execution options

use serde::{Deserialize, Serialize};

/// Configuration for multi-statement script execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptOptions {
    /// Keep executing after a statement fails, collecting the error into
    /// that statement's outcome. When false, the first failure marks the
    /// remaining statements skipped and surfaces as an execution error.
    pub continue_on_error: bool,
}

impl ScriptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}
