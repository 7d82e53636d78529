pub mod context;
pub mod task;

use thiserror::Error;

/// Raised when a stored or submitted enum value is not one of the known variants.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
