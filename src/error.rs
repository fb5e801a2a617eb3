//! Error types for FitAI Core

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid profile: {field} {reason}")]
    InvalidProfile { field: &'static str, reason: String },

    #[error("Invalid macro split: {0}")]
    InvalidMacroSplit(String),

    #[error("Invalid meal entry: {0}")]
    InvalidMeal(String),

    #[error("Invalid weight sample: {0} kg")]
    InvalidWeight(f64),

    #[error("Failed to parse nutrition estimate: {0}")]
    EstimateParse(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ComputeError {
    pub(crate) fn invalid_profile(field: &'static str, reason: impl Into<String>) -> Self {
        ComputeError::InvalidProfile {
            field,
            reason: reason.into(),
        }
    }

    /// True when the error stems from incomplete or out-of-range profile data
    pub fn is_invalid_profile(&self) -> bool {
        matches!(self, ComputeError::InvalidProfile { .. })
    }
}
