//! Error types for the conversion engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the conversion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine executable not found.
    #[error("Conversion engine not found at path: {path}")]
    EngineNotFound { path: PathBuf },

    /// The engine binary exists but its self-check failed.
    #[error("Conversion engine unavailable: {reason}")]
    Unavailable { reason: String },

    /// The engine ran but refused or failed the document.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The engine reported success but produced nothing.
    #[error("Conversion engine produced no output")]
    EmptyOutput,

    /// Attempt exceeded its time bound.
    #[error("Conversion timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The task running the engine call panicked or was cancelled.
    #[error("Conversion task aborted: {reason}")]
    Aborted { reason: String },

    /// License could not be applied.
    #[error("License error: {reason}")]
    License { reason: String },

    /// I/O error while staging input or reading output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    pub fn license(reason: impl Into<String>) -> Self {
        Self::License {
            reason: reason.into(),
        }
    }
}
