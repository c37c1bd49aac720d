// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run. Per-job failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("job acquisition failed: {0}")]
    Acquisition(String),

    #[error("failed to write results to {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn authentication(err: impl std::fmt::Display) -> Self {
        PipelineError::Authentication(format!("{:#}", err))
    }

    pub fn acquisition(err: impl std::fmt::Display) -> Self {
        PipelineError::Acquisition(format!("{:#}", err))
    }
}
