use fc_core::ValidationError;
use std::io;
use thiserror::Error;

/// Failure of an external mutate/dump tool. Never retried.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{tool} not found")]
    NotFound { tool: String },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit; `stderr` is the tool's own message.
    #[error("{tool} {args} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        args: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
