//! Error types shared across burnbox crates.

use thiserror::Error;

/// Result alias used throughout burnbox.
pub type BurnboxResult<T> = Result<T, BurnboxError>;

/// Every failure burnbox can report.
///
/// Provisioning treats all of these as fatal: there is no partial-image
/// recovery, the error is logged and propagated to the binary, which exits
/// non-zero.
#[derive(Debug, Error)]
pub enum BurnboxError {
    /// Invalid or unparsable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem layout or file write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// External command exited unsuccessfully or could not be spawned.
    #[error("command `{program}` failed (exit code {code:?}): {message}")]
    Command {
        program: String,
        code: Option<i32>,
        message: String,
    },

    /// An operation ran in the wrong order or against unexpected state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A named resource (service unit, manifest, log file) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Generated file could not be rendered.
    #[error("template error: {0}")]
    Template(String),

    /// Supervisor unit management failure.
    #[error("service error: {0}")]
    Service(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BurnboxError {
    pub fn command(program: impl Into<String>, code: Option<i32>, message: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            code,
            message: message.into(),
        }
    }
}
