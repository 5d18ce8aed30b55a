//! Engine error taxonomy and exit-code mapping.

use cadena_core::EffectError;
use cadena_format::FormatError;
use thiserror::Error;

/// Errors that abort a session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request itself was invalid (bad combination of inputs, too many
    /// effects, conflicting options).
    #[error("{0}")]
    Usage(String),

    /// The format layer failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// An effect failed to construct, start or run.
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// An effect neither consumed nor produced while both windows were
    /// open; the pipeline cannot make progress.
    #[error("effect `{0}` took and gave no samples")]
    Deadlock(String),

    /// Writing to the output failed.
    #[error("error writing `{path}`: {message}")]
    Write {
        /// Output filename.
        path: String,
        /// Failure description.
        message: String,
    },

    /// The user declined to overwrite an existing output file.
    #[error("`{0}`: not overwriting existing file")]
    OverwriteRefused(String),

    /// Installing the interrupt handler failed.
    #[error("can't install signal handler: {0}")]
    Signal(String),
}

impl EngineError {
    /// Process exit code for this error: 1 for usage problems, 2 for
    /// runtime failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Usage(_) | EngineError::Effect(EffectError::Unknown(_)) => 1,
            _ => 2,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
