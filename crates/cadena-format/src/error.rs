//! Error types for format operations.

use cadena_core::Encoding;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening, reading or writing audio files.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Failed to open a file
    #[error("can't open `{path}`: {source}")]
    Open {
        /// Path that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// WAV codec error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Generic I/O error during read/write
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file type could not be determined or is not supported
    #[error("`{path}`: unknown or unsupported file type `{kind}`")]
    UnknownType {
        /// Path being opened.
        path: PathBuf,
        /// The type that was requested or detected.
        kind: String,
    },

    /// Raw audio was opened without a complete format description
    #[error("raw audio needs rate, channels, encoding and sample size to be specified")]
    RawSpecIncomplete,

    /// An encoding no backend implements
    #[error("unsupported sample encoding: {0}")]
    UnsupportedEncoding(Encoding),

    /// An encoding/size combination no backend implements
    #[error("unsupported sample size for {encoding}: {bits} bits")]
    UnsupportedSize {
        /// Requested encoding.
        encoding: Encoding,
        /// Requested width in bits.
        bits: u32,
    },

    /// Seek requested on a stream that cannot seek
    #[error("this stream does not support seeking")]
    Unseekable,

    /// Playlist file problems
    #[error("playlist `{path}`: {message}")]
    Playlist {
        /// Playlist path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FormatError>;

impl FormatError {
    /// Create an open error.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormatError::Open {
            path: path.into(),
            source,
        }
    }
}
