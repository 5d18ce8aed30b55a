//! Audio file format layer for the cadena pipeline.
//!
//! This crate provides:
//! - the [`FormatReader`] / [`FormatWriter`] traits the engine consumes
//! - WAV support via [`wav`] (backed by `hound`)
//! - headerless PCM support via [`raw`]
//! - the sample-discarding [`null`] backend
//! - playlist (`.m3u` / `.pls`) expansion via [`playlist`]
//!
//! Streams deliver and accept full-scale 32-bit samples ([`Sample`]);
//! conversion to and from the stored width happens inside each backend.

pub mod error;
pub mod null;
pub mod playlist;
pub mod raw;
pub mod wav;

pub use error::{FormatError, Result};
pub use playlist::{expand_playlist, is_playlist};

use cadena_core::{Sample, SignalInfo, SignalSpec};
use std::path::Path;

/// An opened input stream.
///
/// Readers resolve any unset format hints at open time and expose the final
/// [`SignalSpec`]. `read` fills as much of `buf` as it can and returns the
/// number of samples delivered; `0` means end of stream.
pub trait FormatReader {
    /// The resolved format of this stream.
    fn signal(&self) -> SignalSpec;

    /// Total length in samples across all channels; `0` when unknown.
    fn length(&self) -> u64;

    /// Metadata comment attached to the file, if any.
    fn comment(&self) -> Option<&str> {
        None
    }

    /// Whether [`FormatReader::seek`] is usable on this stream.
    fn seekable(&self) -> bool {
        false
    }

    /// Whether this stream is an audio device rather than a file.
    fn is_device(&self) -> bool {
        false
    }

    /// Read up to `buf.len()` samples. Returns the number delivered.
    fn read(&mut self, buf: &mut [Sample]) -> Result<usize>;

    /// Position the stream at an absolute sample offset.
    fn seek(&mut self, offset: u64) -> Result<()> {
        let _ = offset;
        Err(FormatError::Unseekable)
    }

    /// Samples clipped while converting into the engine's domain.
    fn clips(&self) -> u64 {
        0
    }
}

/// An opened output stream.
pub trait FormatWriter {
    /// The format this stream was opened with.
    fn signal(&self) -> SignalSpec;

    /// Write samples from `buf`. Returns the number accepted; `0` signals a
    /// write failure the caller should treat as fatal.
    fn write(&mut self, buf: &[Sample]) -> Result<usize>;

    /// Flush and close the stream, patching headers where the format needs
    /// it. Must be called exactly once.
    fn finalize(&mut self) -> Result<()>;

    /// Samples clipped while converting out of the engine's domain.
    fn clips(&self) -> u64 {
        0
    }
}

/// File types the dispatcher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// RIFF WAVE.
    Wav,
    /// Headerless PCM.
    Raw,
    /// The bit bucket.
    Null,
}

impl FileType {
    /// Canonical name, as accepted by type hints.
    pub fn name(self) -> &'static str {
        match self {
            FileType::Wav => "wav",
            FileType::Raw => "raw",
            FileType::Null => "null",
        }
    }

    /// Parse a type hint.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(FileType::Wav),
            "raw" | "pcm" => Some(FileType::Raw),
            "null" => Some(FileType::Null),
            _ => None,
        }
    }
}

/// Work out the type of `filename` from a hint, the special `-n` name, or
/// the file extension.
pub fn identify(filename: &str, type_hint: Option<&str>) -> Option<FileType> {
    if let Some(hint) = type_hint {
        return FileType::from_hint(hint);
    }
    if filename == "-n" {
        return Some(FileType::Null);
    }
    let ext = Path::new(filename).extension()?.to_str()?;
    FileType::from_hint(ext)
}

/// Open `filename` for reading.
///
/// `hints` supplies format fields the file itself cannot (required for raw
/// streams, optional overrides elsewhere). The special name `-` reads raw
/// samples from stdin and requires complete hints plus a `raw` type hint.
pub fn open_read(
    filename: &str,
    hints: &SignalInfo,
    type_hint: Option<&str>,
) -> Result<Box<dyn FormatReader>> {
    let kind = identify(filename, type_hint).ok_or_else(|| FormatError::UnknownType {
        path: filename.into(),
        kind: type_hint.unwrap_or("(undetected)").to_string(),
    })?;
    match kind {
        FileType::Wav => Ok(Box::new(wav::WavReader::open(filename)?)),
        FileType::Raw => {
            if filename == "-" {
                Ok(Box::new(raw::RawReader::from_stdin(hints)?))
            } else {
                Ok(Box::new(raw::RawReader::open(filename, hints)?))
            }
        }
        FileType::Null => Ok(Box::new(null::NullReader::new(hints))),
    }
}

/// Open `filename` for writing with a fully resolved format.
///
/// `length_hint` is the expected total sample count (0 when unknown); the
/// built-in backends don't need it, but it is part of the contract so
/// formats that must write a length up front can use it. The special name
/// `-` writes raw samples to stdout.
pub fn open_write(
    filename: &str,
    spec: SignalSpec,
    comment: Option<&str>,
    length_hint: u64,
    type_hint: Option<&str>,
) -> Result<Box<dyn FormatWriter>> {
    let _ = length_hint;
    let kind = identify(filename, type_hint).ok_or_else(|| FormatError::UnknownType {
        path: filename.into(),
        kind: type_hint.unwrap_or("(undetected)").to_string(),
    })?;
    match kind {
        FileType::Wav => Ok(Box::new(wav::WavWriter::create(filename, spec, comment)?)),
        FileType::Raw => {
            if filename == "-" {
                Ok(Box::new(raw::RawWriter::to_stdout(spec)?))
            } else {
                Ok(Box::new(raw::RawWriter::create(filename, spec)?))
            }
        }
        FileType::Null => Ok(Box::new(null::NullWriter::new(spec))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_by_extension() {
        assert_eq!(identify("a.wav", None), Some(FileType::Wav));
        assert_eq!(identify("a.WAV", None), Some(FileType::Wav));
        assert_eq!(identify("a.raw", None), Some(FileType::Raw));
        assert_eq!(identify("a.pcm", None), Some(FileType::Raw));
        assert_eq!(identify("a.mp3", None), None);
        assert_eq!(identify("noext", None), None);
    }

    #[test]
    fn identify_by_hint_wins() {
        assert_eq!(identify("a.wav", Some("raw")), Some(FileType::Raw));
        assert_eq!(identify("-", Some("raw")), Some(FileType::Raw));
    }

    #[test]
    fn identify_null_sentinel() {
        assert_eq!(identify("-n", None), Some(FileType::Null));
    }
}
