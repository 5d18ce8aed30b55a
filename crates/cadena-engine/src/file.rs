//! Input and output file entries: the descriptors the driver owns, from
//! argument parsing through open to teardown.

use crate::error::Result;
use crate::options::ReplayGainMode;
use cadena_core::{SignalInfo, SignalSpec};
use cadena_format::{open_read, FormatReader};

/// One input descriptor plus, once opened, its stream.
pub struct InputFile {
    /// Path, `-` for stdin, or `-n` for the null input.
    pub filename: String,
    /// File type hint overriding extension detection.
    pub filetype: Option<String>,
    /// Format hints for headerless data.
    pub signal: SignalInfo,
    /// Per-input volume; `None` until defaulted at session start.
    pub volume: Option<f64>,
    /// Replay gain in dB, resolved from metadata at open.
    pub replay_gain: Option<f64>,
    /// Clips counted while applying the volume.
    pub volume_clips: u64,
    /// The opened stream.
    pub reader: Option<Box<dyn FormatReader>>,
}

impl InputFile {
    /// Create an unopened entry for `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        InputFile {
            filename: filename.into(),
            filetype: None,
            signal: SignalInfo::default(),
            volume: None,
            replay_gain: None,
            volume_clips: 0,
            reader: None,
        }
    }

    /// Open the stream and resolve replay gain from its metadata.
    pub fn open(&mut self, rg_mode: ReplayGainMode) -> Result<()> {
        let reader = open_read(&self.filename, &self.signal, self.filetype.as_deref())?;
        if let Some(comment) = reader.comment() {
            self.replay_gain = resolve_replay_gain(comment, rg_mode);
        }
        self.reader = Some(reader);
        Ok(())
    }

    /// The resolved format; only valid after [`InputFile::open`].
    pub fn spec(&self) -> SignalSpec {
        self.reader
            .as_ref()
            .map(|r| r.signal())
            .unwrap_or_default()
    }

    /// Total length in wide samples, 0 when unknown.
    pub fn wide_length(&self) -> u64 {
        let spec = self.spec();
        self.reader
            .as_ref()
            .map(|r| r.length() / spec.channels.max(1) as u64)
            .unwrap_or(0)
    }

    /// Clips counted by the format layer while reading.
    pub fn read_clips(&self) -> u64 {
        self.reader.as_ref().map(|r| r.clips()).unwrap_or(0)
    }
}

/// The output descriptor. The stream itself is opened per session by the
/// driver, since sequence mode reopens it for every input.
pub struct OutputFile {
    /// Path, `-` for stdout, or `-n` for the null output.
    pub filename: String,
    /// File type hint overriding extension detection.
    pub filetype: Option<String>,
    /// Format requests; unset fields are derived from the combiner.
    pub signal: SignalInfo,
    /// Comment to attach; `None` inherits from the first input, `Some("")`
    /// suppresses it.
    pub comment: Option<String>,
}

impl OutputFile {
    /// Create an output entry for `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        OutputFile {
            filename: filename.into(),
            filetype: None,
            signal: SignalInfo::default(),
            comment: None,
        }
    }

    /// Whether this output discards its samples.
    pub fn is_null(&self) -> bool {
        self.filename == "-n" || self.filetype.as_deref() == Some("null")
    }
}

/// Pick the replay gain to honour out of a metadata comment.
///
/// The preferred tag is tried first; if it is missing, the other one is
/// used. Tag matching is case-insensitive and the value is the leading
/// number of the remainder (a trailing ` dB` is tolerated).
pub fn resolve_replay_gain(comment: &str, mode: ReplayGainMode) -> Option<f64> {
    let order = match mode {
        ReplayGainMode::Off => return None,
        ReplayGainMode::Track => ["replaygain_track_gain=", "replaygain_album_gain="],
        ReplayGainMode::Album => ["replaygain_album_gain=", "replaygain_track_gain="],
    };
    for target in order {
        for line in comment.lines() {
            let line = line.trim();
            if line.len() >= target.len() && line[..target.len()].eq_ignore_ascii_case(target) {
                if let Some(db) = parse_leading_float(&line[target.len()..]) {
                    return Some(db);
                }
            }
        }
    }
    None
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .take_while(|(i, c)| {
            c.is_ascii_digit() || *c == '.' || ((*c == '+' || *c == '-') && *i == 0)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    text[..end].parse().ok()
}
