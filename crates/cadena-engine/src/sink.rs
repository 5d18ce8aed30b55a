//! The sink writer: pushes the final stage's buffer out to the opened
//! output, retrying partial writes and accounting for what was written.

use crate::error::{EngineError, Result};
use crate::interrupt::Interrupt;
use cadena_core::Sample;
use cadena_format::FormatWriter;

/// Outcome of a sink write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Everything was written.
    Done,
    /// The user aborted mid-write; the remainder was dropped.
    Aborted,
}

/// Wraps the opened output stream with retry and accounting.
pub struct SinkWriter {
    writer: Box<dyn FormatWriter>,
    filename: String,
    channels: u32,
    /// Wide samples delivered to the output so far.
    pub output_samples: u64,
}

impl SinkWriter {
    /// Wrap an opened writer.
    pub fn new(writer: Box<dyn FormatWriter>, filename: impl Into<String>) -> Self {
        let channels = writer.signal().channels;
        SinkWriter {
            writer,
            filename: filename.into(),
            channels,
            output_samples: 0,
        }
    }

    /// Output channel count.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Clips counted by the format layer while writing.
    pub fn clips(&self) -> u64 {
        self.writer.clips()
    }

    /// Write all of `buf`, retrying partial writes. A zero-length write is
    /// fatal; an abort flag stops immediately.
    pub fn write_all(&mut self, buf: &[Sample], interrupt: &Interrupt) -> Result<WriteOutcome> {
        let mut total = 0;
        while total < buf.len() {
            // Never keep writing during an abort; a wedged sink would hold
            // the loop forever.
            if interrupt.aborted() {
                return Ok(WriteOutcome::Aborted);
            }
            let written = match self.writer.write(&buf[total..]) {
                Ok(n) => n,
                Err(e) => {
                    return Err(EngineError::Write {
                        path: self.filename.clone(),
                        message: e.to_string(),
                    })
                }
            };
            if written == 0 {
                return Err(EngineError::Write {
                    path: self.filename.clone(),
                    message: "write returned no progress".into(),
                });
            }
            total += written;
        }
        self.output_samples += (total / self.channels.max(1) as usize) as u64;
        Ok(WriteOutcome::Done)
    }

    /// Count samples that were consumed without reaching the stream (the
    /// final stage's buffer is reset either way).
    pub fn account_unwritten(&mut self, samples: usize) {
        self.output_samples += (samples / self.channels.max(1) as usize) as u64;
    }

    /// Flush and close the stream.
    pub fn finalize(&mut self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}
