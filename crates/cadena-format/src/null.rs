//! The null backend: an input that is immediately at end of stream and an
//! output that discards everything. Useful for inspecting files without
//! writing anything, and for driving generator effects.

use crate::error::Result;
use crate::{FormatReader, FormatWriter};
use cadena_core::{Sample, SignalInfo, SignalSpec};

/// An input stream with no samples.
pub struct NullReader {
    spec: SignalSpec,
}

impl NullReader {
    /// Create a null input; unspecified hint fields take the defaults.
    pub fn new(hints: &SignalInfo) -> Self {
        NullReader {
            spec: hints.resolve_with(&SignalSpec::default()),
        }
    }
}

impl FormatReader for NullReader {
    fn signal(&self) -> SignalSpec {
        self.spec
    }

    fn length(&self) -> u64 {
        0
    }

    fn read(&mut self, _buf: &mut [Sample]) -> Result<usize> {
        Ok(0)
    }
}

/// An output stream that accepts and discards everything.
pub struct NullWriter {
    spec: SignalSpec,
    written: u64,
}

impl NullWriter {
    /// Create a null output.
    pub fn new(spec: SignalSpec) -> Self {
        NullWriter { spec, written: 0 }
    }

    /// Samples swallowed so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FormatWriter for NullWriter {
    fn signal(&self) -> SignalSpec {
        self.spec
    }

    fn write(&mut self, buf: &[Sample]) -> Result<usize> {
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
