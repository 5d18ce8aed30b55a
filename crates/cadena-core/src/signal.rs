//! Stream format descriptions.
//!
//! [`SignalInfo`] is a partially-specified description: every field is an
//! `Option`, and `None` means "not stated" (supplied on the command line, or
//! left for the format layer / the combiner to fill in). [`SignalSpec`] is
//! the fully resolved description attached to an opened stream.

/// Sample encoding of the data in a file.
///
/// Only linear PCM and IEEE float are handled by the built-in format
/// backends; the remaining variants exist so hints can round-trip through
/// the type model and be rejected with a clear error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Signed linear PCM.
    Signed,
    /// Unsigned linear PCM.
    Unsigned,
    /// IEEE 754 floating point.
    Float,
    /// ITU-T G.711 µ-law.
    Ulaw,
    /// ITU-T G.711 A-law.
    Alaw,
    /// IMA ADPCM.
    AdpcmIma,
    /// Microsoft ADPCM.
    AdpcmMs,
    /// OKI (Dialogic) ADPCM.
    AdpcmOki,
    /// GSM 06.10.
    Gsm,
    /// Encoding could not be determined.
    Unknown,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Encoding::Signed => "signed integer PCM",
            Encoding::Unsigned => "unsigned integer PCM",
            Encoding::Float => "floating point",
            Encoding::Ulaw => "mu-law",
            Encoding::Alaw => "A-law",
            Encoding::AdpcmIma => "IMA ADPCM",
            Encoding::AdpcmMs => "MS ADPCM",
            Encoding::AdpcmOki => "OKI ADPCM",
            Encoding::Gsm => "GSM",
            Encoding::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Byte width of one stored sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSize {
    /// 1 byte (8 bits).
    Bytes1,
    /// 2 bytes (16 bits).
    Bytes2,
    /// 3 bytes (24 bits).
    Bytes3,
    /// 4 bytes (32 bits).
    Bytes4,
    /// 8 bytes (64 bits).
    Bytes8,
}

impl SampleSize {
    /// Width in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            SampleSize::Bytes1 => 1,
            SampleSize::Bytes2 => 2,
            SampleSize::Bytes3 => 3,
            SampleSize::Bytes4 => 4,
            SampleSize::Bytes8 => 8,
        }
    }

    /// Width in bits.
    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Map a bit width back to a size, if it is one we store.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(SampleSize::Bytes1),
            16 => Some(SampleSize::Bytes2),
            24 => Some(SampleSize::Bytes3),
            32 => Some(SampleSize::Bytes4),
            64 => Some(SampleSize::Bytes8),
            _ => None,
        }
    }
}

/// Partially-specified stream format, used as open-time hints.
///
/// Unset fields are filled in by the format layer on open (for inputs) or
/// derived from the combiner just before the output is opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalInfo {
    /// Sample rate in Hz.
    pub rate: Option<u32>,
    /// Channel count.
    pub channels: Option<u32>,
    /// Stored sample width.
    pub size: Option<SampleSize>,
    /// Sample encoding.
    pub encoding: Option<Encoding>,
    /// Reverse byte order relative to the format's default.
    pub reverse_bytes: Option<bool>,
    /// Reverse bit order within bytes.
    pub reverse_bits: Option<bool>,
    /// Reverse nibble order within bytes.
    pub reverse_nibbles: Option<bool>,
    /// Compression factor, for formats that take one.
    pub compression: Option<f64>,
}

impl SignalInfo {
    /// Fill every unset field from a resolved spec.
    pub fn fill_from(&mut self, spec: &SignalSpec) {
        if self.rate.is_none() {
            self.rate = Some(spec.rate);
        }
        if self.channels.is_none() {
            self.channels = Some(spec.channels);
        }
        if self.size.is_none() {
            self.size = Some(spec.size);
        }
        if self.encoding.is_none() {
            self.encoding = Some(spec.encoding);
        }
    }

    /// Resolve into a concrete spec, taking defaults for anything still
    /// unset.
    pub fn resolve_with(&self, fallback: &SignalSpec) -> SignalSpec {
        SignalSpec {
            rate: self.rate.unwrap_or(fallback.rate),
            channels: self.channels.unwrap_or(fallback.channels),
            size: self.size.unwrap_or(fallback.size),
            encoding: self.encoding.unwrap_or(fallback.encoding),
        }
    }
}

/// Fully resolved stream format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSpec {
    /// Sample rate in Hz (positive).
    pub rate: u32,
    /// Channel count (positive).
    pub channels: u32,
    /// Stored sample width.
    pub size: SampleSize,
    /// Sample encoding.
    pub encoding: Encoding,
}

impl SignalSpec {
    /// The rate/channel pair seen by the effects chain.
    pub fn chain_signal(&self) -> ChainSignal {
        ChainSignal {
            rate: self.rate,
            channels: self.channels,
        }
    }
}

impl Default for SignalSpec {
    fn default() -> Self {
        SignalSpec {
            rate: 44100,
            channels: 1,
            size: SampleSize::Bytes2,
            encoding: Encoding::Signed,
        }
    }
}

/// The part of a stream description that effects care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSignal {
    /// Sample rate in Hz.
    pub rate: u32,
    /// Channel count.
    pub channels: u32,
}
