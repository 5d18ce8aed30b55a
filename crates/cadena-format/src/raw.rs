//! Headerless PCM reading and writing.
//!
//! Raw streams carry no self-description, so the caller must supply a
//! complete format: rate, channels, encoding and sample size. Signed and
//! unsigned integer PCM at 1, 2 and 4 bytes plus 4-byte IEEE float are
//! supported, in either byte order.

use crate::error::{FormatError, Result};
use crate::{FormatReader, FormatWriter};
use cadena_core::{round_clip, Encoding, Sample, SampleSize, SignalInfo, SignalSpec};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

const FULL_SCALE: f64 = 2147483648.0; // 2^31

/// Byte-level codec for one stored sample.
#[derive(Debug, Clone, Copy)]
struct Codec {
    encoding: Encoding,
    bytes: usize,
    little_endian: bool,
}

impl Codec {
    fn for_spec(spec: &SignalSpec, little_endian: bool) -> Result<Self> {
        let bytes = spec.size.bytes() as usize;
        match (spec.encoding, bytes) {
            (Encoding::Signed, 1 | 2 | 4)
            | (Encoding::Unsigned, 1 | 2 | 4)
            | (Encoding::Float, 4) => Ok(Codec {
                encoding: spec.encoding,
                bytes,
                little_endian,
            }),
            (Encoding::Signed | Encoding::Unsigned | Encoding::Float, _) => {
                Err(FormatError::UnsupportedSize {
                    encoding: spec.encoding,
                    bits: spec.size.bits(),
                })
            }
            (other, _) => Err(FormatError::UnsupportedEncoding(other)),
        }
    }

    fn decode(&self, raw: &[u8], clips: &mut u64) -> Sample {
        match (self.encoding, self.bytes) {
            (Encoding::Signed, 1) => (raw[0] as i8 as Sample) << 24,
            (Encoding::Signed, 2) => {
                let v = if self.little_endian {
                    i16::from_le_bytes([raw[0], raw[1]])
                } else {
                    i16::from_be_bytes([raw[0], raw[1]])
                };
                (v as Sample) << 16
            }
            (Encoding::Signed, 4) => {
                if self.little_endian {
                    i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
                } else {
                    i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
                }
            }
            (Encoding::Unsigned, 1) => ((raw[0] as Sample) - 128) << 24,
            (Encoding::Unsigned, 2) => {
                let v = if self.little_endian {
                    u16::from_le_bytes([raw[0], raw[1]])
                } else {
                    u16::from_be_bytes([raw[0], raw[1]])
                };
                ((v as Sample) - 32768) << 16
            }
            (Encoding::Unsigned, 4) => {
                let v = if self.little_endian {
                    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
                } else {
                    u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
                };
                (v as i64 - 2147483648i64) as Sample
            }
            (Encoding::Float, 4) => {
                let v = if self.little_endian {
                    f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
                } else {
                    f32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
                };
                round_clip(v as f64 * FULL_SCALE, clips)
            }
            _ => unreachable!("codec combinations are validated at open"),
        }
    }

    fn encode(&self, sample: Sample, out: &mut [u8]) {
        match (self.encoding, self.bytes) {
            (Encoding::Signed, 1) => out[0] = (sample >> 24) as i8 as u8,
            (Encoding::Signed, 2) => {
                let v = (sample >> 16) as i16;
                out[..2].copy_from_slice(&if self.little_endian {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                });
            }
            (Encoding::Signed, 4) => {
                out[..4].copy_from_slice(&if self.little_endian {
                    sample.to_le_bytes()
                } else {
                    sample.to_be_bytes()
                });
            }
            (Encoding::Unsigned, 1) => out[0] = ((sample >> 24) + 128) as u8,
            (Encoding::Unsigned, 2) => {
                let v = ((sample >> 16) + 32768) as u16;
                out[..2].copy_from_slice(&if self.little_endian {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                });
            }
            (Encoding::Unsigned, 4) => {
                let v = (sample as i64 + 2147483648i64) as u32;
                out[..4].copy_from_slice(&if self.little_endian {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                });
            }
            (Encoding::Float, 4) => {
                let v = (sample as f64 / FULL_SCALE) as f32;
                out[..4].copy_from_slice(&if self.little_endian {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                });
            }
            _ => unreachable!("codec combinations are validated at open"),
        }
    }
}

fn resolve_raw_spec(hints: &SignalInfo) -> Result<SignalSpec> {
    match (hints.rate, hints.channels, hints.size, hints.encoding) {
        (Some(rate), Some(channels), Some(size), Some(encoding)) => Ok(SignalSpec {
            rate,
            channels,
            size,
            encoding,
        }),
        _ => Err(FormatError::RawSpecIncomplete),
    }
}

enum RawSource {
    File(BufReader<File>),
    Stdin(io::Stdin),
}

impl Read for RawSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RawSource::File(f) => f.read(buf),
            RawSource::Stdin(s) => s.read(buf),
        }
    }
}

/// A headerless PCM input stream.
pub struct RawReader {
    source: RawSource,
    spec: SignalSpec,
    codec: Codec,
    length: u64,
    clips: u64,
}

impl RawReader {
    /// Open a raw file; `hints` must fully describe the data.
    pub fn open<P: AsRef<Path>>(path: P, hints: &SignalInfo) -> Result<Self> {
        let spec = resolve_raw_spec(hints)?;
        let codec = Codec::for_spec(&spec, hints.reverse_bytes != Some(true))?;
        let file =
            File::open(path.as_ref()).map_err(|e| FormatError::open(path.as_ref(), e))?;
        let length = file
            .metadata()
            .map(|m| m.len() / codec.bytes as u64)
            .unwrap_or(0);
        Ok(RawReader {
            source: RawSource::File(BufReader::new(file)),
            spec,
            codec,
            length,
            clips: 0,
        })
    }

    /// Read raw samples from stdin; length is unknown and seeking is
    /// unavailable.
    pub fn from_stdin(hints: &SignalInfo) -> Result<Self> {
        let spec = resolve_raw_spec(hints)?;
        let codec = Codec::for_spec(&spec, hints.reverse_bytes != Some(true))?;
        Ok(RawReader {
            source: RawSource::Stdin(io::stdin()),
            spec,
            codec,
            length: 0,
            clips: 0,
        })
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut got = 0;
        while got < buf.len() {
            let n = self.source.read(&mut buf[got..])?;
            if n == 0 {
                break;
            }
            got += n;
        }
        Ok(got)
    }
}

impl FormatReader for RawReader {
    fn signal(&self) -> SignalSpec {
        self.spec
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn seekable(&self) -> bool {
        matches!(self.source, RawSource::File(_))
    }

    fn read(&mut self, buf: &mut [Sample]) -> Result<usize> {
        let bytes = self.codec.bytes;
        let mut raw = vec![0u8; buf.len() * bytes];
        let got = self.fill(&mut raw)?;
        let samples = got / bytes; // a trailing partial sample is dropped
        let codec = self.codec;
        for (i, sample) in buf.iter_mut().take(samples).enumerate() {
            *sample = codec.decode(&raw[i * bytes..(i + 1) * bytes], &mut self.clips);
        }
        Ok(samples)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        match &mut self.source {
            RawSource::File(f) => {
                f.seek(SeekFrom::Start(offset * self.codec.bytes as u64))?;
                Ok(())
            }
            RawSource::Stdin(_) => Err(FormatError::Unseekable),
        }
    }

    fn clips(&self) -> u64 {
        self.clips
    }
}

enum RawSink {
    File(BufWriter<File>),
    Stdout(io::Stdout),
}

impl Write for RawSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            RawSink::File(f) => f.write(buf),
            RawSink::Stdout(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            RawSink::File(f) => f.flush(),
            RawSink::Stdout(s) => s.flush(),
        }
    }
}

/// A headerless PCM output stream.
pub struct RawWriter {
    sink: RawSink,
    spec: SignalSpec,
    codec: Codec,
}

impl RawWriter {
    /// Create a raw file with the given (fully resolved) format.
    pub fn create<P: AsRef<Path>>(path: P, spec: SignalSpec) -> Result<Self> {
        let codec = Codec::for_spec(&spec, true)?;
        let file =
            File::create(path.as_ref()).map_err(|e| FormatError::open(path.as_ref(), e))?;
        Ok(RawWriter {
            sink: RawSink::File(BufWriter::new(file)),
            spec,
            codec,
        })
    }

    /// Write raw samples to stdout.
    pub fn to_stdout(spec: SignalSpec) -> Result<Self> {
        let codec = Codec::for_spec(&spec, true)?;
        Ok(RawWriter {
            sink: RawSink::Stdout(io::stdout()),
            spec,
            codec,
        })
    }
}

impl FormatWriter for RawWriter {
    fn signal(&self) -> SignalSpec {
        self.spec
    }

    fn write(&mut self, buf: &[Sample]) -> Result<usize> {
        let bytes = self.codec.bytes;
        let mut raw = vec![0u8; buf.len() * bytes];
        for (i, &sample) in buf.iter().enumerate() {
            self.codec.encode(sample, &mut raw[i * bytes..(i + 1) * bytes]);
        }
        self.sink.write_all(&raw)?;
        Ok(buf.len())
    }

    fn finalize(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn hints(rate: u32, channels: u32, size: SampleSize, encoding: Encoding) -> SignalInfo {
        SignalInfo {
            rate: Some(rate),
            channels: Some(channels),
            size: Some(size),
            encoding: Some(encoding),
            ..SignalInfo::default()
        }
    }

    #[test]
    fn incomplete_hints_are_rejected() {
        let partial = SignalInfo {
            rate: Some(8000),
            ..SignalInfo::default()
        };
        assert!(matches!(
            RawReader::open("/nonexistent", &partial),
            Err(FormatError::RawSpecIncomplete)
        ));
    }

    #[test]
    fn signed_16_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (-50..50).map(|i| i << 16).collect();
        let spec = SignalSpec {
            rate: 8000,
            channels: 1,
            size: SampleSize::Bytes2,
            encoding: Encoding::Signed,
        };

        let mut writer = RawWriter::create(file.path(), spec).unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let h = hints(8000, 1, SampleSize::Bytes2, Encoding::Signed);
        let mut reader = RawReader::open(file.path(), &h).unwrap();
        assert_eq!(reader.length(), 100);
        assert!(reader.seekable());

        let mut loaded = vec![0; 100];
        assert_eq!(reader.read(&mut loaded).unwrap(), 100);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn unsigned_8_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = vec![0, 127 << 24, -128 << 24, 1 << 24];
        let spec = SignalSpec {
            rate: 8000,
            channels: 1,
            size: SampleSize::Bytes1,
            encoding: Encoding::Unsigned,
        };

        let mut writer = RawWriter::create(file.path(), spec).unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let h = hints(8000, 1, SampleSize::Bytes1, Encoding::Unsigned);
        let mut reader = RawReader::open(file.path(), &h).unwrap();
        let mut loaded = vec![0; 4];
        assert_eq!(reader.read(&mut loaded).unwrap(), 4);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn float_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (0..64).map(|i| i << 20).collect();
        let spec = SignalSpec {
            rate: 48000,
            channels: 2,
            size: SampleSize::Bytes4,
            encoding: Encoding::Float,
        };

        let mut writer = RawWriter::create(file.path(), spec).unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let h = hints(48000, 2, SampleSize::Bytes4, Encoding::Float);
        let mut reader = RawReader::open(file.path(), &h).unwrap();
        let mut loaded = vec![0; 64];
        assert_eq!(reader.read(&mut loaded).unwrap(), 64);
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 256);
        }
    }

    #[test]
    fn big_endian_signed_16() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0x01, 0x00, 0xff, 0x00]).unwrap();

        let mut h = hints(8000, 1, SampleSize::Bytes2, Encoding::Signed);
        h.reverse_bytes = Some(true); // big-endian on a little-endian host
        let mut reader = RawReader::open(file.path(), &h).unwrap();
        let mut loaded = vec![0; 2];
        assert_eq!(reader.read(&mut loaded).unwrap(), 2);
        assert_eq!(loaded[0], 0x0100 << 16);
        assert_eq!(loaded[1], (0xff00u16 as i16 as i32) << 16);
    }

    #[test]
    fn seek_moves_by_samples() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (0..20).map(|i| i << 16).collect();
        let spec = SignalSpec {
            rate: 8000,
            channels: 1,
            size: SampleSize::Bytes2,
            encoding: Encoding::Signed,
        };

        let mut writer = RawWriter::create(file.path(), spec).unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let h = hints(8000, 1, SampleSize::Bytes2, Encoding::Signed);
        let mut reader = RawReader::open(file.path(), &h).unwrap();
        reader.seek(15).unwrap();
        let mut loaded = vec![0; 10];
        assert_eq!(reader.read(&mut loaded).unwrap(), 5);
        assert_eq!(&loaded[..5], &[15 << 16, 16 << 16, 17 << 16, 18 << 16, 19 << 16]);
    }

    #[test]
    fn trailing_partial_sample_is_dropped() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0x01, 0x00, 0x02]).unwrap(); // 1.5 samples

        let h = hints(8000, 1, SampleSize::Bytes2, Encoding::Signed);
        let mut reader = RawReader::open(file.path(), &h).unwrap();
        let mut loaded = vec![0; 4];
        assert_eq!(reader.read(&mut loaded).unwrap(), 1);
    }
}
