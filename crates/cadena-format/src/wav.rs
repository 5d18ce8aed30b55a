//! WAV reading and writing, backed by `hound`.
//!
//! Stored integer widths are shifted up to the engine's full-scale 32-bit
//! domain on read and shifted back on write; float data is scaled by 2^31
//! with saturating conversion.

use crate::error::{FormatError, Result};
use crate::{FormatReader, FormatWriter};
use cadena_core::{round_clip, Encoding, Sample, SampleSize, SignalSpec};
use hound::SampleFormat;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

const FULL_SCALE: f64 = 2147483648.0; // 2^31

fn spec_from_hound(spec: hound::WavSpec) -> Result<SignalSpec> {
    let size = SampleSize::from_bits(spec.bits_per_sample as u32).ok_or(
        FormatError::UnsupportedSize {
            encoding: Encoding::Signed,
            bits: spec.bits_per_sample as u32,
        },
    )?;
    let encoding = match spec.sample_format {
        SampleFormat::Float => Encoding::Float,
        SampleFormat::Int => Encoding::Signed,
    };
    Ok(SignalSpec {
        rate: spec.sample_rate,
        channels: spec.channels as u32,
        size,
        encoding,
    })
}

fn spec_to_hound(spec: &SignalSpec) -> Result<hound::WavSpec> {
    let bits = spec.size.bits();
    let sample_format = match spec.encoding {
        Encoding::Float => SampleFormat::Float,
        // 8-bit WAV is unsigned on disk either way; hound handles the offset.
        Encoding::Signed | Encoding::Unsigned => SampleFormat::Int,
        other => return Err(FormatError::UnsupportedEncoding(other)),
    };
    if bits > 32 || (sample_format == SampleFormat::Float && bits != 32) {
        return Err(FormatError::UnsupportedSize {
            encoding: spec.encoding,
            bits,
        });
    }
    Ok(hound::WavSpec {
        channels: spec.channels as u16,
        sample_rate: spec.rate,
        bits_per_sample: bits as u16,
        sample_format,
    })
}

/// A WAV input stream.
pub struct WavReader {
    inner: hound::WavReader<BufReader<File>>,
    spec: SignalSpec,
    length: u64,
    shift: u32,
    clips: u64,
}

impl WavReader {
    /// Open a WAV file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = hound::WavReader::open(path)?;
        let spec = spec_from_hound(inner.spec())?;
        let length = inner.len() as u64;
        let shift = 32 - spec.size.bits();
        Ok(WavReader {
            inner,
            spec,
            length,
            shift,
            clips: 0,
        })
    }
}

impl FormatReader for WavReader {
    fn signal(&self) -> SignalSpec {
        self.spec
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn seekable(&self) -> bool {
        true
    }

    fn read(&mut self, buf: &mut [Sample]) -> Result<usize> {
        let mut n = 0;
        if self.spec.encoding == Encoding::Float {
            let mut samples = self.inner.samples::<f32>();
            while n < buf.len() {
                match samples.next() {
                    Some(Ok(s)) => {
                        buf[n] = round_clip(s as f64 * FULL_SCALE, &mut self.clips);
                        n += 1;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
        } else {
            let mut samples = self.inner.samples::<i32>();
            while n < buf.len() {
                match samples.next() {
                    Some(Ok(s)) => {
                        buf[n] = s << self.shift;
                        n += 1;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
        }
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let frames = offset / self.spec.channels as u64;
        self.inner.seek(frames as u32)?;
        Ok(())
    }

    fn clips(&self) -> u64 {
        self.clips
    }
}

/// A WAV output stream.
pub struct WavWriter {
    // Taken on finalize; hound's finalize consumes the writer.
    inner: Option<hound::WavWriter<BufWriter<File>>>,
    spec: SignalSpec,
    shift: u32,
}

impl WavWriter {
    /// Create a WAV file with the given format.
    ///
    /// `comment` is accepted for interface parity; the RIFF INFO chunk is
    /// not written by this backend.
    pub fn create<P: AsRef<Path>>(path: P, spec: SignalSpec, comment: Option<&str>) -> Result<Self> {
        if comment.is_some() {
            tracing::debug!("WAV backend does not store comments; dropping");
        }
        let hound_spec = spec_to_hound(&spec)?;
        let inner = hound::WavWriter::create(path, hound_spec)?;
        let shift = 32 - spec.size.bits();
        Ok(WavWriter {
            inner: Some(inner),
            spec,
            shift,
        })
    }
}

impl FormatWriter for WavWriter {
    fn signal(&self) -> SignalSpec {
        self.spec
    }

    fn write(&mut self, buf: &[Sample]) -> Result<usize> {
        let writer = match self.inner.as_mut() {
            Some(w) => w,
            None => return Ok(0),
        };
        if self.spec.encoding == Encoding::Float {
            for &s in buf {
                writer.write_sample((s as f64 / FULL_SCALE) as f32)?;
            }
        } else {
            for &s in buf {
                writer.write_sample(s >> self.shift)?;
            }
        }
        Ok(buf.len())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.inner.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn spec(rate: u32, channels: u32, size: SampleSize, encoding: Encoding) -> SignalSpec {
        SignalSpec {
            rate,
            channels,
            size,
            encoding,
        }
    }

    #[test]
    fn roundtrip_16_bit() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (0..1000).map(|i| (i - 500) << 16).collect();

        let mut writer = WavWriter::create(
            file.path(),
            spec(44100, 1, SampleSize::Bytes2, Encoding::Signed),
            None,
        )
        .unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let mut reader = WavReader::open(file.path()).unwrap();
        assert_eq!(reader.signal().rate, 44100);
        assert_eq!(reader.signal().channels, 1);
        assert_eq!(reader.length(), 1000);

        let mut loaded = vec![0; 1000];
        assert_eq!(reader.read(&mut loaded).unwrap(), 1000);
        assert_eq!(loaded, samples);

        // Next read reports end of stream.
        assert_eq!(reader.read(&mut loaded).unwrap(), 0);
    }

    #[test]
    fn roundtrip_float() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (0..256).map(|i| i << 20).collect();

        let mut writer = WavWriter::create(
            file.path(),
            spec(48000, 1, SampleSize::Bytes4, Encoding::Float),
            None,
        )
        .unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let mut reader = WavReader::open(file.path()).unwrap();
        assert_eq!(reader.signal().encoding, Encoding::Float);

        let mut loaded = vec![0; 256];
        assert_eq!(reader.read(&mut loaded).unwrap(), 256);
        for (a, b) in samples.iter().zip(loaded.iter()) {
            // f32 has 24 bits of mantissa; allow the bottom bits to wobble.
            assert!((a - b).abs() < 256, "{a} vs {b}");
        }
    }

    #[test]
    fn partial_reads_cover_the_stream() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (0..100).map(|i| i << 16).collect();

        let mut writer = WavWriter::create(
            file.path(),
            spec(8000, 2, SampleSize::Bytes2, Encoding::Signed),
            None,
        )
        .unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let mut reader = WavReader::open(file.path()).unwrap();
        let mut collected = Vec::new();
        let mut chunk = vec![0; 7];
        loop {
            let n = reader.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(collected, samples);
    }

    #[test]
    fn seek_skips_frames() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = (0..100).map(|i| i << 16).collect();

        let mut writer = WavWriter::create(
            file.path(),
            spec(8000, 2, SampleSize::Bytes2, Encoding::Signed),
            None,
        )
        .unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let mut reader = WavReader::open(file.path()).unwrap();
        reader.seek(10).unwrap(); // 5 frames of 2 channels
        let mut buf = vec![0; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, vec![10 << 16, 11 << 16, 12 << 16, 13 << 16]);
    }

    #[test]
    fn eight_bit_files_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let samples: Vec<Sample> = vec![0, 1 << 24, -(1 << 24), 100 << 24];

        let mut writer = WavWriter::create(
            file.path(),
            spec(8000, 1, SampleSize::Bytes1, Encoding::Signed),
            None,
        )
        .unwrap();
        writer.write(&samples).unwrap();
        writer.finalize().unwrap();

        let mut reader = WavReader::open(file.path()).unwrap();
        let mut loaded = vec![0; 4];
        assert_eq!(reader.read(&mut loaded).unwrap(), 4);
        assert_eq!(loaded, samples);
    }
}
