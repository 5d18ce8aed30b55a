//! The combiner: reads wide samples from one or many inputs and reconciles
//! them into the single stream that enters the effects chain.
//!
//! Serial modes (sequence, concatenate) read from one input at a time and
//! are driven directly by the session loop via [`read_wide`]; the parallel
//! modes (mix, merge) pull a tick from every input at once through
//! [`Combiner::combine_next`].

use crate::error::Result;
use crate::file::InputFile;
use crate::options::CombineMode;
use cadena_core::{round_clip, Sample, SignalSpec};

/// Read up to one buffer of wide samples from `input`.
///
/// The budget is `buffer_size / combiner_channels` wide samples, each of
/// which is `input.channels` flat samples. Returns the number of wide
/// samples delivered; a trailing partial frame is dropped.
pub fn read_wide(
    input: &mut InputFile,
    buf: &mut [Sample],
    combiner_channels: u32,
    buffer_size: usize,
) -> Result<usize> {
    let channels = input.spec().channels as usize;
    let wide_budget = buffer_size / combiner_channels.max(1) as usize;
    let want = (wide_budget * channels).min(buf.len());
    let reader = match input.reader.as_mut() {
        Some(r) => r,
        None => return Ok(0),
    };
    let got = reader.read(&mut buf[..want])?;
    Ok(got / channels)
}

/// Apply the per-input volume to `wide` wide samples in `buf`, saturating
/// and counting clips on the input.
pub fn balance_input(buf: &mut [Sample], wide: usize, input: &mut InputFile) {
    let volume = input.volume.unwrap_or(1.0);
    if volume == 1.0 {
        return;
    }
    let samples = wide * input.spec().channels as usize;
    for sample in buf[..samples].iter_mut() {
        *sample = round_clip(volume * *sample as f64, &mut input.volume_clips);
    }
}

/// Parallel-mode combiner state.
pub struct Combiner {
    mode: CombineMode,
    /// The signal entering the chain's input slot.
    pub signal: SignalSpec,
    buffer_size: usize,
    /// One read buffer per input.
    scratch: Vec<Vec<Sample>>,
    /// Clips produced while summing in mix mode.
    pub mixing_clips: u64,
}

impl Combiner {
    /// Create a combiner for `input_count` inputs.
    pub fn new(mode: CombineMode, signal: SignalSpec, buffer_size: usize, input_count: usize) -> Self {
        let scratch = if mode.is_serial() {
            Vec::new()
        } else {
            (0..input_count).map(|_| vec![0; buffer_size]).collect()
        };
        Combiner {
            mode,
            signal,
            buffer_size,
            scratch,
            mixing_clips: 0,
        }
    }

    /// Produce one tick of combined wide samples into `dst` from every
    /// input. Inputs past their end contribute nothing (mix) or silence
    /// (merge). Returns the number of wide samples produced; 0 is end of
    /// stream.
    pub fn combine_next(&mut self, inputs: &mut [InputFile], dst: &mut [Sample]) -> Result<usize> {
        debug_assert!(!self.mode.is_serial());
        let channels = self.signal.channels as usize;

        let mut lengths = vec![0usize; inputs.len()];
        let mut tick_wide = 0;
        for (i, input) in inputs.iter_mut().enumerate() {
            let wide = read_wide(input, &mut self.scratch[i], self.signal.channels, self.buffer_size)?;
            balance_input(&mut self.scratch[i], wide, input);
            lengths[i] = wide;
            tick_wide = tick_wide.max(wide);
        }

        match self.mode {
            CombineMode::Mix => {
                for ws in 0..tick_wide {
                    for s in 0..channels {
                        let mut acc = 0.0f64;
                        for (i, input) in inputs.iter().enumerate() {
                            let in_ch = input.spec().channels as usize;
                            if ws < lengths[i] && s < in_ch {
                                acc += self.scratch[i][ws * in_ch + s] as f64;
                            }
                        }
                        dst[ws * channels + s] = round_clip(acc, &mut self.mixing_clips);
                    }
                }
            }
            CombineMode::Merge => {
                let mut p = 0;
                for ws in 0..tick_wide {
                    for (i, input) in inputs.iter().enumerate() {
                        let in_ch = input.spec().channels as usize;
                        for s in 0..in_ch {
                            dst[p] = if ws < lengths[i] {
                                self.scratch[i][ws * in_ch + s]
                            } else {
                                0
                            };
                            p += 1;
                        }
                    }
                }
            }
            CombineMode::Sequence | CombineMode::Concatenate => unreachable!(),
        }

        Ok(tick_wide)
    }
}
