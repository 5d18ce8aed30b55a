//! Channel-count conversion.

use cadena_core::{round_clip, ChainSignal, Effect, EffectError, EffectFlags, Flowed, Sample, StartStatus};

/// Capability descriptor for [`Mixer`].
pub const FLAGS: EffectFlags = EffectFlags {
    multichannel: true,
    changes_channels: true,
    changes_rate: false,
    changes_length: false,
    proxy: false,
    deprecated: false,
};

/// `mixer [CHANNELS]` - convert between channel counts.
///
/// Reducing averages the input channels that fold onto each output channel
/// (`c`, `c + out`, `c + 2*out`, ...); increasing cycles the input channels
/// across the wider frame. With no argument the target channel count comes
/// from the output file, which is how the planner auto-inserts it.
pub struct Mixer {
    requested: Option<u32>,
    in_channels: u32,
    out_channels: u32,
    clips: u64,
}

impl Mixer {
    /// Create a mixer; `None` defers the target count to the output file.
    pub fn new(requested: Option<u32>) -> Self {
        Mixer {
            requested,
            in_channels: 0,
            out_channels: 0,
            clips: 0,
        }
    }

    /// Parse `[CHANNELS]` arguments.
    pub fn from_args(args: &[String]) -> Result<Self, EffectError> {
        match args {
            [] => Ok(Mixer::new(None)),
            [count] => {
                let channels: u32 = count.parse().map_err(|_| EffectError::InvalidArgs {
                    effect: "mixer",
                    message: format!("`{count}` is not a channel count"),
                })?;
                if channels == 0 {
                    return Err(EffectError::InvalidArgs {
                        effect: "mixer",
                        message: "channel count must be positive".into(),
                    });
                }
                Ok(Mixer::new(Some(channels)))
            }
            _ => Err(EffectError::InvalidArgs {
                effect: "mixer",
                message: "usage: mixer [CHANNELS]".into(),
            }),
        }
    }
}

impl Effect for Mixer {
    fn output_signal(&self, input: ChainSignal, target: ChainSignal) -> ChainSignal {
        ChainSignal {
            rate: input.rate,
            channels: self.requested.unwrap_or(target.channels),
        }
    }

    fn start(&mut self, input: ChainSignal, output: ChainSignal) -> Result<StartStatus, EffectError> {
        self.in_channels = input.channels;
        self.out_channels = output.channels;
        if self.in_channels == self.out_channels {
            Ok(StartStatus::Bypass)
        } else {
            Ok(StartStatus::Run)
        }
    }

    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let in_ch = self.in_channels as usize;
        let out_ch = self.out_channels as usize;
        let wide = (input.len() / in_ch).min(output.len() / out_ch);

        for ws in 0..wide {
            let frame = &input[ws * in_ch..(ws + 1) * in_ch];
            let out = &mut output[ws * out_ch..(ws + 1) * out_ch];
            if out_ch < in_ch {
                for (c, slot) in out.iter_mut().enumerate() {
                    let mut sum = 0.0;
                    let mut n = 0u32;
                    let mut src = c;
                    while src < in_ch {
                        sum += frame[src] as f64;
                        n += 1;
                        src += out_ch;
                    }
                    *slot = round_clip(sum / n as f64, &mut self.clips);
                }
            } else {
                for (c, slot) in out.iter_mut().enumerate() {
                    *slot = frame[c % in_ch];
                }
            }
        }

        Ok(Flowed {
            consumed: wide * in_ch,
            produced: wide * out_ch,
            eof: false,
        })
    }

    fn clips(&self) -> u64 {
        self.clips
    }
}
