//! Sample-rate conversion by linear interpolation.

use cadena_core::{ChainSignal, Effect, EffectError, Flowed, Sample, StartStatus};

/// `rate [RATE]` - resample the stream to a new rate.
///
/// This is a plain linear interpolator: adequate for rate adaptation, not a
/// polyphase design. It processes one channel at a time (the engine splits
/// wider streams), so its descriptor does not claim multichannel handling.
/// With no argument the target rate comes from the output file, which is
/// how the planner auto-inserts it.
pub struct Rate {
    requested: Option<u32>,
    /// Input samples per output sample.
    step: f64,
    /// Fractional position between `prev` and the next input sample.
    pos: f64,
    prev: Option<Sample>,
}

impl Rate {
    /// Create a resampler; `None` defers the target rate to the output file.
    pub fn new(requested: Option<u32>) -> Self {
        Rate {
            requested,
            step: 1.0,
            pos: 0.0,
            prev: None,
        }
    }

    /// Parse `[RATE]` arguments.
    pub fn from_args(args: &[String]) -> Result<Self, EffectError> {
        match args {
            [] => Ok(Rate::new(None)),
            [rate] => {
                let hz: u32 = rate.parse().map_err(|_| EffectError::InvalidArgs {
                    effect: "rate",
                    message: format!("`{rate}` is not a sample rate"),
                })?;
                if hz == 0 {
                    return Err(EffectError::InvalidArgs {
                        effect: "rate",
                        message: "sample rate must be positive".into(),
                    });
                }
                Ok(Rate::new(Some(hz)))
            }
            _ => Err(EffectError::InvalidArgs {
                effect: "rate",
                message: "usage: rate [RATE]".into(),
            }),
        }
    }
}

impl Effect for Rate {
    fn output_signal(&self, input: ChainSignal, target: ChainSignal) -> ChainSignal {
        ChainSignal {
            rate: self.requested.unwrap_or(target.rate),
            channels: input.channels,
        }
    }

    fn start(&mut self, input: ChainSignal, output: ChainSignal) -> Result<StartStatus, EffectError> {
        if input.rate == output.rate {
            return Ok(StartStatus::Bypass);
        }
        self.step = input.rate as f64 / output.rate as f64;
        self.pos = 0.0;
        self.prev = None;
        Ok(StartStatus::Run)
    }

    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let mut consumed = 0;
        let mut produced = 0;

        if self.prev.is_none() {
            if input.is_empty() {
                return Ok(Flowed::default());
            }
            self.prev = Some(input[0]);
            consumed = 1;
        }

        'emit: while produced < output.len() {
            // Advance over input until the interpolation window holds `pos`.
            while self.pos >= 1.0 {
                if consumed >= input.len() {
                    break 'emit;
                }
                self.prev = Some(input[consumed]);
                consumed += 1;
                self.pos -= 1.0;
            }
            // `input[consumed]` is peeked, not yet consumed.
            if consumed >= input.len() {
                break;
            }
            let a = self.prev.unwrap_or(0) as f64;
            let b = input[consumed] as f64;
            output[produced] = (a + self.pos * (b - a)).round() as Sample;
            produced += 1;
            self.pos += self.step;
        }

        Ok(Flowed {
            consumed,
            produced,
            eof: false,
        })
    }
}
