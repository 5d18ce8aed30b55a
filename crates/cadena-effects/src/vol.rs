//! Scalar volume adjustment.

use cadena_core::{db_to_linear, round_clip, ChainSignal, Effect, EffectError, Flowed, Sample, StartStatus};

/// Multiply every sample by a constant gain, saturating and counting clips.
///
/// The gain is given as a linear factor (`0.5`) or in decibels with a `dB`
/// suffix (`-6dB`). A negative factor inverts the phase.
pub struct Vol {
    gain: f64,
    clips: u64,
}

impl Vol {
    /// Create a volume effect with a linear gain.
    pub fn new(gain: f64) -> Self {
        Vol { gain, clips: 0 }
    }

    /// Parse `[GAIN[dB]]` arguments.
    pub fn from_args(args: &[String]) -> Result<Self, EffectError> {
        let arg = match args {
            [] => {
                return Err(EffectError::InvalidArgs {
                    effect: "vol",
                    message: "usage: vol GAIN[dB]".into(),
                })
            }
            [one] => one.as_str(),
            _ => {
                return Err(EffectError::InvalidArgs {
                    effect: "vol",
                    message: "too many arguments".into(),
                })
            }
        };
        let (number, is_db) = match arg.to_ascii_lowercase().strip_suffix("db") {
            Some(stripped) => (stripped.to_string(), true),
            None => (arg.to_string(), false),
        };
        let value: f64 = number.trim().parse().map_err(|_| EffectError::InvalidArgs {
            effect: "vol",
            message: format!("`{arg}` is not a number"),
        })?;
        let gain = if is_db { db_to_linear(value) } else { value };
        if gain < 0.0 {
            tracing::info!("negative volume adjustment; this inverts the phase");
        }
        Ok(Vol::new(gain))
    }

    /// The configured linear gain.
    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl Effect for Vol {
    fn start(&mut self, _input: ChainSignal, _output: ChainSignal) -> Result<StartStatus, EffectError> {
        if self.gain == 1.0 {
            Ok(StartStatus::Bypass)
        } else {
            Ok(StartStatus::Run)
        }
    }

    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let n = input.len().min(output.len());
        for (out, &sample) in output[..n].iter_mut().zip(input[..n].iter()) {
            *out = round_clip(self.gain * sample as f64, &mut self.clips);
        }
        Ok(Flowed {
            consumed: n,
            produced: n,
            eof: false,
        })
    }

    fn clips(&self) -> u64 {
        self.clips
    }
}
