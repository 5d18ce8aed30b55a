//! Keep a window of the stream: discard a leading span, then pass through a
//! bounded span and report end of stream.

use cadena_core::{ChainSignal, Effect, EffectError, Flowed, Sample, StartStatus};

/// `trim START [LENGTH]` - skip `START` seconds, then emit `LENGTH` seconds
/// (or everything, when no length is given).
///
/// When trim is the first effect in a chain over a single seekable input,
/// the driver seeks the input past the leading span instead of reading and
/// discarding it, and clears the skip here.
pub struct Trim {
    start_secs: f64,
    length_secs: Option<f64>,
    /// Samples still to discard from the front.
    to_skip: u64,
    /// Samples still to emit; `None` means unbounded.
    to_emit: Option<u64>,
}

impl Trim {
    /// Create a trim from positions in seconds.
    pub fn new(start_secs: f64, length_secs: Option<f64>) -> Self {
        Trim {
            start_secs,
            length_secs,
            to_skip: 0,
            to_emit: None,
        }
    }

    /// Parse `START [LENGTH]` arguments, both in seconds.
    pub fn from_args(args: &[String]) -> Result<Self, EffectError> {
        let parse = |arg: &String| -> Result<f64, EffectError> {
            let v: f64 = arg.parse().map_err(|_| EffectError::InvalidArgs {
                effect: "trim",
                message: format!("`{arg}` is not a number of seconds"),
            })?;
            if v < 0.0 {
                return Err(EffectError::InvalidArgs {
                    effect: "trim",
                    message: "positions must not be negative".into(),
                });
            }
            Ok(v)
        };
        match args {
            [start] => Ok(Trim::new(parse(start)?, None)),
            [start, length] => Ok(Trim::new(parse(start)?, Some(parse(length)?))),
            _ => Err(EffectError::InvalidArgs {
                effect: "trim",
                message: "usage: trim START [LENGTH]".into(),
            }),
        }
    }
}

impl Effect for Trim {
    fn start(&mut self, input: ChainSignal, _output: ChainSignal) -> Result<StartStatus, EffectError> {
        // Positions are whole samples across all channels.
        let per_sec = input.rate as f64 * input.channels as f64;
        self.to_skip = (self.start_secs * per_sec).round() as u64;
        self.to_emit = self.length_secs.map(|l| (l * per_sec).round() as u64);
        Ok(StartStatus::Run)
    }

    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let mut consumed = 0;

        let skip = (self.to_skip as usize).min(input.len());
        self.to_skip -= skip as u64;
        consumed += skip;

        let mut budget = input.len() - consumed;
        if let Some(left) = self.to_emit {
            budget = budget.min(left as usize);
        }
        let n = budget.min(output.len());
        output[..n].copy_from_slice(&input[consumed..consumed + n]);
        consumed += n;
        if let Some(left) = self.to_emit.as_mut() {
            *left -= n as u64;
        }

        Ok(Flowed {
            consumed,
            produced: n,
            eof: self.to_emit == Some(0),
        })
    }

    fn initial_skip(&self) -> Option<u64> {
        (self.to_skip > 0).then_some(self.to_skip)
    }

    fn clear_initial_skip(&mut self) {
        self.to_skip = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(rate: u32, channels: u32) -> ChainSignal {
        ChainSignal { rate, channels }
    }

    fn run(trim: &mut Trim, input: &[Sample]) -> (Vec<Sample>, bool) {
        let mut out = Vec::new();
        let mut pos = 0;
        let mut eof = false;
        while pos < input.len() && !eof {
            let mut chunk = [0; 16];
            let flowed = trim.flow(&input[pos..], &mut chunk).unwrap();
            out.extend_from_slice(&chunk[..flowed.produced]);
            pos += flowed.consumed;
            eof = flowed.eof;
            if flowed.consumed == 0 && flowed.produced == 0 {
                break;
            }
        }
        (out, eof)
    }

    #[test]
    fn skips_leading_samples() {
        let mut trim = Trim::new(1.0, None);
        trim.start(sig(10, 1), sig(10, 1)).unwrap();

        let input: Vec<Sample> = (0..30).collect();
        let (out, eof) = run(&mut trim, &input);
        assert_eq!(out, (10..30).collect::<Vec<_>>());
        assert!(!eof);
    }

    #[test]
    fn bounded_length_reports_eof() {
        let mut trim = Trim::new(1.0, Some(0.5));
        trim.start(sig(10, 1), sig(10, 1)).unwrap();

        let input: Vec<Sample> = (0..30).collect();
        let (out, eof) = run(&mut trim, &input);
        assert_eq!(out, (10..15).collect::<Vec<_>>());
        assert!(eof);
    }

    #[test]
    fn positions_scale_with_channels() {
        let mut trim = Trim::new(1.0, Some(1.0));
        trim.start(sig(10, 2), sig(10, 2)).unwrap();
        assert_eq!(trim.initial_skip(), Some(20));

        let input: Vec<Sample> = (0..60).collect();
        let (out, eof) = run(&mut trim, &input);
        assert_eq!(out, (20..40).collect::<Vec<_>>());
        assert!(eof);
    }

    #[test]
    fn cleared_skip_emits_from_the_front() {
        let mut trim = Trim::new(2.0, Some(0.5));
        trim.start(sig(10, 1), sig(10, 1)).unwrap();
        assert_eq!(trim.initial_skip(), Some(20));

        // Pretend the driver seeked the input past the leading span.
        trim.clear_initial_skip();
        assert_eq!(trim.initial_skip(), None);

        let input: Vec<Sample> = (0..30).collect();
        let (out, eof) = run(&mut trim, &input);
        assert_eq!(out, (0..5).collect::<Vec<_>>());
        assert!(eof);
    }

    #[test]
    fn zero_start_passes_through() {
        let mut trim = Trim::new(0.0, None);
        trim.start(sig(10, 1), sig(10, 1)).unwrap();
        assert_eq!(trim.initial_skip(), None);
        let input: Vec<Sample> = (0..8).collect();
        let (out, _) = run(&mut trim, &input);
        assert_eq!(out, input);
    }

    #[test]
    fn rejects_bad_args() {
        assert!(Trim::from_args(&[]).is_err());
        assert!(Trim::from_args(&["abc".to_string()]).is_err());
        assert!(Trim::from_args(&["-1".to_string()]).is_err());
        assert!(Trim::from_args(&["1".into(), "2".into(), "3".into()]).is_err());
    }
}
