//! Play the stream backwards.

use cadena_core::{Drained, Effect, EffectError, Flowed, Sample};

/// `reverse` - buffer the whole input, then emit it back to front.
///
/// Runs per channel (the engine splits wider streams), so each channel is
/// reversed in place rather than the interleaved frame order. The entire
/// stream is held in memory while it plays.
#[derive(Default)]
pub struct Reverse {
    buffered: Vec<Sample>,
    emitted: usize,
}

impl Reverse {
    /// Create a reverse effect.
    pub fn new() -> Self {
        Reverse::default()
    }

    /// Parse arguments; `reverse` takes none.
    pub fn from_args(args: &[String]) -> Result<Self, EffectError> {
        if args.is_empty() {
            Ok(Reverse::new())
        } else {
            Err(EffectError::InvalidArgs {
                effect: "reverse",
                message: "usage: reverse".into(),
            })
        }
    }
}

impl Effect for Reverse {
    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let _ = output;
        self.buffered.extend_from_slice(input);
        Ok(Flowed {
            consumed: input.len(),
            produced: 0,
            eof: false,
        })
    }

    fn drain(&mut self, output: &mut [Sample]) -> Result<Drained, EffectError> {
        let remaining = self.buffered.len() - self.emitted;
        let n = remaining.min(output.len());
        for slot in output[..n].iter_mut() {
            self.emitted += 1;
            *slot = self.buffered[self.buffered.len() - self.emitted];
        }
        Ok(Drained {
            produced: n,
            eof: self.emitted == self.buffered.len(),
        })
    }

    fn stop(&mut self) {
        self.buffered = Vec::new();
        self.emitted = 0;
    }
}
