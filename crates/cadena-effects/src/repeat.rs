//! Append extra copies of the stream.

use cadena_core::{Drained, Effect, EffectError, EffectFlags, Flowed, Sample};

/// Capability descriptor for [`Repeat`].
pub const FLAGS: EffectFlags = EffectFlags {
    multichannel: true,
    changes_channels: false,
    changes_rate: false,
    changes_length: true,
    proxy: false,
    deprecated: false,
};

/// `repeat [COUNT]` - pass the stream through, then play it again `COUNT`
/// more times (default 1). The whole stream is buffered in memory.
pub struct Repeat {
    times: u32,
    buffered: Vec<Sample>,
    replays_left: u32,
    cursor: usize,
}

impl Repeat {
    /// Create a repeat effect with the given extra-copy count.
    pub fn new(times: u32) -> Self {
        Repeat {
            times,
            buffered: Vec::new(),
            replays_left: times,
            cursor: 0,
        }
    }

    /// Parse `[COUNT]` arguments.
    pub fn from_args(args: &[String]) -> Result<Self, EffectError> {
        match args {
            [] => Ok(Repeat::new(1)),
            [count] => {
                let times: u32 = count.parse().map_err(|_| EffectError::InvalidArgs {
                    effect: "repeat",
                    message: format!("`{count}` is not a repeat count"),
                })?;
                Ok(Repeat::new(times))
            }
            _ => Err(EffectError::InvalidArgs {
                effect: "repeat",
                message: "usage: repeat [COUNT]".into(),
            }),
        }
    }
}

impl Effect for Repeat {
    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        self.buffered.extend_from_slice(&input[..n]);
        Ok(Flowed {
            consumed: n,
            produced: n,
            eof: false,
        })
    }

    fn drain(&mut self, output: &mut [Sample]) -> Result<Drained, EffectError> {
        let mut produced = 0;
        while produced < output.len() && self.replays_left > 0 {
            if self.cursor == self.buffered.len() {
                self.replays_left -= 1;
                self.cursor = 0;
                if self.replays_left == 0 || self.buffered.is_empty() {
                    break;
                }
            }
            let want = output.len() - produced;
            let chunk = (self.buffered.len() - self.cursor).min(want);
            output[produced..produced + chunk]
                .copy_from_slice(&self.buffered[self.cursor..self.cursor + chunk]);
            self.cursor += chunk;
            produced += chunk;
        }
        Ok(Drained {
            produced,
            eof: self.replays_left == 0 || self.buffered.is_empty(),
        })
    }

    fn stop(&mut self) {
        self.buffered = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all(repeat: &mut Repeat) -> Vec<Sample> {
        let mut collected = Vec::new();
        loop {
            let mut out = [0; 4];
            let drained = repeat.drain(&mut out).unwrap();
            collected.extend_from_slice(&out[..drained.produced]);
            if drained.eof {
                break;
            }
        }
        collected
    }

    #[test]
    fn passes_through_while_flowing() {
        let mut repeat = Repeat::new(1);
        let mut out = [0; 4];
        let flowed = repeat.flow(&[1, 2, 3], &mut out).unwrap();
        assert_eq!(flowed.consumed, 3);
        assert_eq!(flowed.produced, 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
    }

    #[test]
    fn drain_replays_once_by_default() {
        let mut repeat = Repeat::new(1);
        let mut scratch = [0; 8];
        repeat.flow(&[1, 2, 3], &mut scratch).unwrap();
        assert_eq!(drain_all(&mut repeat), vec![1, 2, 3]);
    }

    #[test]
    fn drain_replays_n_times() {
        let mut repeat = Repeat::new(3);
        let mut scratch = [0; 8];
        repeat.flow(&[7, 8], &mut scratch).unwrap();
        assert_eq!(drain_all(&mut repeat), vec![7, 8, 7, 8, 7, 8]);
    }

    #[test]
    fn zero_count_adds_nothing() {
        let mut repeat = Repeat::new(0);
        let mut scratch = [0; 8];
        repeat.flow(&[1, 2], &mut scratch).unwrap();
        assert_eq!(drain_all(&mut repeat), Vec::<Sample>::new());
    }

    #[test]
    fn empty_stream_drains_immediately() {
        let mut repeat = Repeat::new(5);
        assert_eq!(drain_all(&mut repeat), Vec::<Sample>::new());
    }
}
