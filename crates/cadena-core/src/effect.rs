//! The effect contract.
//!
//! An effect is a stateful transform that the engine pulls samples through.
//! Implementors override the slots they need; every slot has a sensible
//! no-op default, so a minimal effect only implements [`Effect::flow`].
//!
//! The engine drives an effect through a fixed lifecycle:
//!
//! 1. [`Effect::output_signal`] during planning, to learn how the effect
//!    changes the stream's rate or channel count;
//! 2. [`Effect::start`] once the surrounding signals are final - the effect
//!    may report [`StartStatus::Bypass`] to be dropped from the chain;
//! 3. [`Effect::flow`] repeatedly while upstream has data, then
//!    [`Effect::drain`] until the effect reports end of stream;
//! 4. [`Effect::stop`], after which [`Effect::clips`] is read for the
//!    final report.
//!
//! `flow` receives a window of unconsumed upstream samples and a window of
//! free space in the effect's output buffer, and reports how much of each it
//! used. Consuming nothing and producing nothing while both windows are
//! non-empty stalls the pipeline, and the engine treats it as a fatal error.

use crate::sample::Sample;
use crate::signal::ChainSignal;
use thiserror::Error;

/// Errors raised by effect construction or processing.
#[derive(Debug, Error)]
pub enum EffectError {
    /// No effect with this name is registered.
    #[error("effect `{0}` does not exist")]
    Unknown(String),

    /// The arguments given to an effect could not be parsed.
    #[error("{effect}: {message}")]
    InvalidArgs {
        /// Effect name.
        effect: &'static str,
        /// What was wrong.
        message: String,
    },

    /// The effect failed while processing.
    #[error("{effect}: {message}")]
    Runtime {
        /// Effect name.
        effect: &'static str,
        /// What went wrong.
        message: String,
    },
}

/// Capability flags carried by an effect descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectFlags {
    /// Handles interleaved multi-channel audio itself. Effects without this
    /// flag are run once per channel over split buffers.
    pub multichannel: bool,
    /// Changes the channel count of the stream.
    pub changes_channels: bool,
    /// Changes the sample rate of the stream.
    pub changes_rate: bool,
    /// Changes the total duration of the stream, which makes the output
    /// length unknowable up front.
    pub changes_length: bool,
    /// A proxy with no audible effect; removed from the chain at start.
    pub proxy: bool,
    /// Kept for compatibility; use discouraged.
    pub deprecated: bool,
}

/// Result of a `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    /// The effect is active and should stay in the chain.
    Run,
    /// The effect would do nothing in this configuration; drop it.
    Bypass,
}

/// What a `flow` call did with its two windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flowed {
    /// Input samples consumed.
    pub consumed: usize,
    /// Output samples produced.
    pub produced: usize,
    /// The effect will not accept any more input.
    pub eof: bool,
}

/// What a `drain` call produced.
#[derive(Debug, Clone, Copy)]
pub struct Drained {
    /// Output samples produced.
    pub produced: usize,
    /// Nothing further will be produced.
    pub eof: bool,
}

/// A stateful audio transform.
pub trait Effect {
    /// Report the signal leaving this effect, given the signal entering it
    /// and the signal the pipeline ultimately wants. The default is a
    /// pass-through; rate- and channel-changing effects override it.
    fn output_signal(&self, input: ChainSignal, target: ChainSignal) -> ChainSignal {
        let _ = target;
        input
    }

    /// Configure internal state once the surrounding signals are final.
    fn start(&mut self, input: ChainSignal, output: ChainSignal) -> Result<StartStatus, EffectError> {
        let _ = (input, output);
        Ok(StartStatus::Run)
    }

    /// Process samples: read from `input`, append to `output`, and report
    /// the amounts used. The default consumes and produces nothing.
    fn flow(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<Flowed, EffectError> {
        let _ = (input, output);
        Ok(Flowed::default())
    }

    /// Emit residual samples after upstream input is exhausted. The default
    /// produces nothing and reports end of stream.
    fn drain(&mut self, output: &mut [Sample]) -> Result<Drained, EffectError> {
        let _ = output;
        Ok(Drained {
            produced: 0,
            eof: true,
        })
    }

    /// Release runtime state. May log a final report.
    fn stop(&mut self) {}

    /// Saturation events this effect has counted so far.
    fn clips(&self) -> u64 {
        0
    }

    /// Samples this effect would discard from the very front of the stream,
    /// if it is first in the chain. Lets the driver replace the discard with
    /// an input seek.
    fn initial_skip(&self) -> Option<u64> {
        None
    }

    /// Forget the front-of-stream discard after the driver has seeked past
    /// it.
    fn clear_initial_skip(&mut self) {}
}
