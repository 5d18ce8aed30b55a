//! Cadena Core - the sample domain and effect contract for the cadena
//! audio pipeline.
//!
//! This crate provides the foundational types shared by the format layer,
//! the effects library and the pipeline engine:
//!
//! - [`Sample`] and the saturating [`round_clip`] conversion with clip
//!   accounting
//! - [`SignalInfo`] (partially-specified format hints) and [`SignalSpec`]
//!   (a fully resolved stream description)
//! - [`ChainSignal`], the rate/channel pair that travels along an effects
//!   chain
//! - the [`Effect`] trait: flow/drain/start/stop slots with no-op defaults,
//!   plus [`EffectFlags`] capability descriptors

pub mod effect;
pub mod sample;
pub mod signal;

pub use effect::{Drained, Effect, EffectError, EffectFlags, Flowed, StartStatus};
pub use sample::{db_to_linear, round_clip, Sample, SAMPLE_MAX, SAMPLE_MIN};
pub use signal::{ChainSignal, Encoding, SampleSize, SignalInfo, SignalSpec};
