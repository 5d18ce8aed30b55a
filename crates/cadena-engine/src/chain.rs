//! The effects chain: an ordered table of slots, each holding an effect,
//! its buffer, and produced/consumed cursors.
//!
//! Slot 0 is the input sentinel: its buffer receives freshly combined
//! samples and its cursors act as the producer window. Real effects occupy
//! slots 1 and up. A slot whose effect cannot handle interleaved
//! multi-channel audio carries a second, independently constructed instance
//! for the right channel; such slots are flowed over split half-buffers and
//! re-interleaved.

use crate::error::{EngineError, Result};
use crate::interrupt::Interrupt;
use cadena_core::{ChainSignal, Effect, EffectFlags, Sample};

/// The input sentinel occupying slot 0. Never flowed; its buffer is filled
/// by the combiner.
pub(crate) struct Source;

impl Effect for Source {}

/// One node in the chain.
pub struct EffectSlot {
    /// Effect name, for diagnostics.
    pub name: String,
    /// Capability flags from the registry.
    pub flags: EffectFlags,
    /// The effect instance (left channel, when split).
    pub effect: Box<dyn Effect + Send>,
    /// Right-channel twin for effects without multichannel handling.
    pub right: Option<Box<dyn Effect + Send>>,
    /// Signal entering this slot.
    pub in_signal: ChainSignal,
    /// Signal leaving this slot.
    pub out_signal: ChainSignal,
    /// Output buffer; always `buffer_size` long.
    pub obuf: Vec<Sample>,
    /// Samples produced and not yet consumed downstream.
    pub olen: usize,
    /// Samples already consumed by downstream.
    pub odone: usize,
}

impl EffectSlot {
    /// Unconsumed output samples.
    pub fn pending(&self) -> usize {
        self.olen - self.odone
    }
}

/// The ordered slot table plus scheduler state.
pub struct EffectChain {
    /// Slot 0 is the input sentinel; 1.. are effects.
    pub slots: Vec<EffectSlot>,
    /// Index of the earliest slot still producing. 0 while the input file
    /// still has data.
    pub input_eff: usize,
    /// Whether `input_eff` reported end of stream on its last call.
    pub input_eff_eof: bool,
    pub(crate) buffer_size: usize,
    // Split-channel scratch, each half a buffer long.
    ibufl: Vec<Sample>,
    ibufr: Vec<Sample>,
    obufl: Vec<Sample>,
    obufr: Vec<Sample>,
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("slots", &self.slots.iter().map(|s| &s.name).collect::<Vec<_>>())
            .field("input_eff", &self.input_eff)
            .field("input_eff_eof", &self.input_eff_eof)
            .finish()
    }
}

impl EffectChain {
    /// Create a chain containing only the input sentinel.
    pub fn new(signal: ChainSignal, buffer_size: usize) -> Self {
        let source = EffectSlot {
            name: "input".into(),
            flags: EffectFlags::default(),
            effect: Box::new(Source),
            right: None,
            in_signal: signal,
            out_signal: signal,
            obuf: vec![0; buffer_size],
            olen: 0,
            odone: 0,
        };
        EffectChain {
            slots: vec![source],
            input_eff: 0,
            input_eff_eof: false,
            buffer_size,
            // The left half takes the odd sample, so it needs the rounded-up
            // half.
            ibufl: vec![0; buffer_size.div_ceil(2)],
            ibufr: vec![0; buffer_size / 2],
            obufl: vec![0; buffer_size / 2],
            obufr: vec![0; buffer_size / 2],
        }
    }

    /// Per-slot buffer size in samples.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The signal leaving the last slot.
    pub fn output_signal(&self) -> ChainSignal {
        self.slots[self.slots.len() - 1].out_signal
    }

    /// Reset scheduler state and every cursor for a fresh run.
    pub fn rewind(&mut self) {
        self.input_eff = 0;
        self.input_eff_eof = false;
        for slot in &mut self.slots {
            slot.olen = 0;
            slot.odone = 0;
        }
    }

    /// The input sentinel's buffer and cursors, for the combiner to fill.
    pub fn source_slot(&mut self) -> &mut EffectSlot {
        &mut self.slots[0]
    }

    /// Run one effect over whatever its predecessor has pending.
    ///
    /// Returns `true` when the effect reports it will accept no more input.
    /// Consuming and producing nothing while data was available is a fatal
    /// stall.
    pub(crate) fn flow_slot(&mut self, e: usize, interrupt: &Interrupt) -> Result<bool> {
        // A stuck effect must not keep the pipeline alive during an abort.
        if interrupt.aborted() {
            return Ok(true);
        }

        let buffer_size = self.buffer_size;
        let (head, tail) = self.slots.split_at_mut(e);
        let prev = &mut head[e - 1];
        let slot = &mut tail[0];

        if prev.odone == prev.olen {
            tracing::trace!("{}: no data to pull", slot.name);
            return Ok(false);
        }

        match slot.right.as_mut() {
            None => {
                let input = &prev.obuf[prev.odone..prev.olen];
                let output = &mut slot.obuf[slot.olen..buffer_size];
                let flowed = slot.effect.flow(input, output)?;

                prev.odone += flowed.consumed;
                // slot.odone is untouched: downstream hasn't consumed anything.
                slot.olen += flowed.produced;

                if flowed.eof {
                    return Ok(true);
                }
                if flowed.consumed + flowed.produced == 0 {
                    return Err(EngineError::Deadlock(slot.name.clone()));
                }
                Ok(false)
            }
            Some(right) => {
                let idone = prev.olen - prev.odone;
                let ofree = buffer_size - slot.olen;

                // De-interleave the pending window; an odd tail sample goes
                // left.
                let pending = &prev.obuf[prev.odone..prev.olen];
                for (i, &sample) in pending.iter().enumerate() {
                    if i % 2 == 0 {
                        self.ibufl[i / 2] = sample;
                    } else {
                        self.ibufr[i / 2] = sample;
                    }
                }
                let idonel = (idone + 1) / 2;
                let idoner = idone / 2;
                let ofree_half = ofree / 2;

                let flowed_l = slot
                    .effect
                    .flow(&self.ibufl[..idonel], &mut self.obufl[..ofree_half])?;
                let flowed_r = right.flow(&self.ibufr[..idoner], &mut self.obufr[..ofree_half])?;

                // Re-interleave. Both sides are expected to produce the same
                // count; the right side's drives the loop, so a diverging pair
                // would shift channels.
                let out = &mut slot.obuf[slot.olen..];
                for i in 0..flowed_r.produced {
                    out[2 * i] = self.obufl[i];
                    out[2 * i + 1] = self.obufr[i];
                }
                prev.odone += flowed_l.consumed + flowed_r.consumed;
                slot.olen += flowed_l.produced + flowed_r.produced;

                if flowed_l.eof || flowed_r.eof {
                    return Ok(true);
                }
                let done =
                    flowed_l.consumed + flowed_r.consumed + flowed_l.produced + flowed_r.produced;
                if done == 0 {
                    return Err(EngineError::Deadlock(slot.name.clone()));
                }
                Ok(false)
            }
        }
    }

    /// Ask one effect for residual output, replacing the slot's buffer
    /// contents. Returns `true` when the effect reports end of stream.
    pub(crate) fn drain_slot(&mut self, e: usize) -> Result<bool> {
        let buffer_size = self.buffer_size;
        let slot = &mut self.slots[e];

        match slot.right.as_mut() {
            None => {
                let drained = slot.effect.drain(&mut slot.obuf[..buffer_size])?;
                slot.olen = drained.produced;
                slot.odone = 0;
                Ok(drained.eof)
            }
            Some(right) => {
                let half = buffer_size / 2;
                let drained_l = slot.effect.drain(&mut self.obufl[..half])?;
                let drained_r = right.drain(&mut self.obufr[..half])?;

                // Same equal-count expectation as the split flow path.
                for i in 0..drained_r.produced {
                    slot.obuf[2 * i] = self.obufl[i];
                    slot.obuf[2 * i + 1] = self.obufr[i];
                }
                slot.olen = drained_l.produced + drained_r.produced;
                slot.odone = 0;
                Ok(drained_l.eof || drained_r.eof)
            }
        }
    }

    /// Stop every effect and log per-effect clip totals.
    pub fn stop_all(&mut self) {
        for slot in self.slots.iter_mut().skip(1) {
            slot.effect.stop();
            let mut clips = slot.effect.clips();
            if let Some(right) = slot.right.as_mut() {
                right.stop();
                // TODO: this reads the left instance's counter a second
                // time, mirroring the historical totals; switch it to
                // `right.clips()` once downstream consumers can take the
                // change.
                clips += slot.effect.clips();
            }
            if clips != 0 {
                tracing::warn!(
                    "`{}` clipped {} samples; decrease volume?",
                    slot.name,
                    clips
                );
            }
        }
    }

    /// Sum of per-effect clip counters across both channel tables.
    pub fn effect_clips(&self) -> u64 {
        let mut clips = 0;
        for slot in self.slots.iter().skip(1) {
            clips += slot.effect.clips();
            if slot.right.is_some() {
                // Same historical double-count as `stop_all`.
                clips += slot.effect.clips();
            }
        }
        clips
    }
}
