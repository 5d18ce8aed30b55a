//! The pull scheduler: drives the chain from the sink end, requesting data
//! from predecessors only when the current slot needs more.
//!
//! Buffers are single windows with produced/consumed cursors rather than
//! queues, so the chain is run backwards: each slot finishes flushing its
//! buffer before anything upstream is asked to refill it. End of stream
//! propagates forward through `input_eff`; once a slot reports it, earlier
//! slots are never called again, and later ones are drained in turn.

use crate::chain::EffectChain;
use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::sink::{SinkWriter, WriteOutcome};

/// Whether the chain can accept more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Keep feeding the input slot.
    More,
    /// No further input reads are needed.
    Eof,
}

impl EffectChain {
    /// Push everything pending through the chain and out to the sink,
    /// until no slot holds a full frame.
    ///
    /// Returns [`FlowStatus::Eof`] once an effect has taken over as the
    /// stream's source (`input_eff > 0`), meaning the caller should stop
    /// reading input.
    pub fn flow_out(&mut self, sink: &mut SinkWriter, interrupt: &Interrupt) -> Result<FlowStatus> {
        loop {
            // Pull pass, sink end first. Stops early when a slot is left
            // with unconsumed output so downstream can drain it before the
            // slot is asked for more.
            let mut e = self.slots.len() - 1;
            while e >= 1 && e >= self.input_eff {
                if !(e == self.input_eff && self.input_eff_eof) {
                    if self.flow_slot(e, interrupt)? {
                        self.input_eff = e;
                        self.input_eff_eof = false;
                    }
                    if self.slots[e].pending() > 0 {
                        break;
                    }
                }
                if e == 1 {
                    break;
                }
                e -= 1;
            }

            // Write whatever the final stage produced.
            let last = self.slots.len() - 1;
            if self.slots[last].olen > self.slots[last].odone {
                let olen = self.slots[last].olen;
                match sink.write_all(&self.slots[last].obuf[..olen], interrupt)? {
                    WriteOutcome::Done => {}
                    WriteOutcome::Aborted => return Ok(FlowStatus::Eof),
                }
            } else {
                sink.account_unwritten(self.slots[last].olen);
            }
            self.slots[last].odone = 0;
            self.slots[last].olen = 0;

            // Find out who still holds data, recycling buffers that were
            // fully consumed.
            let mut havedata = false;
            let mut e = self.slots.len();
            while e > self.input_eff {
                e -= 1;
                let slot = &mut self.slots[e];
                if slot.odone == slot.olen {
                    slot.odone = 0;
                    slot.olen = 0;
                }
                if slot.pending() > 0 {
                    // Only a full output frame counts as progress.
                    if slot.pending() >= sink.channels() as usize {
                        havedata = true;
                    } else {
                        tracing::warn!("received buffer with incomplete amount of samples");
                    }
                }
            }

            // Past the producer slot: prime the pump from the drain side.
            if !havedata && self.input_eff > 0 {
                if self.input_eff_eof {
                    self.input_eff += 1;
                    self.input_eff_eof = false;
                }
                while self.input_eff < self.slots.len() {
                    let eof = self.drain_slot(self.input_eff)?;
                    if self.slots[self.input_eff].olen == 0 {
                        self.input_eff += 1;
                        self.input_eff_eof = false;
                    } else {
                        havedata = true;
                        self.input_eff_eof = eof;
                        break;
                    }
                }
            }

            if !havedata {
                break;
            }
        }

        if self.input_eff > 0 {
            tracing::debug!("chain reached end of stream");
            Ok(FlowStatus::Eof)
        } else {
            Ok(FlowStatus::More)
        }
    }

    /// Drain residual samples out of every effect after input is
    /// exhausted.
    pub fn drain_out(&mut self, sink: &mut SinkWriter, interrupt: &Interrupt) -> Result<FlowStatus> {
        // The input sentinel has nothing to drain.
        if self.input_eff == 0 {
            self.input_eff = 1;
            self.input_eff_eof = false;
        }

        // Prime the pump, then let the standard flow routine suck the data
        // through.
        while self.input_eff < self.slots.len() {
            let eof = self.drain_slot(self.input_eff)?;
            if self.slots[self.input_eff].olen == 0 {
                self.input_eff += 1;
                self.input_eff_eof = false;
            } else {
                self.input_eff_eof = eof;
                break;
            }
        }

        self.flow_out(sink, interrupt)
    }
}
