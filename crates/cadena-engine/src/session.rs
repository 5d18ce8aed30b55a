//! The per-session driver loop: opens files, plans and starts the chain,
//! pumps the combiner through the scheduler into the sink, drains, and
//! tears everything down.

use crate::chain::EffectChain;
use crate::combiner::{balance_input, read_wide, Combiner};
use crate::error::{EngineError, Result};
use crate::file::{InputFile, OutputFile};
use crate::interrupt::Interrupt;
use crate::options::{CombineMode, SessionConfig, MAX_INPUT_FILES};
use crate::planner::{build_chain, start_all, EffectRequest};
use crate::progress::{format_time, ProgressReporter, ProgressSnapshot};
use crate::scheduler::FlowStatus;
use crate::sink::SinkWriter;
use cadena_effects::registry;
use cadena_format::open_write;
use std::io::IsTerminal;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Ran to completion.
    Done,
    /// The user aborted; output up to that point was kept.
    Aborted,
}

/// One processing session: inputs -> balancing -> combiner -> effects ->
/// output.
pub struct Session {
    config: SessionConfig,
    inputs: Vec<InputFile>,
    output: OutputFile,
    user_effects: Vec<EffectRequest>,
    interrupt: Interrupt,
    progress: ProgressReporter,
    /// The output format exactly as requested, restored before every
    /// derivation so sequence reopens start from the same hints.
    output_signal_request: cadena_core::SignalInfo,

    current_input: usize,
    read_wide_samples: u64,
    input_wide_samples: u64,

    // Accumulators that survive sequence-mode reopens.
    output_samples_base: u64,
    output_clips_base: u64,
    mixing_clips_base: u64,

    output_opened: bool,
    overwrite_checked: bool,
}

impl Session {
    /// Validate and assemble a session.
    pub fn new(
        config: SessionConfig,
        inputs: Vec<InputFile>,
        output: OutputFile,
        user_effects: Vec<EffectRequest>,
        interrupt: Interrupt,
    ) -> Result<Self> {
        if inputs.len() > MAX_INPUT_FILES {
            return Err(EngineError::Usage(format!(
                "too many filenames; maximum is {MAX_INPUT_FILES} input files and 1 output file"
            )));
        }
        let minimum = if config.combine.is_serial() { 1 } else { 2 };
        if inputs.len() < minimum {
            return Err(EngineError::Usage(
                "not enough input filenames specified".into(),
            ));
        }
        let progress = ProgressReporter::new(config.show_progress);
        let output_signal_request = output.signal.clone();
        Ok(Session {
            config,
            inputs,
            output,
            user_effects,
            interrupt,
            progress,
            output_signal_request,
            current_input: 0,
            read_wide_samples: 0,
            input_wide_samples: 0,
            output_samples_base: 0,
            output_clips_base: 0,
            mixing_clips_base: 0,
            output_opened: false,
            overwrite_checked: false,
        })
    }

    /// Run the whole job: every input, every sequence re-entry, teardown
    /// included. An incomplete output file is removed on failure.
    pub fn run(&mut self) -> Result<SessionOutcome> {
        let result = self.run_inner();
        if result.is_err() {
            self.remove_incomplete_output();
        }
        result
    }

    fn run_inner(&mut self) -> Result<SessionOutcome> {
        self.apply_default_mix_volumes();
        self.open_inputs()?;

        // A null output with no effects asks for file information only.
        if self.output.is_null() && self.user_effects.is_empty() {
            for i in 0..self.inputs.len() {
                self.report_input(i);
            }
            return Ok(SessionOutcome::Done);
        }

        if self.config.combine == CombineMode::Sequence {
            loop {
                let status = self.process()?;
                if status == FlowStatus::Eof
                    || self.interrupt.aborted()
                    || self.current_input >= self.inputs.len()
                {
                    break;
                }
            }
        } else {
            self.process()?;
        }

        self.report_clip_warnings();
        let aborted = self.interrupt.aborted();
        self.progress
            .println(if aborted { "Aborted." } else { "Done." });
        Ok(if aborted {
            SessionOutcome::Aborted
        } else {
            SessionOutcome::Done
        })
    }

    fn apply_default_mix_volumes(&mut self) {
        // Mixing at unity gain clips trivially, so default every input to
        // 1/N unless the user set any volume themselves.
        if self.config.combine == CombineMode::Mix
            && self.inputs.iter().all(|f| f.volume.is_none())
        {
            let share = 1.0 / self.inputs.len() as f64;
            for input in &mut self.inputs {
                input.volume = Some(share);
            }
        }
    }

    fn open_inputs(&mut self) -> Result<()> {
        // Interrupts are ignored while inputs open so that half-opened
        // streams aren't torn down by an early Ctrl+C.
        self.interrupt.disarm();
        for j in (0..self.inputs.len()).rev() {
            self.inputs[j].open(self.config.replay_gain)?;
            self.report_input(j);
        }
        Ok(())
    }

    fn report_input(&self, i: usize) {
        let input = &self.inputs[i];
        let spec = input.spec();
        let wide = input.wide_length();
        if wide > 0 {
            tracing::info!(
                "input `{}`: {} Hz, {} channels, {}-bit {}, {} ({} wide samples)",
                input.filename,
                spec.rate,
                spec.channels,
                spec.size.bits(),
                spec.encoding,
                format_time(wide as f64 / spec.rate as f64),
                wide
            );
        } else {
            tracing::info!(
                "input `{}`: {} Hz, {} channels, {}-bit {}, unknown length",
                input.filename,
                spec.rate,
                spec.channels,
                spec.size.bits(),
                spec.encoding
            );
        }
        if let Some(gain) = input.replay_gain {
            tracing::info!("input `{}`: replay gain {:+} dB", input.filename, gain);
        }
    }

    /// One pass of the driver loop; sequence mode calls this once per
    /// (re)opened output.
    fn process(&mut self) -> Result<FlowStatus> {
        let serial = self.config.combine.is_serial();

        // --- derive the combiner's signal and the expected length -------
        let mut combiner_spec = self.inputs[self.current_input].spec();
        let mut known_length = self.config.combine != CombineMode::Sequence;
        let mut output_wide_len: u64 = 0;

        if self.config.combine == CombineMode::Sequence {
            if self.current_input == 0 {
                for i in 0..self.inputs.len() {
                    self.report_input(i);
                }
            }
        } else {
            let mut total_channels = 0u32;
            let mut min_channels = u32::MAX;
            let mut max_channels = 0u32;
            let mut min_rate = u32::MAX;
            let mut max_rate = 0u32;
            for input in &self.inputs {
                let spec = input.spec();
                total_channels += spec.channels;
                min_channels = min_channels.min(spec.channels);
                max_channels = max_channels.max(spec.channels);
                min_rate = min_rate.min(spec.rate);
                max_rate = max_rate.max(spec.rate);
                let wide = input.wide_length();
                known_length = known_length && wide != 0;
                if self.config.combine == CombineMode::Concatenate {
                    output_wide_len += wide;
                } else {
                    output_wide_len = output_wide_len.max(wide);
                }
            }
            if min_rate != max_rate {
                return Err(EngineError::Usage(
                    "input files must have the same sample rate".into(),
                ));
            }
            if min_channels != max_channels {
                match self.config.combine {
                    CombineMode::Concatenate => {
                        return Err(EngineError::Usage(
                            "input files must have the same number of channels".into(),
                        ))
                    }
                    CombineMode::Mix => {
                        tracing::warn!("input files don't have the same number of channels")
                    }
                    _ => {}
                }
            }
            combiner_spec.channels = if self.config.combine == CombineMode::Merge {
                total_channels
            } else {
                max_channels
            };
        }

        // Unset output fields come from the combiner, from the original
        // request each time around.
        let output_spec = self.output_signal_request.resolve_with(&combiner_spec);

        // The stream's rate label absorbs the speed factor after the
        // output's default was taken.
        combiner_spec.rate = (combiner_spec.rate as f64 * self.config.speed + 0.5) as u32;

        for request in &self.user_effects {
            if let Some(info) = registry::find(&request.name) {
                known_length = known_length && !info.flags.changes_length;
            }
        }
        if !known_length {
            output_wide_len = 0;
        }

        // --- open the output --------------------------------------------
        let comment = match &self.output.comment {
            None => Some(
                self.inputs[0]
                    .reader
                    .as_ref()
                    .and_then(|r| r.comment())
                    .unwrap_or("Processed by cadena")
                    .to_string(),
            ),
            Some(text) if text.is_empty() => None,
            Some(text) => Some(text.clone()),
        };

        if !self.overwrite_checked {
            self.check_overwrite()?;
            self.overwrite_checked = true;
        }
        let writer = open_write(
            &self.output.filename,
            output_spec,
            comment.as_deref(),
            output_wide_len * output_spec.channels as u64,
            self.output.filetype.as_deref(),
        )?;
        self.output_opened = true;
        let mut sink = SinkWriter::new(writer, self.output.filename.clone());

        // --- build and start the chain ----------------------------------
        let mut chain = build_chain(
            &self.user_effects,
            combiner_spec.chain_signal(),
            output_spec.chain_signal(),
            self.config.buffer_size,
        )?;
        start_all(&mut chain)?;

        let mut combiner = Combiner::new(
            self.config.combine,
            combiner_spec,
            self.config.buffer_size,
            self.inputs.len(),
        );

        if serial {
            self.progress_to_file(self.current_input);
        } else {
            let mut longest = 0;
            for i in 0..self.inputs.len() {
                self.progress_to_file(i);
                longest = longest.max(self.input_wide_samples);
            }
            // The session runs as long as the longest input.
            self.input_wide_samples = longest;
        }

        self.optimize_trim(&mut chain);

        chain.rewind();
        self.interrupt
            .arm(self.config.show_progress && serial);

        // --- the pump ----------------------------------------------------
        let mut flowstatus = FlowStatus::More;
        let mut write_error: Option<EngineError> = None;
        loop {
            let mut wide = 0usize;
            if serial {
                if !self.interrupt.skip_requested() {
                    let slot = chain.source_slot();
                    wide = read_wide(
                        &mut self.inputs[self.current_input],
                        &mut slot.obuf,
                        combiner.signal.channels,
                        self.config.buffer_size,
                    )?;
                }
                if wide == 0 {
                    // This input is finished (or being skipped).
                    let snapshot = self.snapshot(&sink, &chain, &combiner);
                    self.progress.finish(snapshot);
                    if self.interrupt.skip_requested() {
                        self.interrupt.clear_skip();
                        self.progress.println("Skipped.");
                    }
                    self.current_input += 1;
                    if self.current_input < self.inputs.len() {
                        if self.config.combine == CombineMode::Sequence
                            && !self.can_segue(self.current_input)
                        {
                            break;
                        }
                        self.progress_to_file(self.current_input);
                        continue;
                    }
                } else {
                    let input = &mut self.inputs[self.current_input];
                    let slot = chain.source_slot();
                    balance_input(&mut slot.obuf, wide, input);
                }
            } else {
                let slot = chain.source_slot();
                wide = combiner.combine_next(&mut self.inputs, &mut slot.obuf)?;
            }

            if wide == 0 {
                break;
            }

            let channels = combiner.signal.channels as usize;
            let slot = chain.source_slot();
            slot.odone = 0;
            slot.olen = wide * channels;
            self.read_wide_samples += wide as u64;

            match chain.flow_out(&mut sink, &self.interrupt) {
                Ok(status) => flowstatus = status,
                Err(error @ EngineError::Write { .. }) => {
                    tracing::warn!("{error}");
                    write_error = Some(error);
                }
                Err(error) => return Err(error),
            }

            let done = self.interrupt.aborted()
                || write_error.is_some()
                || flowstatus == FlowStatus::Eof;
            let snapshot = self.snapshot(&sink, &chain, &combiner);
            if done {
                self.progress.finish(snapshot);
            } else {
                self.progress.update(snapshot);
            }

            // Stop reading and writing on aborts; files still close
            // cleanly below, as if the input had ended.
            if self.interrupt.aborted() || write_error.is_some() || flowstatus == FlowStatus::Eof
            {
                break;
            }
        }

        // Drain residual effect output, unless the output is broken.
        if write_error.is_none() {
            chain.drain_out(&mut sink, &self.interrupt)?;
        }

        // More samples may be reported (not written) while stopping.
        chain.stop_all();

        if write_error.is_none() {
            sink.finalize()?;
        }

        self.output_samples_base += sink.output_samples;
        self.output_clips_base += sink.clips();
        self.mixing_clips_base += combiner.mixing_clips;

        match write_error {
            Some(error) => Err(error),
            None => Ok(flowstatus),
        }
    }

    /// Reset per-file counters, apply default volume and replay gain, and
    /// announce the file.
    fn progress_to_file(&mut self, i: usize) {
        self.read_wide_samples = 0;
        self.input_wide_samples = self.inputs[i].wide_length();

        let input = &mut self.inputs[i];
        if input.volume.is_none() {
            input.volume = Some(1.0);
        }
        if let Some(gain) = input.replay_gain {
            let adjusted = input.volume.unwrap_or(1.0) * cadena_core::db_to_linear(gain);
            input.volume = Some(adjusted);
        }
        if self.config.show_progress {
            let spec = self.inputs[i].spec();
            self.progress.println(&format!(
                "In: `{}` ({} Hz, {} channels)",
                self.inputs[i].filename, spec.rate, spec.channels
            ));
        }
    }

    /// Whether input `i` can continue the stream input `i - 1` was playing.
    fn can_segue(&self, i: usize) -> bool {
        let a = self.inputs[i].spec();
        let b = self.inputs[i - 1].spec();
        a.channels == b.channels && a.rate == b.rate
    }

    /// If the chain leads with a trim over a single seekable input, seek
    /// the input past the trimmed span instead of decoding it.
    fn optimize_trim(&mut self, chain: &mut EffectChain) {
        if self.inputs.len() != 1 || chain.slots.len() < 2 || chain.slots[1].name != "trim" {
            return;
        }
        let reader = match self.inputs[0].reader.as_mut() {
            Some(r) if r.seekable() => r,
            _ => return,
        };
        let offset = match chain.slots[1].effect.initial_skip() {
            Some(o) => o,
            None => return,
        };
        if reader.seek(offset).is_ok() {
            let channels = reader.signal().channels.max(1) as u64;
            self.read_wide_samples = offset / channels;
            // The skipped span is behind us; the trim must not discard it
            // again.
            chain.slots[1].effect.clear_initial_skip();
            tracing::debug!("seeked input past {} samples for leading trim", offset);
        }
    }

    fn check_overwrite(&mut self) -> Result<()> {
        if self.output.is_null() || self.output.filename == "-" {
            return Ok(());
        }
        if !std::path::Path::new(&self.output.filename).exists() {
            return Ok(());
        }
        if !self.config.interactive {
            tracing::info!("overwriting `{}`", self.output.filename);
            return Ok(());
        }
        tracing::warn!("output file `{}` already exists", self.output.filename);
        if !std::io::stdin().is_terminal() {
            return Err(EngineError::OverwriteRefused(self.output.filename.clone()));
        }
        loop {
            eprint!("cadena: overwrite `{}` (y/n)? ", self.output.filename);
            let mut answer = String::new();
            if std::io::stdin().read_line(&mut answer).is_err() {
                return Err(EngineError::OverwriteRefused(self.output.filename.clone()));
            }
            match answer.trim() {
                "y" | "Y" => return Ok(()),
                "n" | "N" => {
                    return Err(EngineError::OverwriteRefused(self.output.filename.clone()))
                }
                _ => continue,
            }
        }
    }

    fn snapshot(
        &self,
        sink: &SinkWriter,
        chain: &EffectChain,
        combiner: &Combiner,
    ) -> ProgressSnapshot {
        ProgressSnapshot {
            read_wide_samples: self.read_wide_samples,
            input_wide_samples: self.input_wide_samples,
            rate: combiner.signal.rate,
            output_samples: self.output_samples_base + sink.output_samples,
            clips: self.total_clips(sink, chain, combiner),
        }
    }

    fn total_clips(&self, sink: &SinkWriter, chain: &EffectChain, combiner: &Combiner) -> u64 {
        let mut clips = 0;
        for input in &self.inputs {
            clips += input.read_clips() + input.volume_clips;
        }
        clips += self.output_clips_base + sink.clips();
        clips += self.mixing_clips_base + combiner.mixing_clips;
        clips += chain.effect_clips();
        clips
    }

    fn report_clip_warnings(&self) {
        for input in &self.inputs {
            if input.read_clips() > 0 {
                tracing::warn!(
                    "`{}`: input clipped {} samples",
                    input.filename,
                    input.read_clips()
                );
            }
            if input.volume_clips > 0 {
                tracing::warn!(
                    "`{}`: balancing clipped {} samples; decrease volume?",
                    input.filename,
                    input.volume_clips
                );
            }
        }
        if self.output_clips_base > 0 {
            tracing::warn!(
                "`{}`: output clipped {} samples; decrease volume?",
                self.output.filename,
                self.output_clips_base
            );
        }
        if self.mixing_clips_base > 0 {
            tracing::warn!(
                "mix-combining clipped {} samples; decrease volume?",
                self.mixing_clips_base
            );
        }
    }

    fn remove_incomplete_output(&self) {
        if !self.output_opened || self.output.is_null() || self.output.filename == "-" {
            return;
        }
        let path = std::path::Path::new(&self.output.filename);
        if path.metadata().map(|m| m.is_file()).unwrap_or(false) {
            if let Err(error) = std::fs::remove_file(path) {
                tracing::warn!(
                    "could not remove incomplete output `{}`: {error}",
                    self.output.filename
                );
            } else {
                tracing::debug!("removed incomplete output `{}`", self.output.filename);
            }
        }
    }

    /// Wide samples delivered to the output across the whole run.
    pub fn output_samples(&self) -> u64 {
        self.output_samples_base
    }
}
