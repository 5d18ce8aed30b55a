//! The effects-chain planner: turns the user's effect list plus the
//! combiner and output formats into a started chain, auto-inserting rate
//! and channel adapters where the formats disagree.
//!
//! Insertion order is chosen for cost: shrinking work happens as early as
//! possible. A channel reduction goes before everything else, then a rate
//! reduction; whatever is still needed after the user's effects (only
//! increases, by then) is appended with the rate change first, since
//! resampling fewer channels is cheaper.

use crate::chain::{EffectChain, EffectSlot};
use crate::error::{EngineError, Result};
use crate::options::{MAX_EFFECTS, MAX_USER_EFFECTS};
use cadena_core::{ChainSignal, StartStatus};
use cadena_effects::registry;

/// One user-requested effect, as parsed from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRequest {
    /// Registered effect name.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<String>,
}

impl EffectRequest {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        EffectRequest {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Check the user's effect list against the registry and the single-change
/// rules. Returns whether the chain still needs a rate or channel adapter.
fn scan_user_effects(
    user: &[EffectRequest],
    mut need_rate: bool,
    mut need_chan: bool,
) -> Result<(bool, bool)> {
    if user.len() > MAX_USER_EFFECTS {
        return Err(EngineError::Usage(format!(
            "too many effects specified (at most {MAX_USER_EFFECTS} allowed)"
        )));
    }

    let mut chan_effects = 0;
    let mut rate_effects = 0;
    for request in user {
        let info = registry::find(&request.name)
            .ok_or_else(|| cadena_core::EffectError::Unknown(request.name.clone()))?;
        if info.flags.deprecated {
            tracing::warn!(
                "effect `{}` is deprecated and may be removed in a future release",
                request.name
            );
        }
        if info.flags.changes_channels {
            need_chan = false;
            chan_effects += 1;
        }
        if info.flags.changes_rate {
            need_rate = false;
            rate_effects += 1;
        }
    }
    if chan_effects > 1 {
        return Err(EngineError::Usage(
            "cannot specify multiple effects that change the number of channels".into(),
        ));
    }
    if rate_effects > 1 {
        return Err(EngineError::Usage(
            "cannot specify multiple effects that change the sample rate".into(),
        ));
    }
    Ok((need_rate, need_chan))
}

/// Append an effect slot, propagating the running signal through it and
/// creating a right-channel twin when the handler can't take interleaved
/// multi-channel input.
fn add_effect(
    chain: &mut EffectChain,
    request: &EffectRequest,
    signal: &mut ChainSignal,
    target: ChainSignal,
) -> Result<()> {
    if chain.slots.len() >= MAX_EFFECTS {
        return Err(EngineError::Usage(format!(
            "effects chain too long (at most {} slots)",
            MAX_EFFECTS - 1
        )));
    }
    let info = registry::find(&request.name)
        .ok_or_else(|| cadena_core::EffectError::Unknown(request.name.clone()))?;
    let effect = registry::create(&request.name, &request.args)?;

    let in_signal = *signal;
    let out_signal = effect.output_signal(in_signal, target);

    // The twin shares the handler but keeps independent state, so it is
    // built from the same name and arguments.
    let right = if in_signal.channels > 1 && !info.flags.multichannel {
        Some(registry::create(&request.name, &request.args)?)
    } else {
        None
    };

    let buffer_size = chain.buffer_size();
    chain.slots.push(EffectSlot {
        name: request.name.clone(),
        flags: info.flags,
        effect,
        right,
        in_signal,
        out_signal,
        obuf: vec![0; buffer_size],
        olen: 0,
        odone: 0,
    });
    *signal = out_signal;
    Ok(())
}

/// Build the full chain for a session.
pub fn build_chain(
    user: &[EffectRequest],
    combiner: ChainSignal,
    output: ChainSignal,
    buffer_size: usize,
) -> Result<EffectChain> {
    let need_rate = combiner.rate != output.rate;
    let need_chan = combiner.channels != output.channels;
    let (mut need_rate, mut need_chan) = scan_user_effects(user, need_rate, need_chan)?;

    let mut chain = EffectChain::new(combiner, buffer_size);
    let mut signal = combiner;
    let default_mixer = EffectRequest::new("mixer", &[]);
    let default_rate = EffectRequest::new("rate", &[]);

    // Reducing channels first makes every later stage cheaper.
    if need_chan && combiner.channels > output.channels {
        add_effect(&mut chain, &default_mixer, &mut signal, output)?;
        need_chan = false;
    }
    // Reducing the rate next, before the user's effects see the stream.
    if need_rate && combiner.rate > output.rate {
        add_effect(&mut chain, &default_rate, &mut signal, output)?;
        need_rate = false;
    }
    for request in user {
        add_effect(&mut chain, request, &mut signal, output)?;
    }
    // Anything left is an increase; raise the rate while the channel count
    // is still small.
    if need_rate {
        add_effect(&mut chain, &default_rate, &mut signal, output)?;
    }
    if need_chan {
        add_effect(&mut chain, &default_mixer, &mut signal, output)?;
    }

    Ok(chain)
}

/// Start every effect, removing slots that report they would do nothing,
/// and log the resulting chain.
pub fn start_all(chain: &mut EffectChain) -> Result<()> {
    let mut i = 1;
    while i < chain.slots.len() {
        let slot = &mut chain.slots[i];
        let mut remove = false;

        if slot.flags.proxy {
            tracing::info!("`{}` has no effect (is a proxy effect)", slot.name);
            remove = true;
        } else {
            match slot.effect.start(slot.in_signal, slot.out_signal)? {
                StartStatus::Run => {}
                StartStatus::Bypass => {
                    tracing::warn!("`{}` has no effect in this configuration", slot.name);
                    remove = true;
                }
            }
        }

        if remove {
            chain.slots.remove(i);
            continue;
        }

        let slot = &mut chain.slots[i];
        if let Some(right) = slot.right.as_mut() {
            // The left instance decides whether the slot stays; the twin
            // just gets configured.
            right.start(slot.in_signal, slot.out_signal)?;
        }
        i += 1;
    }

    for slot in chain.slots.iter().skip(1) {
        tracing::debug!(
            "effects chain: {:10} {:6} {}Hz",
            slot.name,
            if slot.in_signal.channels < 2 {
                "mono"
            } else if slot.flags.multichannel {
                "multi"
            } else {
                "stereo"
            },
            slot.in_signal.rate
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(rate: u32, channels: u32) -> ChainSignal {
        ChainSignal { rate, channels }
    }

    fn names(chain: &EffectChain) -> Vec<&str> {
        chain.slots.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn matching_formats_need_no_adapters() {
        let chain = build_chain(&[], sig(44100, 2), sig(44100, 2), 8192).unwrap();
        assert_eq!(names(&chain), vec!["input"]);
    }

    #[test]
    fn reductions_are_prepended_channel_first() {
        let user = vec![EffectRequest::new("vol", &["0.5"])];
        let chain = build_chain(&user, sig(44100, 2), sig(22050, 1), 8192).unwrap();
        assert_eq!(names(&chain), vec!["input", "mixer", "rate", "vol"]);

        // The stream shrinks before the user effect sees it.
        assert_eq!(chain.slots[1].out_signal, sig(44100, 1));
        assert_eq!(chain.slots[2].out_signal, sig(22050, 1));
        assert_eq!(chain.slots[3].in_signal, sig(22050, 1));
    }

    #[test]
    fn increases_are_appended_rate_first() {
        let user = vec![EffectRequest::new("vol", &["0.5"])];
        let chain = build_chain(&user, sig(22050, 1), sig(44100, 2), 8192).unwrap();
        assert_eq!(names(&chain), vec!["input", "vol", "rate", "mixer"]);
        assert_eq!(chain.slots[2].out_signal, sig(44100, 1));
        assert_eq!(chain.slots[3].out_signal, sig(44100, 2));
    }

    #[test]
    fn user_rate_effect_suppresses_the_default() {
        let user = vec![EffectRequest::new("rate", &["8000"])];
        let chain = build_chain(&user, sig(44100, 1), sig(8000, 1), 8192).unwrap();
        assert_eq!(names(&chain), vec!["input", "rate"]);
        assert_eq!(chain.output_signal(), sig(8000, 1));
    }

    #[test]
    fn multiple_channel_changers_are_refused() {
        let user = vec![
            EffectRequest::new("mixer", &["1"]),
            EffectRequest::new("mixer", &["2"]),
        ];
        let err = build_chain(&user, sig(44100, 2), sig(44100, 2), 8192).unwrap_err();
        assert!(err.to_string().contains("number of channels"));
    }

    #[test]
    fn multiple_rate_changers_are_refused() {
        let user = vec![
            EffectRequest::new("rate", &["8000"]),
            EffectRequest::new("rate", &["16000"]),
        ];
        let err = build_chain(&user, sig(44100, 1), sig(16000, 1), 8192).unwrap_err();
        assert!(err.to_string().contains("sample rate"));
    }

    #[test]
    fn unknown_effects_are_refused() {
        let user = vec![EffectRequest::new("flanger", &[])];
        let err = build_chain(&user, sig(44100, 1), sig(44100, 1), 8192).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn non_multichannel_effects_get_a_twin_on_stereo() {
        let user = vec![EffectRequest::new("reverse", &[])];
        let chain = build_chain(&user, sig(44100, 2), sig(44100, 2), 8192).unwrap();
        assert!(chain.slots[1].right.is_some());

        let mono = build_chain(&user, sig(44100, 1), sig(44100, 1), 8192).unwrap();
        assert!(mono.slots[1].right.is_none());
    }

    #[test]
    fn start_removes_bypassed_slots() {
        let user = vec![
            EffectRequest::new("vol", &["1.0"]),
            EffectRequest::new("vol", &["0.5"]),
        ];
        let mut chain = build_chain(&user, sig(44100, 1), sig(44100, 1), 8192).unwrap();
        assert_eq!(chain.slots.len(), 3);

        start_all(&mut chain).unwrap();
        assert_eq!(chain.slots.len(), 2);
        assert_eq!(chain.slots[1].name, "vol");
    }

    #[test]
    fn auto_inserted_resampler_configures_from_target() {
        let mut chain = build_chain(&[], sig(44100, 1), sig(22050, 1), 8192).unwrap();
        assert_eq!(names(&chain), vec!["input", "rate"]);
        start_all(&mut chain).unwrap();
        // Still present: a real rate change never bypasses.
        assert_eq!(chain.slots.len(), 2);
    }

    #[test]
    fn too_many_user_effects_are_refused() {
        let user: Vec<EffectRequest> = (0..MAX_USER_EFFECTS + 1)
            .map(|_| EffectRequest::new("vol", &["0.5"]))
            .collect();
        let err = build_chain(&user, sig(44100, 1), sig(44100, 1), 8192).unwrap_err();
        assert!(err.to_string().contains("too many effects"));
    }
}
