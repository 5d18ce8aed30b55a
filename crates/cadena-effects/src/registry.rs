//! The effect registry: names, usage strings, capability flags and
//! constructors for every built-in effect.

use crate::{Mixer, Rate, Repeat, Reverse, Trim, Vol};
use cadena_core::{Effect, EffectError, EffectFlags};

/// Descriptor for one registered effect.
#[derive(Debug, Clone, Copy)]
pub struct EffectInfo {
    /// Effect name as given on the command line.
    pub name: &'static str,
    /// One-line usage string.
    pub usage: &'static str,
    /// Capability flags.
    pub flags: EffectFlags,
}

const MCHAN: EffectFlags = EffectFlags {
    multichannel: true,
    changes_channels: false,
    changes_rate: false,
    changes_length: false,
    proxy: false,
    deprecated: false,
};

const RATE_FLAGS: EffectFlags = EffectFlags {
    multichannel: false,
    changes_channels: false,
    changes_rate: true,
    changes_length: false,
    proxy: false,
    deprecated: false,
};

const SPLIT: EffectFlags = EffectFlags {
    multichannel: false,
    changes_channels: false,
    changes_rate: false,
    changes_length: false,
    proxy: false,
    deprecated: false,
};

static EFFECTS: &[EffectInfo] = &[
    EffectInfo {
        name: "vol",
        usage: "vol GAIN[dB]",
        flags: MCHAN,
    },
    EffectInfo {
        name: "trim",
        usage: "trim START [LENGTH]",
        flags: MCHAN,
    },
    EffectInfo {
        name: "mixer",
        usage: "mixer [CHANNELS]",
        flags: crate::mixer::FLAGS,
    },
    EffectInfo {
        name: "rate",
        usage: "rate [RATE]",
        flags: RATE_FLAGS,
    },
    EffectInfo {
        name: "reverse",
        usage: "reverse",
        flags: SPLIT,
    },
    EffectInfo {
        name: "repeat",
        usage: "repeat [COUNT]",
        flags: crate::repeat::FLAGS,
    },
];

/// All registered effects, in listing order.
pub fn all_effects() -> &'static [EffectInfo] {
    EFFECTS
}

/// Look up an effect descriptor by name.
pub fn find(name: &str) -> Option<&'static EffectInfo> {
    EFFECTS.iter().find(|e| e.name == name)
}

/// Construct an effect from its name and arguments.
pub fn create(name: &str, args: &[String]) -> Result<Box<dyn Effect + Send>, EffectError> {
    match name {
        "vol" => Ok(Box::new(Vol::from_args(args)?)),
        "trim" => Ok(Box::new(Trim::from_args(args)?)),
        "mixer" => Ok(Box::new(Mixer::from_args(args)?)),
        "rate" => Ok(Box::new(Rate::from_args(args)?)),
        "reverse" => Ok(Box::new(Reverse::from_args(args)?)),
        "repeat" => Ok(Box::new(Repeat::from_args(args)?)),
        _ => Err(EffectError::Unknown(name.to_string())),
    }
}
