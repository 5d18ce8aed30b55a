//! Session-level configuration.

/// How multiple inputs become one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMode {
    /// One input at a time; each must segue (same rate and channels) into
    /// the next, and the output is reopened between them.
    Sequence,
    /// One input after another through a single output; channel counts must
    /// match up front.
    #[default]
    Concatenate,
    /// Sum all inputs sample by sample.
    Mix,
    /// Stack all inputs' channels into one wide frame.
    Merge,
}

impl CombineMode {
    /// Whether inputs are consumed one at a time.
    pub fn is_serial(self) -> bool {
        matches!(self, CombineMode::Sequence | CombineMode::Concatenate)
    }
}

/// Which replay-gain tag to honour on input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayGainMode {
    /// Ignore replay-gain tags.
    #[default]
    Off,
    /// Prefer the per-track gain.
    Track,
    /// Prefer the per-album gain.
    Album,
}

/// Most inputs the registry accepts.
pub const MAX_INPUT_FILES: usize = 32;

/// Most slots in an effects chain, including the input sentinel.
pub const MAX_EFFECTS: usize = 16;

/// Most effects a user may specify, leaving room for auto-inserted
/// adapters.
pub const MAX_USER_EFFECTS: usize = 14;

/// Default per-slot buffer size in samples.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Smallest accepted buffer size.
pub const MIN_BUFFER_SIZE: usize = 17;

/// Settings that shape a whole session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Input combining mode.
    pub combine: CombineMode,
    /// Replay-gain policy for inputs.
    pub replay_gain: ReplayGainMode,
    /// Per-slot buffer size in samples.
    pub buffer_size: usize,
    /// Show the periodic status line.
    pub show_progress: bool,
    /// Ask before overwriting an existing output file.
    pub interactive: bool,
    /// Playback-speed factor applied to the combined stream's rate label.
    pub speed: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            combine: CombineMode::default(),
            replay_gain: ReplayGainMode::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            show_progress: false,
            interactive: false,
            speed: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_modes() {
        assert!(CombineMode::Sequence.is_serial());
        assert!(CombineMode::Concatenate.is_serial());
        assert!(!CombineMode::Mix.is_serial());
        assert!(!CombineMode::Merge.is_serial());
    }
}
