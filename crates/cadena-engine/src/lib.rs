//! The cadena pipeline engine.
//!
//! A session ingests one or more audio inputs, optionally combines them
//! (sequence, concatenate, mix or merge), routes the result through a chain
//! of stateful effects, and writes the outcome to a single output. The
//! engine is single-threaded and cooperative: the only concurrency is a
//! pair of atomic flags written by the signal handler.
//!
//! The pieces, in data order:
//!
//! - [`file`]: input/output descriptors and replay-gain resolution
//! - [`combiner`]: reading and reconciling wide samples from the inputs
//! - [`planner`]: building the effect table with auto-inserted adapters
//! - [`chain`] / [`scheduler`]: the pull-based effects-chain engine
//! - [`sink`]: the output writer with partial-write retry
//! - [`progress`]: the debounced status line
//! - [`interrupt`]: skip/abort signal flags
//! - [`session`]: the driver loop tying it all together

pub mod chain;
pub mod combiner;
pub mod error;
pub mod file;
pub mod interrupt;
pub mod options;
pub mod planner;
pub mod progress;
pub mod scheduler;
pub mod session;
pub mod sink;

pub use chain::{EffectChain, EffectSlot};
pub use combiner::Combiner;
pub use error::{EngineError, Result};
pub use file::{InputFile, OutputFile};
pub use interrupt::Interrupt;
pub use options::{CombineMode, ReplayGainMode, SessionConfig};
pub use options::{DEFAULT_BUFFER_SIZE, MAX_EFFECTS, MAX_INPUT_FILES, MAX_USER_EFFECTS, MIN_BUFFER_SIZE};
pub use planner::EffectRequest;
pub use scheduler::FlowStatus;
pub use session::{Session, SessionOutcome};
