//! cadena - command-line audio pipeline processor.
//!
//! `cadena [OPTIONS] INPUT... OUTPUT` reads one or more audio files,
//! optionally combines them, routes the samples through an effects chain,
//! and writes a single output. See `--help` for the full surface.

mod chainspec;

use cadena_core::{Encoding, SampleSize, SignalInfo};
use cadena_engine::{
    CombineMode, EffectRequest, EngineError, InputFile, Interrupt, OutputFile, ReplayGainMode,
    Session, SessionConfig, SessionOutcome, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CombineOpt {
    Sequence,
    Concatenate,
    Mix,
    Merge,
}

impl From<CombineOpt> for CombineMode {
    fn from(opt: CombineOpt) -> Self {
        match opt {
            CombineOpt::Sequence => CombineMode::Sequence,
            CombineOpt::Concatenate => CombineMode::Concatenate,
            CombineOpt::Mix => CombineMode::Mix,
            CombineOpt::Merge => CombineMode::Merge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReplayGainOpt {
    Off,
    Track,
    Album,
}

impl From<ReplayGainOpt> for ReplayGainMode {
    fn from(opt: ReplayGainOpt) -> Self {
        match opt {
            ReplayGainOpt::Off => ReplayGainMode::Off,
            ReplayGainOpt::Track => ReplayGainMode::Track,
            ReplayGainOpt::Album => ReplayGainMode::Album,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EncodingOpt {
    Signed,
    Unsigned,
    Float,
    Ulaw,
    Alaw,
    Gsm,
}

impl From<EncodingOpt> for Encoding {
    fn from(opt: EncodingOpt) -> Self {
        match opt {
            EncodingOpt::Signed => Encoding::Signed,
            EncodingOpt::Unsigned => Encoding::Unsigned,
            EncodingOpt::Float => Encoding::Float,
            EncodingOpt::Ulaw => Encoding::Ulaw,
            EncodingOpt::Alaw => Encoding::Alaw,
            EncodingOpt::Gsm => Encoding::Gsm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EndianOpt {
    Little,
    Big,
}

#[derive(Parser, Debug)]
#[command(
    name = "cadena",
    version,
    disable_version_flag = true,
    about = "Command-line audio pipeline processor",
    long_about = "Reads one or more audio files, optionally combines them (concatenate, \
                  sequence, mix or merge), routes the samples through an effects chain, \
                  and writes a single output file. Playlists (.m3u/.pls) expand in place."
)]
struct Cli {
    /// Input files (or playlists), then the output file last; `-n` is the
    /// null output
    #[arg(value_name = "FILE", num_args = 0..)]
    files: Vec<String>,

    /// How to combine multiple inputs
    #[arg(long, value_enum, default_value = "concatenate")]
    combine: CombineOpt,

    /// Shortcut for --combine mix
    #[arg(short = 'm', long = "mix", conflicts_with = "combine")]
    mix: bool,

    /// Shortcut for --combine merge
    #[arg(short = 'M', long = "merge", conflicts_with_all = ["combine", "mix"])]
    merge: bool,

    /// Effects chain, e.g. "vol:0.5|trim:10,5|rate:8000"
    #[arg(short, long, value_name = "CHAIN")]
    effects: Option<String>,

    /// TOML file holding the effects chain
    #[arg(long, value_name = "PATH", conflicts_with = "effects")]
    effects_file: Option<PathBuf>,

    /// Per-slot buffer size in samples
    #[arg(long, value_name = "SAMPLES", default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer: usize,

    /// Honour replay-gain tags on inputs
    #[arg(long, value_enum, default_value = "off")]
    replay_gain: ReplayGainOpt,

    /// Prompt before overwriting the output file
    #[arg(long)]
    interactive: bool,

    /// Display progress while processing
    #[arg(short = 'S', long)]
    show_progress: bool,

    /// Run quietly (the default; kept for compatibility)
    #[arg(short = 'q', long, conflicts_with = "show_progress")]
    quiet: bool,

    /// Playback-speed factor applied to the stream's rate
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Input volume; repeat to address inputs in order
    #[arg(short = 'v', long = "volume", value_name = "FACTOR")]
    volume: Vec<f64>,

    /// Comment text for the output file
    #[arg(long, value_name = "TEXT")]
    comment: Option<String>,

    /// File containing comment text for the output file
    #[arg(long, value_name = "PATH", conflicts_with = "comment")]
    comment_file: Option<PathBuf>,

    /// Increase verbosity (repeat for more)
    #[arg(short = 'V', action = ArgAction::Count)]
    verbose: u8,

    /// Print version information and exit
    #[arg(long = "version", action = ArgAction::Version)]
    version: (),

    /// List available effects and exit
    #[arg(long)]
    list_effects: bool,

    /// Output sample rate
    #[arg(short = 'r', long, value_name = "HZ")]
    rate: Option<u32>,

    /// Output channel count
    #[arg(short = 'c', long, value_name = "N")]
    channels: Option<u32>,

    /// Output sample size in bits
    #[arg(long, value_name = "BITS")]
    bits: Option<u32>,

    /// Output sample encoding
    #[arg(long, value_enum)]
    encoding: Option<EncodingOpt>,

    /// Output file type, overriding extension detection
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    output_type: Option<String>,

    /// Sample rate of headerless inputs
    #[arg(long, value_name = "HZ")]
    in_rate: Option<u32>,

    /// Channel count of headerless inputs
    #[arg(long, value_name = "N")]
    in_channels: Option<u32>,

    /// Sample size of headerless inputs, in bits
    #[arg(long, value_name = "BITS")]
    in_bits: Option<u32>,

    /// Sample encoding of headerless inputs
    #[arg(long, value_enum)]
    in_encoding: Option<EncodingOpt>,

    /// Byte order of headerless inputs
    #[arg(long, value_enum)]
    in_endian: Option<EndianOpt>,

    /// Input file type, overriding extension detection
    #[arg(long, value_name = "TYPE")]
    in_type: Option<String>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn list_effects() {
    println!("Available effects:");
    for info in cadena_effects::all_effects() {
        let mut notes = Vec::new();
        if info.flags.changes_rate {
            notes.push("changes rate");
        }
        if info.flags.changes_channels {
            notes.push("changes channels");
        }
        if info.flags.changes_length {
            notes.push("changes length");
        }
        if notes.is_empty() {
            println!("  {:28}", info.usage);
        } else {
            println!("  {:28} ({})", info.usage, notes.join(", "));
        }
    }
}

fn usage_err(message: impl Into<String>) -> anyhow::Error {
    EngineError::Usage(message.into()).into()
}

fn bits_to_size(bits: u32, what: &str) -> anyhow::Result<SampleSize> {
    SampleSize::from_bits(bits)
        .ok_or_else(|| usage_err(format!("{what}: unsupported sample size {bits} bits")))
}

fn input_hints(cli: &Cli) -> anyhow::Result<SignalInfo> {
    let mut hints = SignalInfo::default();
    hints.rate = cli.in_rate;
    hints.channels = cli.in_channels;
    hints.encoding = cli.in_encoding.map(Encoding::from);
    if let Some(bits) = cli.in_bits {
        hints.size = Some(bits_to_size(bits, "--in-bits")?);
    }
    hints.reverse_bytes = match cli.in_endian {
        Some(EndianOpt::Big) => Some(true),
        Some(EndianOpt::Little) => Some(false),
        None => None,
    };
    Ok(hints)
}

fn output_request(cli: &Cli) -> anyhow::Result<SignalInfo> {
    let mut request = SignalInfo::default();
    request.rate = cli.rate;
    request.channels = cli.channels;
    request.encoding = cli.encoding.map(Encoding::from);
    if let Some(bits) = cli.bits {
        request.size = Some(bits_to_size(bits, "--bits")?);
    }
    if let Some(rate) = cli.rate {
        if rate == 0 {
            return Err(usage_err("--rate must be positive"));
        }
    }
    if let Some(channels) = cli.channels {
        if channels == 0 {
            return Err(usage_err("--channels must be positive"));
        }
    }
    Ok(request)
}

/// Expand playlists and attach hints and volumes to the input list.
fn collect_inputs(cli: &Cli, names: &[String]) -> anyhow::Result<Vec<InputFile>> {
    let hints = input_hints(cli)?;
    let mut inputs = Vec::new();
    for name in names {
        if cadena_format::is_playlist(name) {
            let entries =
                cadena_format::expand_playlist(name).map_err(|e| usage_err(e.to_string()))?;
            for entry in entries {
                let mut input = InputFile::new(entry);
                input.signal = hints.clone();
                input.filetype = cli.in_type.clone();
                inputs.push(input);
            }
        } else {
            let mut input = InputFile::new(name.clone());
            input.signal = hints.clone();
            input.filetype = cli.in_type.clone();
            inputs.push(input);
        }
    }
    if cli.volume.len() > inputs.len() {
        return Err(usage_err(format!(
            "{} volumes given for {} inputs",
            cli.volume.len(),
            inputs.len()
        )));
    }
    for (input, &volume) in inputs.iter_mut().zip(cli.volume.iter()) {
        if volume < 0.0 {
            tracing::info!("negative volume adjustment; this inverts the phase");
        }
        input.volume = Some(volume);
    }
    Ok(inputs)
}

fn read_comment_file(path: &std::path::Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| usage_err(format!("can't read comment file `{}`: {e}", path.display())))?;
    Ok(text.trim_end_matches('\n').to_string())
}

fn run(cli: Cli) -> anyhow::Result<SessionOutcome> {
    if cli.list_effects {
        list_effects();
        return Ok(SessionOutcome::Done);
    }

    if cli.buffer < MIN_BUFFER_SIZE {
        return Err(usage_err(format!(
            "buffer size must be at least {MIN_BUFFER_SIZE} samples"
        )));
    }

    if cli.files.len() < 2 {
        return Err(usage_err(
            "specify at least one input file and one output file",
        ));
    }
    let (input_names, output_name) = cli.files.split_at(cli.files.len() - 1);

    let combine = if cli.mix {
        CombineMode::Mix
    } else if cli.merge {
        CombineMode::Merge
    } else {
        CombineMode::from(cli.combine)
    };

    let effects: Vec<EffectRequest> = if let Some(path) = &cli.effects_file {
        chainspec::load_chain_file(path)?
    } else if let Some(spec) = &cli.effects {
        chainspec::parse_chain(spec).map_err(usage_err)?
    } else {
        Vec::new()
    };

    let inputs = collect_inputs(&cli, input_names)?;

    let mut output = OutputFile::new(output_name[0].clone());
    output.filetype = cli.output_type.clone();
    output.signal = output_request(&cli)?;
    output.comment = match (&cli.comment, &cli.comment_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(read_comment_file(path)?),
        (None, None) => None,
    };

    let config = SessionConfig {
        combine,
        replay_gain: ReplayGainMode::from(cli.replay_gain),
        buffer_size: cli.buffer,
        show_progress: cli.show_progress,
        interactive: cli.interactive,
        speed: cli.speed,
    };

    let interrupt = Interrupt::install().unwrap_or_else(|error| {
        tracing::warn!("{error}; interrupts will terminate immediately");
        Interrupt::detached()
    });

    let mut session = Session::new(config, inputs, output, effects, interrupt)?;
    Ok(session.run()?)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let code: u8 = match error.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = error.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        // A user abort still exits cleanly; the partial output is kept.
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("cadena: {error:#}");
            let code = error
                .downcast_ref::<EngineError>()
                .map(|e| e.exit_code())
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
