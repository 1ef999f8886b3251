use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use sbc::structs::stream_info::{AllocationMethod, ChannelMode};

pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (sbc ",
    env!("SBC_VERSION"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = VERSION,
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Tools for encoding, decoding and inspecting SBC audio bitstreams",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat muted frames as fatal errors.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Encode a 16-bit PCM WAV file into an SBC stream.
    Encode(EncodeArgs),

    /// Decode the specified SBC stream into PCM audio.
    Decode(DecodeArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Input WAV file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output SBC stream.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Number of sub-bands.
    #[arg(long, default_value_t = 8, value_parser = subband_count)]
    pub subbands: u8,

    /// Number of blocks per frame.
    #[arg(long, default_value_t = 16, value_parser = block_count)]
    pub blocks: u8,

    /// Channel mode [default: joint for stereo input, mono for mono input]
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Bit allocation method.
    #[arg(long, value_enum, default_value_t = Allocation::Loudness)]
    pub allocation: Allocation,

    /// Bitpool [default: 53 for stereo and joint, 31 for mono and dual]
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=250))]
    pub bitpool: Option<u8>,

    /// Use fixed-point arithmetic.
    #[arg(long)]
    pub fixed: bool,
}

fn subband_count(value: &str) -> Result<u8, String> {
    match value.parse::<u8>() {
        Ok(n @ (4 | 8)) => Ok(n),
        _ => Err("must be 4 or 8".to_string()),
    }
}

fn block_count(value: &str) -> Result<u8, String> {
    match value.parse::<u8>() {
        Ok(n @ (4 | 8 | 12 | 16)) => Ok(n),
        _ => Err("must be 4, 8, 12 or 16".to_string()),
    }
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input SBC bitstream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path for the decoded audio.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Audio format for output.
    #[arg(long, value_enum, default_value_t = AudioFormat::Wav)]
    pub format: AudioFormat,

    /// Use fixed-point arithmetic.
    #[arg(long)]
    pub fixed: bool,

    /// Disable progress estimation
    #[arg(long)]
    pub no_estimate_progress: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input SBC bitstream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Print the summary as YAML.
    #[arg(long)]
    pub yaml: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text with timestamps.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AudioFormat {
    /// RIFF/WAVE, 16-bit.
    Wav,
    /// Raw PCM format (16-bit little-endian, interleaved).
    Pcm,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum Mode {
    Mono,
    Dual,
    Stereo,
    Joint,
}

impl From<Mode> for ChannelMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mono => ChannelMode::Mono,
            Mode::Dual => ChannelMode::DualChannel,
            Mode::Stereo => ChannelMode::Stereo,
            Mode::Joint => ChannelMode::JointStereo,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum Allocation {
    Loudness,
    Snr,
}

impl From<Allocation> for AllocationMethod {
    fn from(allocation: Allocation) -> Self {
        match allocation {
            Allocation::Loudness => AllocationMethod::Loudness,
            Allocation::Snr => AllocationMethod::Snr,
        }
    }
}
