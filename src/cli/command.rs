use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use dng_decrement::image_pipeline::TiffCompression;

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    about      = "Decrement DNG pixel values, repack them into the original container and verify the result",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up every raw file in a directory and write its decremented pixels as TIFF.
    Process(ProcessArgs),

    /// Put modified pixels back into the original container.
    Convert(ConvertArgs),

    /// Compare two pixel files, or summarize one.
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Directory to scan (not recursive).
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Raw file extension to pick up; repeat for several. Defaults to dng.
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Do not copy sources to <name>.<ext>.backup first.
    #[arg(long)]
    pub no_backup: bool,

    /// Compression of the written TIFF.
    #[arg(long, value_enum, default_value_t = CompressionArg::None)]
    pub compression: CompressionArg,

    /// Print per-step timings of each file.
    #[arg(long)]
    pub timings: bool,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// TIFF (or raw file) holding the modified pixels.
    #[arg(value_name = "MODIFIED")]
    pub modified: PathBuf,

    /// Container the pixels came from; never written to.
    #[arg(value_name = "ORIGINAL")]
    pub original: PathBuf,

    /// Output path. Defaults to <MODIFIED stem>_modified.<ORIGINAL extension>.
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Original file. Without any file, every raw file in the working directory is summarized.
    #[arg(value_name = "FILE_A")]
    pub first: Option<PathBuf>,

    /// Modified file; the report covers FILE_B - FILE_A.
    #[arg(value_name = "FILE_B", requires = "first")]
    pub second: Option<PathBuf>,
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
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::DeflateFast => TiffCompression::DeflateFast,
            CompressionArg::DeflateBalanced => TiffCompression::DeflateBalanced,
            CompressionArg::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}
