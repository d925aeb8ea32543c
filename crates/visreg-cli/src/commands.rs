//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use visreg::MaskRegion;

/// visreg: capture screenshot baselines and detect visual regressions
#[derive(Parser, Debug)]
#[command(name = "visreg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Baseline directory (overrides the configuration file)
    #[arg(long, env = "VISREG_BASELINE_DIR", global = true)]
    pub baseline_dir: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store an image as the baseline for a name
    Capture(CaptureArgs),

    /// Compare an image against a stored baseline
    ///
    /// Exit status: 0 on match, 1 on mismatch, 2 on error (including a
    /// missing baseline).
    Compare(CompareArgs),

    /// Print the perceptual hash of an image
    Hash(HashArgs),

    /// List stored baselines
    List,

    /// Delete a stored baseline
    Remove(RemoveArgs),
}

/// Arguments for the capture command
#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// Baseline name
    pub name: String,

    /// Image file (PNG or JPEG)
    pub image: PathBuf,
}

/// Arguments for the compare command
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// Baseline name
    pub name: String,

    /// Image file (PNG or JPEG)
    pub image: PathBuf,

    /// Similarity threshold (0.0-1.0) for this comparison
    #[arg(short, long, env = "VISREG_THRESHOLD")]
    pub threshold: Option<f64>,

    /// Rectangle to exclude, as x,y,width,height (repeatable)
    #[arg(short, long = "mask", value_parser = parse_mask)]
    pub masks: Vec<MaskRegion>,

    /// Fail when more than this many difference regions are found
    #[arg(long)]
    pub max_differences: Option<usize>,

    /// Skip the pixel diff when perceptual hashes are identical
    #[arg(long)]
    pub hash_prefilter: bool,

    /// Write baseline/current/diff images and result JSON to this directory
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the hash command
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Image file (PNG or JPEG)
    pub image: PathBuf,

    /// Hash grid side length (size x size bits)
    #[arg(short, long)]
    pub size: Option<u32>,
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Baseline name
    pub name: String,
}

/// Result output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// ComparisonResult as JSON
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

fn parse_mask(value: &str) -> Result<MaskRegion, String> {
    value.parse().map_err(|e: visreg::VisregError| e.to_string())
}
