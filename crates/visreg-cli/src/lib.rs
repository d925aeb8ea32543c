//! visreg CLI Library
//!
//! Command-line front end for the visreg comparison engine: capture
//! baselines, compare screenshots and write report artifacts from a shell
//! or a CI job.

#![warn(missing_docs)]
#![allow(clippy::format_push_string)] // String building is clear and correct
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
mod runner;
pub mod tracing;

pub use commands::{
    CaptureArgs, Cli, ColorArg, Commands, CompareArgs, HashArgs, OutputFormat, RemoveArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult, EXIT_ERROR, EXIT_MISMATCH};
pub use output::{render_report_paths, render_result};
pub use runner::{build_config, run, Outcome};
