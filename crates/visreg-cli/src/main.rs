//! visreg CLI: visual regression checks from the command line
//!
//! ## Usage
//!
//! ```bash
//! visreg capture login_button shot.png            # Store a baseline
//! visreg compare login_button shot.png            # Exit 0 match, 1 mismatch, 2 error
//! visreg compare home home.png --mask 0,0,200,40  # Ignore a clock in the header
//! visreg compare home home.png --report out/      # Write baseline/current/diff PNGs
//! visreg hash shot.png                            # Print the perceptual hash
//! visreg list                                     # Stored baselines
//! ```

use clap::Parser;
use console::style;
use std::process::ExitCode;
use visreg_cli::{Cli, Outcome, Verbosity, EXIT_ERROR, EXIT_MISMATCH};

fn main() -> ExitCode {
    let cli = Cli::parse();
    visreg_cli::tracing::init(Verbosity::from_flags(cli.quiet, cli.verbose));

    match visreg_cli::run(cli) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Mismatch) => ExitCode::from(EXIT_MISMATCH),
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::from(EXIT_ERROR)
        }
    }
}
