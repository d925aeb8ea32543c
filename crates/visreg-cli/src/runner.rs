//! Command execution

use crate::commands::{CaptureArgs, Cli, Commands, CompareArgs, HashArgs, RemoveArgs};
use crate::config::{CliConfig, Verbosity};
use crate::error::{CliError, CliResult};
use crate::output;
use std::path::Path;
use tracing::debug;
use visreg::{
    codec, CompareOptions, PerceptualHasher, RegionMask, ReportWriter, VisualComparisonEngine,
};

/// How a successfully executed command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Command succeeded (or the comparison matched)
    Success,
    /// Comparison ran but did not match
    Mismatch,
}

/// Build the CLI configuration from parsed arguments
#[must_use]
pub fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_config_file(cli.config.clone())
        .with_baseline_dir(cli.baseline_dir.clone())
}

/// Execute the parsed command line
pub fn run(cli: Cli) -> CliResult<Outcome> {
    let config = build_config(&cli);
    match cli.command {
        Commands::Capture(args) => run_capture(&config, &args),
        Commands::Compare(args) => run_compare(&config, &args),
        Commands::Hash(args) => run_hash(&config, &args),
        Commands::List => run_list(&config),
        Commands::Remove(args) => run_remove(&config, &args),
    }
}

fn engine(config: &CliConfig) -> CliResult<VisualComparisonEngine> {
    let visual = config.visual_config()?;
    debug!(baseline_dir = %visual.baseline_dir.display(), "using baseline directory");
    Ok(VisualComparisonEngine::new(visual)?)
}

fn load_image(path: &Path) -> CliResult<image::RgbaImage> {
    if !path.is_file() {
        return Err(CliError::invalid_argument(format!(
            "image file not found: {}",
            path.display()
        )));
    }
    Ok(codec::load(path)?)
}

fn run_capture(config: &CliConfig, args: &CaptureArgs) -> CliResult<Outcome> {
    let engine = engine(config)?;
    let image = load_image(&args.image)?;
    if !engine.capture_baseline(&args.name, &image)? {
        return Err(CliError::CaptureFailed {
            name: args.name.clone(),
        });
    }
    if !config.verbosity.is_quiet() {
        println!(
            "Captured baseline '{}' -> {}",
            args.name,
            engine.store().path_for(&args.name).display()
        );
    }
    Ok(Outcome::Success)
}

fn run_compare(config: &CliConfig, args: &CompareArgs) -> CliResult<Outcome> {
    let engine = engine(config)?;
    let image = load_image(&args.image)?;

    let mut options = CompareOptions::new().with_hash_prefilter(args.hash_prefilter);
    if !args.masks.is_empty() {
        options = options.with_mask(args.masks.iter().copied().collect::<RegionMask>());
    }
    if let Some(threshold) = args.threshold {
        options = options.with_threshold(threshold);
    }
    if let Some(max) = args.max_differences {
        options = options.with_max_differences(max);
    }

    let (result, report) = match &args.report {
        Some(dir) => {
            let (result, artifacts) =
                engine.compare_with_artifacts(&args.name, &image, &options)?;
            let paths = ReportWriter::new()
                .with_annotations(true)
                .write(&args.name, &result, &artifacts, dir)?;
            (result, Some(paths))
        }
        None => (engine.compare(&args.name, &image, &options)?, None),
    };

    if !config.verbosity.is_quiet() {
        let rendered = output::render_result(&result, args.format, config.color.should_color())?;
        println!("{}", rendered.trim_end());
        if let Some(paths) = &report {
            eprint!("{}", output::render_report_paths(paths));
        }
    }

    Ok(if result.matched {
        Outcome::Success
    } else {
        Outcome::Mismatch
    })
}

fn run_hash(config: &CliConfig, args: &HashArgs) -> CliResult<Outcome> {
    let size = match args.size {
        Some(size) => size,
        None => config.visual_config()?.hash_size,
    };
    let image = load_image(&args.image)?;
    let hash = PerceptualHasher::new(size)?.compute(&image)?;
    println!("{hash}  {}", args.image.display());
    Ok(Outcome::Success)
}

fn run_list(config: &CliConfig) -> CliResult<Outcome> {
    for name in engine(config)?.baseline_names()? {
        println!("{name}");
    }
    Ok(Outcome::Success)
}

fn run_remove(config: &CliConfig, args: &RemoveArgs) -> CliResult<Outcome> {
    let removed = engine(config)?.remove_baseline(&args.name)?;
    if !removed {
        return Err(visreg::VisregError::BaselineNotFound {
            name: args.name.clone(),
        }
        .into());
    }
    if !config.verbosity.is_quiet() {
        println!("Removed baseline '{}'", args.name);
    }
    Ok(Outcome::Success)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("visreg").chain(args.iter().copied())).unwrap()
    }

    fn write_png(dir: &TempDir, file: &str, color: [u8; 4]) -> String {
        let path = dir.path().join(file);
        RgbaImage::from_pixel(40, 20, Rgba(color)).save(&path).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_capture_then_compare() {
        let dir = TempDir::new().unwrap();
        let baselines = dir.path().join("b");
        let baselines = baselines.to_str().unwrap();
        let blue = write_png(&dir, "blue.png", [0, 0, 255, 255]);
        let red = write_png(&dir, "red.png", [255, 0, 0, 255]);

        let outcome = run(cli(&["-q", "--baseline-dir", baselines, "capture", "btn", &blue])).unwrap();
        assert_eq!(outcome, Outcome::Success);

        let same = run(cli(&["-q", "--baseline-dir", baselines, "compare", "btn", &blue])).unwrap();
        assert_eq!(same, Outcome::Success);

        let different = run(cli(&["-q", "--baseline-dir", baselines, "compare", "btn", &red])).unwrap();
        assert_eq!(different, Outcome::Mismatch);
    }

    #[test]
    fn test_compare_missing_baseline_is_error() {
        let dir = TempDir::new().unwrap();
        let baselines = dir.path().to_str().unwrap();
        let blue = write_png(&dir, "blue.png", [0, 0, 255, 255]);
        let err = run(cli(&["-q", "--baseline-dir", baselines, "compare", "nope", &blue])).unwrap_err();
        assert!(matches!(err, CliError::Visreg(ref e) if e.is_baseline_not_found()));
    }

    #[test]
    fn test_compare_writes_report() {
        let dir = TempDir::new().unwrap();
        let baselines = dir.path().join("b");
        let baselines = baselines.to_str().unwrap();
        let report = dir.path().join("report");
        let blue = write_png(&dir, "blue.png", [0, 0, 255, 255]);
        let red = write_png(&dir, "red.png", [255, 0, 0, 255]);

        run(cli(&["-q", "--baseline-dir", baselines, "capture", "btn", &blue])).unwrap();
        run(cli(&[
            "-q",
            "--baseline-dir",
            baselines,
            "compare",
            "btn",
            &red,
            "--report",
            report.to_str().unwrap(),
        ]))
        .unwrap();
        assert!(report.join("btn_diff.png").is_file());
        assert!(report.join("btn_result.json").is_file());
    }

    #[test]
    fn test_missing_image_is_invalid_argument() {
        let dir = TempDir::new().unwrap();
        let baselines = dir.path().to_str().unwrap();
        let err = run(cli(&["--baseline-dir", baselines, "capture", "x", "/nonexistent/x.png"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }

    #[test]
    fn test_remove_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let baselines = dir.path().to_str().unwrap();
        assert!(run(cli(&["--baseline-dir", baselines, "remove", "ghost"])).is_err());
    }

    #[test]
    fn test_build_config() {
        let config = build_config(&cli(&["-v", "--color", "never", "list"]));
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert!(!config.color.should_color());
    }
}
