//! Report artifacts for a single comparison.
//!
//! Writes the raw material a report layer needs: masked baseline, aligned
//! current image, highlighted diff and the result as JSON. No HTML.

use crate::baseline::sanitize_name;
use crate::codec::{self, IMAGE_EXTENSION};
use crate::detector::annotate_regions;
use crate::engine::{ComparisonArtifacts, ComparisonResult};
use crate::result::VisregResult;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files produced by [`ReportWriter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// `{name}_baseline.png`
    pub baseline: PathBuf,
    /// `{name}_current.png`
    pub current: PathBuf,
    /// `{name}_diff.png`
    pub diff: PathBuf,
    /// `{name}_result.json`
    pub result: PathBuf,
}

/// Writes comparison artifacts to a directory
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter {
    annotate: bool,
}

impl ReportWriter {
    /// Create a writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outline difference regions on the diff image
    #[must_use]
    pub const fn with_annotations(mut self, enabled: bool) -> Self {
        self.annotate = enabled;
        self
    }

    /// Write the artifacts for `name` into `out_dir`, creating it if needed.
    ///
    /// Existing files with the same names are overwritten.
    pub fn write(
        &self,
        name: &str,
        result: &ComparisonResult,
        artifacts: &ComparisonArtifacts,
        out_dir: impl AsRef<Path>,
    ) -> VisregResult<ReportPaths> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;
        let stem = sanitize_name(name);
        let file = |suffix: &str, ext: &str| out_dir.join(format!("{stem}_{suffix}.{ext}"));

        let paths = ReportPaths {
            baseline: file("baseline", IMAGE_EXTENSION),
            current: file("current", IMAGE_EXTENSION),
            diff: file("diff", IMAGE_EXTENSION),
            result: file("result", "json"),
        };

        write_png(&artifacts.baseline, &paths.baseline)?;
        write_png(&artifacts.current, &paths.current)?;
        if self.annotate {
            write_png(&annotate_regions(&artifacts.diff, &result.differences), &paths.diff)?;
        } else {
            write_png(&artifacts.diff, &paths.diff)?;
        }
        fs::write(&paths.result, serde_json::to_vec_pretty(result)?)?;

        info!(
            baseline = name,
            dir = %out_dir.display(),
            matched = result.matched,
            "wrote comparison report"
        );
        Ok(paths)
    }
}

fn write_png(image: &RgbaImage, path: &Path) -> VisregResult<()> {
    fs::write(path, codec::encode_png(image)?)?;
    Ok(())
}
