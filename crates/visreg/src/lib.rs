//! Visreg: Visual Regression Comparison Engine
//!
//! Captures reference screenshots ("baselines") under a name and later
//! compares fresh screenshots against them, reporting a similarity score
//! and the regions that changed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    VISREG Architecture                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Baseline   │    │ Region     │    │ Difference │            │
//! │   │ Store      │───►│ Mask       │───►│ Detector   │            │
//! │   │ (PNG dir)  │    │ (both)     │    │ (RMSE+CCL) │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │          ▲                                   │                   │
//! │          │         ┌────────────┐            ▼                   │
//! │   capture_baseline │ Perceptual │    ComparisonResult            │
//! │                    │ Hasher     │    (+ artifacts, report)       │
//! │                    └────────────┘                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use visreg::prelude::*;
//! use image::{Rgba, RgbaImage};
//!
//! # fn main() -> VisregResult<()> {
//! let engine = VisualComparisonEngine::new(VisualConfig::new().with_baseline_dir("__baselines__"))?;
//! let screenshot = RgbaImage::from_pixel(200, 60, Rgba([0, 0, 255, 255]));
//!
//! engine.capture_baseline("login_button", &screenshot)?;
//! let result = engine.compare("login_button", &screenshot, &CompareOptions::new())?;
//! assert!(result.matched);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod baseline;
mod cache;
pub mod codec;
mod config;
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
mod detector;
#[allow(clippy::missing_errors_doc)]
mod engine;
mod hash;
mod mask;
mod report;
mod result;

pub use baseline::{sanitize_name, BaselineStore};
pub use cache::{BaselineCache, DEFAULT_CACHE_CAPACITY};
pub use config::{
    VisualConfig, DEFAULT_HASH_SIZE, DEFAULT_NOISE_FLOOR, DEFAULT_THRESHOLD, MAX_HASH_SIZE,
};
pub use detector::{
    annotate_regions, AlignedPair, Detection, DifferenceDetector, DifferenceKind,
    DifferenceRegion, DIFF_HIGHLIGHT,
};
pub use engine::{CompareOptions, ComparisonArtifacts, ComparisonResult, VisualComparisonEngine};
pub use hash::{compute_hash, hamming_distance, PerceptualHash, PerceptualHasher};
pub use mask::{MaskRegion, RegionMask, DEFAULT_MASK_FILL};
pub use report::{ReportPaths, ReportWriter};
pub use result::{VisregError, VisregResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::detector::*;
    pub use super::engine::*;
    pub use super::hash::*;
    pub use super::mask::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::{BaselineStore, sanitize_name};
}
