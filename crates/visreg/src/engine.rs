//! Comparison orchestration.
//!
//! [`VisualComparisonEngine`] ties the baseline store, masking, hashing and
//! the pixel detector together behind `capture_baseline` and `compare`.
//! Each comparison is a pure function of the stored baseline, the input
//! image and the options; the only shared state is an optional, bounded
//! read-through cache of decoded baselines.

use crate::baseline::{sanitize_name, BaselineStore};
use crate::cache::BaselineCache;
use crate::codec;
use crate::config::VisualConfig;
use crate::detector::{self, AlignedPair, DifferenceDetector, DifferenceRegion};
use crate::hash::PerceptualHasher;
use crate::mask::RegionMask;
use crate::result::{validate_threshold, VisregResult};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Per-call comparison options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareOptions {
    /// Rectangles excluded on both sides
    pub mask: Option<RegionMask>,
    /// Overrides the engine threshold for this call
    pub threshold: Option<f64>,
    /// Also require at most this many difference regions
    pub max_differences: Option<usize>,
    /// Short-circuit on identical perceptual hashes
    pub hash_prefilter: bool,
}

impl CompareOptions {
    /// Options with everything at engine defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude `mask` from the comparison
    #[must_use]
    pub fn with_mask(mut self, mask: RegionMask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Override the similarity threshold
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Cap the number of difference regions a match may have
    #[must_use]
    pub const fn with_max_differences(mut self, max: usize) -> Self {
        self.max_differences = Some(max);
        self
    }

    /// Enable the perceptual-hash shortcut
    #[must_use]
    pub const fn with_hash_prefilter(mut self, enabled: bool) -> Self {
        self.hash_prefilter = enabled;
        self
    }
}

/// Result of comparing an image against a baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Name the comparison was requested under
    pub baseline_name: String,
    /// Similarity reached the threshold (and the region cap, if any)
    pub matched: bool,
    /// Normalised similarity, 1.0 = identical after masking
    pub similarity: f64,
    /// Difference regions, strongest first
    pub differences: Vec<DifferenceRegion>,
    /// Baseline dimensions
    pub baseline_size: (u32, u32),
    /// Current image dimensions before alignment
    pub current_size: (u32, u32),
    /// Perceptual hash distance, when the prefilter ran
    pub hash_distance: Option<u32>,
    /// Threshold the decision was made against
    pub threshold: f64,
}

impl ComparisonResult {
    /// Whether the inputs had different dimensions
    #[must_use]
    pub fn is_size_mismatch(&self) -> bool {
        self.baseline_size != self.current_size
    }

    /// Number of difference regions
    #[must_use]
    pub fn difference_count(&self) -> usize {
        self.differences.len()
    }

    /// One-line human readable outcome
    #[must_use]
    pub fn summary(&self) -> String {
        let verdict = if self.matched { "MATCH" } else { "MISMATCH" };
        let mut line = format!(
            "{}: {verdict} similarity {:.4} (threshold {:.4}), {} difference region(s)",
            self.baseline_name,
            self.similarity,
            self.threshold,
            self.differences.len()
        );
        if self.is_size_mismatch() {
            let (bw, bh) = self.baseline_size;
            let (cw, ch) = self.current_size;
            line.push_str(&format!(", size {cw}x{ch} vs baseline {bw}x{bh}"));
        }
        line
    }
}

/// Pixel data behind a comparison, for report rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonArtifacts {
    /// Baseline after masking
    pub baseline: RgbaImage,
    /// Current image after alignment and masking
    pub current: RgbaImage,
    /// Differing pixels in red over the dimmed current image
    pub diff: RgbaImage,
}

/// Compares images against named baselines
#[derive(Debug)]
pub struct VisualComparisonEngine {
    config: VisualConfig,
    store: BaselineStore,
    detector: DifferenceDetector,
    hasher: PerceptualHasher,
    cache: Mutex<BaselineCache>,
}

impl VisualComparisonEngine {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VisregError::Config`] if the configuration is invalid.
    pub fn new(config: VisualConfig) -> VisregResult<Self> {
        config.validate()?;
        Ok(Self {
            store: BaselineStore::new(config.baseline_dir.clone()),
            detector: DifferenceDetector::from_config(&config),
            hasher: PerceptualHasher::new(config.hash_size)?,
            cache: Mutex::new(BaselineCache::new(config.cache_capacity)),
            config,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &VisualConfig {
        &self.config
    }

    /// Underlying baseline store
    #[must_use]
    pub const fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Default threshold for comparisons
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Change the default threshold.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VisregError::InvalidArgument`] outside `[0, 1]`.
    pub fn set_threshold(&mut self, threshold: f64) -> VisregResult<()> {
        self.config.threshold = validate_threshold(threshold)?;
        Ok(())
    }

    /// Store `image` as the baseline for `name` and drop any cached copy.
    ///
    /// The cache lock is held across the write, so once this returns no
    /// reader can observe the previous baseline.
    pub fn capture_baseline(&self, name: &str, image: &RgbaImage) -> VisregResult<bool> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = self.store.capture(name, image)?;
        cache.remove(&sanitize_name(name));
        Ok(stored)
    }

    /// Delete the baseline for `name`. Returns whether one existed.
    pub fn remove_baseline(&self, name: &str) -> VisregResult<bool> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.remove(&sanitize_name(name));
        self.store.remove(name)
    }

    /// Stored baseline names
    pub fn baseline_names(&self) -> VisregResult<Vec<String>> {
        self.store.names()
    }

    /// Drop every cached baseline
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of decoded baselines currently held in memory
    pub fn cached_baselines(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Decoded baseline for `name`, through the cache when enabled. The
    /// cache keeps at most `cache_capacity` baselines and evicts the least
    /// recently used one first.
    ///
    /// # Errors
    ///
    /// [`crate::VisregError::BaselineNotFound`] or
    /// [`crate::VisregError::Decode`] from the store.
    pub fn baseline(&self, name: &str) -> VisregResult<Arc<RgbaImage>> {
        if !self.config.cache_baselines {
            return Ok(Arc::new(self.store.read(name)?));
        }

        let key = sanitize_name(name);
        // Misses load under the lock so a concurrent capture cannot be undone
        // by reinstalling the file read before it.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(image) = cache.get(&key) {
            debug!(baseline = name, "baseline cache hit");
            return Ok(image);
        }
        debug!(baseline = name, "baseline cache miss");
        let image = Arc::new(self.store.read(name)?);
        cache.insert(key, Arc::clone(&image));
        Ok(image)
    }

    /// Compare `current` against the baseline stored under `name`.
    ///
    /// # Errors
    ///
    /// - [`crate::VisregError::BaselineNotFound`] if nothing was captured
    /// - [`crate::VisregError::Decode`] if the baseline file is corrupt
    /// - [`crate::VisregError::InvalidArgument`] for a threshold override
    ///   outside `[0, 1]`
    ///
    /// A size mismatch is not an error; it is reported as a maximal
    /// difference.
    pub fn compare(
        &self,
        name: &str,
        current: &RgbaImage,
        options: &CompareOptions,
    ) -> VisregResult<ComparisonResult> {
        self.run(name, current, options, false).map(|(result, _)| result)
    }

    /// Like [`compare`](Self::compare), also returning the aligned, masked
    /// inputs and the highlighted diff image.
    pub fn compare_with_artifacts(
        &self,
        name: &str,
        current: &RgbaImage,
        options: &CompareOptions,
    ) -> VisregResult<(ComparisonResult, ComparisonArtifacts)> {
        let (result, artifacts) = self.run(name, current, options, true)?;
        let artifacts = artifacts.unwrap_or_else(|| ComparisonArtifacts {
            baseline: RgbaImage::new(0, 0),
            current: RgbaImage::new(0, 0),
            diff: RgbaImage::new(0, 0),
        });
        Ok((result, artifacts))
    }

    /// Whether the perceptual hashes of baseline and `current` are identical.
    pub fn verify_hash(&self, name: &str, current: &RgbaImage) -> VisregResult<bool> {
        let baseline = self.baseline(name)?;
        let distance = self
            .hasher
            .compute(&baseline)?
            .hamming_distance(&self.hasher.compute(current)?)?;
        debug!(baseline = name, distance, "hash verification");
        Ok(distance == 0)
    }

    /// `1 - distance / bits` between the baseline and `current` hashes.
    pub fn hash_similarity(&self, name: &str, current: &RgbaImage) -> VisregResult<f64> {
        let baseline = self.baseline(name)?;
        self.hasher
            .compute(&baseline)?
            .similarity(&self.hasher.compute(current)?)
    }

    fn run(
        &self,
        name: &str,
        current: &RgbaImage,
        options: &CompareOptions,
        with_artifacts: bool,
    ) -> VisregResult<(ComparisonResult, Option<ComparisonArtifacts>)> {
        let threshold = match options.threshold {
            Some(t) => validate_threshold(t)?,
            None => self.config.threshold,
        };
        let baseline = self.baseline(name)?;
        let mask = options.mask.as_ref().map(|m| {
            if m.explicit_fill().is_some() {
                m.clone()
            } else {
                m.clone().with_fill(self.config.mask_fill)
            }
        });
        let pair = AlignedPair::new(&baseline, current, mask.as_ref());

        let hash_distance = if options.hash_prefilter
            && !pair.size_mismatch
            && !codec::is_empty(&pair.baseline)
        {
            let a = self.hasher.compute(&pair.baseline)?;
            let b = self.hasher.compute(&pair.current)?;
            Some(a.hamming_distance(&b)?)
        } else {
            None
        };

        let (similarity, differences, diff) = if hash_distance == Some(0) {
            debug!(baseline = name, "identical hashes, skipping pixel diff");
            let diff = with_artifacts.then(|| detector::dimmed(&pair.current));
            (1.0, Vec::new(), diff)
        } else if with_artifacts {
            let (detection, diff) = self.detector.detect_with_diff(&pair);
            (detection.similarity, detection.regions, Some(diff))
        } else {
            let detection = self.detector.detect_aligned(&pair);
            (detection.similarity, detection.regions, None)
        };

        let within_cap = options
            .max_differences
            .map_or(true, |max| differences.len() <= max);
        let matched = similarity >= threshold && within_cap;

        debug!(
            baseline = name,
            similarity,
            threshold,
            regions = differences.len(),
            matched,
            "compared against baseline"
        );

        let result = ComparisonResult {
            baseline_name: name.to_string(),
            matched,
            similarity,
            differences,
            baseline_size: baseline.dimensions(),
            current_size: current.dimensions(),
            hash_distance,
            threshold,
        };
        let artifacts = diff.map(|diff| ComparisonArtifacts {
            baseline: pair.baseline.into_owned(),
            current: pair.current.into_owned(),
            diff,
        });
        Ok((result, artifacts))
    }
}
