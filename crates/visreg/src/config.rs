//! Engine configuration.
//!
//! Values are supplied at engine construction time; nothing is read from
//! the environment here. Front ends layer their own overrides on top.

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::result::{validate_threshold, VisregError, VisregResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default similarity threshold for a match
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Default per-pixel noise floor (maximum channel delta that is ignored)
pub const DEFAULT_NOISE_FLOOR: u8 = 30;

/// Default perceptual hash size (8x8 = 64 bits)
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Largest accepted perceptual hash size (64x64 = 4096 bits)
pub const MAX_HASH_SIZE: u32 = 64;

/// Configuration for the visual comparison engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Directory holding one PNG per baseline
    pub baseline_dir: PathBuf,
    /// Similarity (0.0-1.0) at or above which a comparison matches
    pub threshold: f64,
    /// Per-pixel channel delta (0-255) at or below which a pixel is not a difference
    pub noise_floor: u8,
    /// Connected components smaller than this many pixels are not reported
    pub min_region_area: u32,
    /// Side length of the perceptual hash grid
    pub hash_size: u32,
    /// Keep decoded baselines in memory between comparisons
    pub cache_baselines: bool,
    /// Most decoded baselines held by the cache; least recently used go first
    pub cache_capacity: usize,
    /// RGBA colour painted over masked rectangles
    pub mask_fill: [u8; 4],
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("__baselines__"),
            threshold: DEFAULT_THRESHOLD,
            noise_floor: DEFAULT_NOISE_FLOOR,
            min_region_area: 1,
            hash_size: DEFAULT_HASH_SIZE,
            cache_baselines: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            mask_fill: [128, 128, 128, 255],
        }
    }
}

impl VisualConfig {
    /// Create a default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the baseline directory
    #[must_use]
    pub fn with_baseline_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.baseline_dir = dir.into();
        self
    }

    /// Set the threshold
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the noise floor
    #[must_use]
    pub const fn with_noise_floor(mut self, floor: u8) -> Self {
        self.noise_floor = floor;
        self
    }

    /// Set the minimum reported region area
    #[must_use]
    pub const fn with_min_region_area(mut self, area: u32) -> Self {
        self.min_region_area = area;
        self
    }

    /// Set the perceptual hash size
    #[must_use]
    pub const fn with_hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    /// Enable or disable the baseline cache
    #[must_use]
    pub const fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_baselines = enabled;
        self
    }

    /// Bound the baseline cache to `capacity` entries
    #[must_use]
    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the mask fill colour
    #[must_use]
    pub const fn with_mask_fill(mut self, rgba: [u8; 4]) -> Self {
        self.mask_fill = rgba;
        self
    }

    /// Check every field is usable.
    pub fn validate(&self) -> VisregResult<()> {
        validate_threshold(self.threshold)
            .map_err(|_| VisregError::config(format!("threshold {} outside [0, 1]", self.threshold)))?;
        if self.hash_size == 0 || self.hash_size > MAX_HASH_SIZE {
            return Err(VisregError::config(format!(
                "hash_size {} outside [1, {MAX_HASH_SIZE}]",
                self.hash_size
            )));
        }
        if self.cache_baselines && self.cache_capacity == 0 {
            return Err(VisregError::config("cache_capacity must be at least 1 when caching"));
        }
        if self.baseline_dir.as_os_str().is_empty() {
            return Err(VisregError::config("baseline_dir must not be empty"));
        }
        Ok(())
    }

    /// Parse and validate a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> VisregResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> VisregResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            VisregError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> VisregResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
