//! Pixel comparison: similarity score and difference regions.
//!
//! Both images are brought to the baseline's size, optionally masked, and
//! compared channel by channel on alpha-premultiplied RGB.
//!
//! - **similarity** is `1 - RMSE / 255` over every channel of every pixel,
//!   so 1.0 means pixel-identical and more differing pixels never raise it.
//! - **regions** are the 8-connected components of pixels whose largest
//!   channel delta exceeds the noise floor, reported as bounding boxes.
//!
//! A size mismatch is never an error: the current image is resampled to the
//! baseline's size, a full-canvas region of magnitude 1.0 is added and the
//! similarity is 0.0.

use crate::codec;
use crate::config::{VisualConfig, DEFAULT_NOISE_FLOOR};
use crate::mask::{MaskRegion, RegionMask};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Highest possible sum of three channel deltas
const MAX_PIXEL_DELTA: f64 = 3.0 * 255.0;

/// Colour of differing pixels in a rendered diff
pub const DIFF_HIGHLIGHT: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// How a region changed relative to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    /// Current content is brighter than the baseline (something appeared)
    Added,
    /// Current content is darker than the baseline (something went away)
    Removed,
    /// Mean brightness unchanged, content differs
    Changed,
}

impl DifferenceKind {
    /// Outline colour used when annotating regions
    #[must_use]
    pub const fn color(self) -> Rgba<u8> {
        match self {
            Self::Added => Rgba([0, 200, 0, 255]),
            Self::Removed => Rgba([255, 0, 0, 255]),
            Self::Changed => Rgba([0, 0, 255, 255]),
        }
    }
}

/// One connected area where the images diverge beyond the noise floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceRegion {
    /// X coordinate of top-left corner
    pub x: u32,
    /// Y coordinate of top-left corner
    pub y: u32,
    /// Bounding box width
    pub width: u32,
    /// Bounding box height
    pub height: u32,
    /// Mean difference intensity inside the bounding box, 0.0-1.0
    pub magnitude: f64,
    /// Direction of the change
    pub kind: DifferenceKind,
}

impl DifferenceRegion {
    /// Top-left corner
    #[must_use]
    pub const fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    /// Bounding box size
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bounding box as a rectangle
    #[must_use]
    pub const fn bounds(&self) -> MaskRegion {
        MaskRegion::new(self.x, self.y, self.width, self.height)
    }

    /// Whether the bounding box shares a pixel with `rect`
    #[must_use]
    pub const fn overlaps(&self, rect: &MaskRegion) -> bool {
        self.bounds().intersects(rect)
    }

    /// Whether the bounding box fully covers `rect`
    #[must_use]
    pub const fn covers(&self, rect: &MaskRegion) -> bool {
        self.x <= rect.x
            && self.y <= rect.y
            && self.bounds().right() >= rect.right()
            && self.bounds().bottom() >= rect.bottom()
    }

    fn whole_canvas(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            magnitude: 1.0,
            kind: DifferenceKind::Changed,
        }
    }
}

/// Outcome of one detection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Normalised similarity, 1.0 = identical
    pub similarity: f64,
    /// Regions, by descending magnitude then row-major position
    pub regions: Vec<DifferenceRegion>,
    /// Number of pixels above the noise floor
    pub differing_pixels: u64,
    /// The inputs had different dimensions
    pub size_mismatch: bool,
}

impl Detection {
    fn vacuous() -> Self {
        Self {
            similarity: 1.0,
            regions: Vec::new(),
            differing_pixels: 0,
            size_mismatch: false,
        }
    }

    /// No pixel differs beyond the noise floor and sizes agree
    #[must_use]
    pub fn is_identical(&self) -> bool {
        !self.size_mismatch && self.differing_pixels == 0 && self.regions.is_empty()
    }
}

/// Baseline and current image brought to a common canvas, masks applied.
///
/// Borrowed when no resampling or masking was needed.
#[derive(Debug, Clone)]
pub struct AlignedPair<'a> {
    /// Baseline pixels
    pub baseline: Cow<'a, RgbaImage>,
    /// Current pixels, resampled to the baseline's size when they differed
    pub current: Cow<'a, RgbaImage>,
    /// Original dimensions disagreed
    pub size_mismatch: bool,
    /// Size of the canvas reported for a mismatch
    pub canvas: (u32, u32),
}

impl<'a> AlignedPair<'a> {
    /// Align `current` to `baseline` and apply `mask` to both.
    #[must_use]
    pub fn new(baseline: &'a RgbaImage, current: &'a RgbaImage, mask: Option<&RegionMask>) -> Self {
        let size_mismatch = baseline.dimensions() != current.dimensions();
        let both_sized = !codec::is_empty(baseline) && !codec::is_empty(current);

        let canvas = if codec::is_empty(baseline) {
            current.dimensions()
        } else {
            baseline.dimensions()
        };

        let current = if size_mismatch && both_sized {
            let (w, h) = baseline.dimensions();
            Cow::Owned(codec::resize_exact(current, w, h))
        } else {
            Cow::Borrowed(current)
        };
        let mut pair = Self {
            baseline: Cow::Borrowed(baseline),
            current,
            size_mismatch,
            canvas,
        };

        if let Some(mask) = mask.filter(|m| !m.is_empty()) {
            pair.baseline = Cow::Owned(mask.apply(&pair.baseline));
            pair.current = Cow::Owned(mask.apply(&pair.current));
        }
        pair
    }

    /// Neither side has any pixels
    #[must_use]
    pub fn both_empty(&self) -> bool {
        codec::is_empty(&self.baseline) && codec::is_empty(&self.current)
    }

    /// Both sides have the same, non-zero size
    fn comparable(&self) -> bool {
        self.baseline.dimensions() == self.current.dimensions() && !codec::is_empty(&self.baseline)
    }
}

/// Per-pixel channel deltas of two equally sized images
struct DeltaMap {
    width: usize,
    height: usize,
    /// Largest channel delta per pixel
    max: Vec<u8>,
    /// Sum of the three channel deltas per pixel
    sum: Vec<u16>,
    squared_total: u64,
}

impl DeltaMap {
    fn compute(baseline: &RgbaImage, current: &RgbaImage) -> Self {
        let len = (baseline.width() as usize) * (baseline.height() as usize);
        let mut max = Vec::with_capacity(len);
        let mut sum = Vec::with_capacity(len);
        let mut squared_total = 0u64;

        for (b, c) in baseline
            .as_raw()
            .chunks_exact(4)
            .zip(current.as_raw().chunks_exact(4))
        {
            let (b, c) = (premultiply(b), premultiply(c));
            let mut largest = 0u8;
            let mut total = 0u16;
            for (bc, cc) in b.iter().zip(&c) {
                let d = bc.abs_diff(*cc);
                largest = largest.max(d);
                total += u16::from(d);
                squared_total += u64::from(d) * u64::from(d);
            }
            max.push(largest);
            sum.push(total);
        }

        Self {
            width: baseline.width() as usize,
            height: baseline.height() as usize,
            max,
            sum,
            squared_total,
        }
    }

    fn similarity(&self) -> f64 {
        let channels = self.max.len() as f64 * 3.0;
        if channels == 0.0 {
            return 1.0;
        }
        let rmse = (self.squared_total as f64 / channels).sqrt();
        (1.0 - rmse / 255.0).clamp(0.0, 1.0)
    }
}

/// RGB scaled by alpha; opaque pixels pass through unchanged.
fn premultiply(px: &[u8]) -> [u8; 3] {
    let a = u32::from(px[3]);
    if a == 255 {
        return [px[0], px[1], px[2]];
    }
    let scale = |c: u8| ((u32::from(c) * a + 127) / 255) as u8;
    [scale(px[0]), scale(px[1]), scale(px[2])]
}

fn brightness(px: &[u8]) -> u64 {
    premultiply(px).iter().map(|&c| u64::from(c)).sum()
}

/// Compares two images and locates where they differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferenceDetector {
    noise_floor: u8,
    min_region_area: u32,
}

impl Default for DifferenceDetector {
    fn default() -> Self {
        Self {
            noise_floor: DEFAULT_NOISE_FLOOR,
            min_region_area: 1,
        }
    }
}

impl DifferenceDetector {
    /// Create a detector with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector matching an engine configuration
    #[must_use]
    pub fn from_config(config: &VisualConfig) -> Self {
        Self {
            noise_floor: config.noise_floor,
            min_region_area: config.min_region_area,
        }
    }

    /// Set the per-pixel noise floor
    #[must_use]
    pub const fn with_noise_floor(mut self, floor: u8) -> Self {
        self.noise_floor = floor;
        self
    }

    /// Set the minimum component size reported as a region
    #[must_use]
    pub const fn with_min_region_area(mut self, area: u32) -> Self {
        self.min_region_area = area;
        self
    }

    /// Noise floor in use
    #[must_use]
    pub const fn noise_floor(&self) -> u8 {
        self.noise_floor
    }

    /// Compare two images without masking.
    #[must_use]
    pub fn detect(&self, baseline: &RgbaImage, current: &RgbaImage) -> Detection {
        self.detect_aligned(&AlignedPair::new(baseline, current, None))
    }

    /// Compare two images with `mask` applied to both.
    #[must_use]
    pub fn detect_masked(
        &self,
        baseline: &RgbaImage,
        current: &RgbaImage,
        mask: Option<&RegionMask>,
    ) -> Detection {
        self.detect_aligned(&AlignedPair::new(baseline, current, mask))
    }

    /// Compare an already aligned pair.
    #[must_use]
    pub fn detect_aligned(&self, pair: &AlignedPair<'_>) -> Detection {
        self.analyze(pair).0
    }

    /// Compare an aligned pair and render the highlighted diff image.
    #[must_use]
    pub fn detect_with_diff(&self, pair: &AlignedPair<'_>) -> (Detection, RgbaImage) {
        let (detection, map) = self.analyze(pair);
        let diff = match map {
            Some(map) => self.render(&map, &pair.current),
            None => {
                let (w, h) = pair.canvas;
                RgbaImage::from_pixel(w, h, DIFF_HIGHLIGHT)
            }
        };
        (detection, diff)
    }

    /// Differing pixels in red over a dimmed copy of `current`.
    #[must_use]
    pub fn highlight_differences(&self, baseline: &RgbaImage, current: &RgbaImage) -> RgbaImage {
        let (_, diff) = self.detect_with_diff(&AlignedPair::new(baseline, current, None));
        diff
    }

    fn analyze(&self, pair: &AlignedPair<'_>) -> (Detection, Option<DeltaMap>) {
        if pair.both_empty() {
            return (Detection::vacuous(), None);
        }
        if !pair.comparable() {
            // One side is empty: nothing to resample, the whole canvas differs
            let (w, h) = pair.canvas;
            let detection = Detection {
                similarity: 0.0,
                regions: vec![DifferenceRegion::whole_canvas(w, h)],
                differing_pixels: u64::from(w) * u64::from(h),
                size_mismatch: true,
            };
            return (detection, None);
        }

        let map = DeltaMap::compute(&pair.baseline, &pair.current);
        let differing_pixels = map.max.iter().filter(|&&d| d > self.noise_floor).count() as u64;
        let mut regions = self.extract_regions(&map, &pair.baseline, &pair.current);
        let mut similarity = map.similarity();

        if pair.size_mismatch {
            let (w, h) = pair.canvas;
            regions.push(DifferenceRegion::whole_canvas(w, h));
            similarity = 0.0;
        }
        sort_regions(&mut regions);

        let detection = Detection {
            similarity,
            regions,
            differing_pixels,
            size_mismatch: pair.size_mismatch,
        };
        (detection, Some(map))
    }

    /// Label 8-connected components of above-floor pixels.
    fn extract_regions(
        &self,
        map: &DeltaMap,
        baseline: &RgbaImage,
        current: &RgbaImage,
    ) -> Vec<DifferenceRegion> {
        let (w, h) = (map.width, map.height);
        let floor = self.noise_floor;
        let mut visited = vec![false; w * h];
        let mut stack = Vec::new();
        let mut regions = Vec::new();

        for start in 0..w * h {
            if visited[start] || map.max[start] <= floor {
                continue;
            }
            visited[start] = true;
            stack.push(start);

            let (mut min_x, mut min_y) = (start % w, start / w);
            let (mut max_x, mut max_y) = (min_x, min_y);
            let mut count = 0u64;

            while let Some(idx) = stack.pop() {
                count += 1;
                let (x, y) = (idx % w, idx / w);
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);

                for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        let n = ny * w + nx;
                        if !visited[n] && map.max[n] > floor {
                            visited[n] = true;
                            stack.push(n);
                        }
                    }
                }
            }

            if count < u64::from(self.min_region_area) {
                continue;
            }
            let bounds = MaskRegion::new(
                min_x as u32,
                min_y as u32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            );
            regions.push(describe_region(map, baseline, current, bounds));
        }
        regions
    }

    fn render(&self, map: &DeltaMap, current: &RgbaImage) -> RgbaImage {
        let mut out = RgbaImage::new(current.width(), current.height());
        for ((dst, src), &delta) in out
            .pixels_mut()
            .zip(current.pixels())
            .zip(map.max.iter())
        {
            *dst = if delta > self.noise_floor {
                DIFF_HIGHLIGHT
            } else {
                dim(*src)
            };
        }
        out
    }
}

/// Diff image background with nothing highlighted
pub(crate) fn dimmed(image: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::new(image.width(), image.height());
    for (dst, src) in out.pixels_mut().zip(image.pixels()) {
        *dst = dim(*src);
    }
    out
}

fn dim(px: Rgba<u8>) -> Rgba<u8> {
    let Rgba([r, g, b, _]) = px;
    Rgba([r / 2, g / 2, b / 2, 255])
}

fn describe_region(
    map: &DeltaMap,
    baseline: &RgbaImage,
    current: &RgbaImage,
    bounds: MaskRegion,
) -> DifferenceRegion {
    let mut delta_total = 0u64;
    let mut baseline_light = 0u64;
    let mut current_light = 0u64;

    for y in bounds.y..bounds.bottom() {
        for x in bounds.x..bounds.right() {
            let idx = y as usize * map.width + x as usize;
            delta_total += u64::from(map.sum[idx]);
            baseline_light += brightness(&baseline.get_pixel(x, y).0);
            current_light += brightness(&current.get_pixel(x, y).0);
        }
    }

    let kind = match current_light.cmp(&baseline_light) {
        std::cmp::Ordering::Greater => DifferenceKind::Added,
        std::cmp::Ordering::Less => DifferenceKind::Removed,
        std::cmp::Ordering::Equal => DifferenceKind::Changed,
    };

    DifferenceRegion {
        x: bounds.x,
        y: bounds.y,
        width: bounds.width,
        height: bounds.height,
        magnitude: delta_total as f64 / (bounds.area() as f64 * MAX_PIXEL_DELTA),
        kind,
    }
}

/// Descending magnitude, then row-major top-left position.
fn sort_regions(regions: &mut [DifferenceRegion]) {
    regions.sort_by(|a, b| {
        b.magnitude
            .total_cmp(&a.magnitude)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });
}

/// Draw a one-pixel outline around each region in its kind's colour.
#[must_use]
pub fn annotate_regions(image: &RgbaImage, regions: &[DifferenceRegion]) -> RgbaImage {
    let mut out = image.clone();
    let (w, h) = out.dimensions();
    for region in regions {
        let Some(r) = region.bounds().clip(w, h) else {
            continue;
        };
        let color = region.kind.color();
        let (right, bottom) = (r.right() - 1, r.bottom() - 1);
        for x in r.x..=right {
            out.put_pixel(x, r.y, color);
            out.put_pixel(x, bottom, color);
        }
        for y in r.y..=bottom {
            out.put_pixel(r.x, y, color);
            out.put_pixel(right, y, color);
        }
    }
    out
}
