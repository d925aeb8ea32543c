//! Rectangular exclusion regions for dynamic content (clocks, counters).
//!
//! Masks are attached per comparison, never stored with a baseline.
//! Rectangles reaching past the image edge are clipped, not rejected.

use crate::result::VisregError;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Axis-aligned rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaskRegion {
    /// X coordinate of top-left corner
    pub x: u32,
    /// Y coordinate of top-left corner
    pub y: u32,
    /// Width of mask region
    pub width: u32,
    /// Height of mask region
    pub height: u32,
}

impl MaskRegion {
    /// Create a new mask region
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge, saturating at `u32::MAX`
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Check if a point is within this mask region
    #[must_use]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Number of pixels covered
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the two rectangles share at least one pixel
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The part of this rectangle inside a `width x height` canvas, or
    /// `None` if nothing is left.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Self::new(self.x, self.y, right - self.x, bottom - self.y))
    }
}

impl FromStr for MaskRegion {
    type Err = VisregError;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(VisregError::invalid_argument(format!(
                "mask must be x,y,width,height, got '{s}'"
            )));
        };
        let parse = |v: &str| {
            v.parse::<u32>().map_err(|_| {
                VisregError::invalid_argument(format!("mask component '{v}' is not a number"))
            })
        };
        Ok(Self::new(parse(*x)?, parse(*y)?, parse(*w)?, parse(*h)?))
    }
}

/// Default neutral fill for masked pixels
pub const DEFAULT_MASK_FILL: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// Set of rectangles excluded from comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMask {
    regions: Vec<MaskRegion>,
    /// Unset means "whatever the consumer defaults to"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fill: Option<[u8; 4]>,
}

impl RegionMask {
    /// Create an empty mask
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fill colour painted over masked pixels
    #[must_use]
    pub const fn with_fill(mut self, rgba: [u8; 4]) -> Self {
        self.fill = Some(rgba);
        self
    }

    /// Add a rectangle (builder form)
    #[must_use]
    pub fn with_region(mut self, region: MaskRegion) -> Self {
        self.regions.push(region);
        self
    }

    /// Append a rectangle. No dedup or merging.
    pub fn add_rectangle(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.regions.push(MaskRegion::new(x, y, width, height));
    }

    /// Rectangles in insertion order
    #[must_use]
    pub fn regions(&self) -> &[MaskRegion] {
        &self.regions
    }

    /// Fill colour used by [`apply`](Self::apply)
    #[must_use]
    pub fn fill(&self) -> [u8; 4] {
        self.fill.unwrap_or(DEFAULT_MASK_FILL.0)
    }

    /// Fill colour set through [`with_fill`](Self::with_fill), if any
    #[must_use]
    pub const fn explicit_fill(&self) -> Option<[u8; 4]> {
        self.fill
    }

    /// Whether any rectangle was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of rectangles
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether a pixel falls inside any rectangle
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.regions.iter().any(|r| r.contains(x, y))
    }

    /// Return a copy of `image` with every masked rectangle painted with the
    /// fill colour. The input is left untouched.
    ///
    /// Apply the same mask to both sides of a comparison, otherwise the
    /// masked area itself shows up as a difference.
    #[must_use]
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        let fill = Rgba(self.fill());
        let (width, height) = out.dimensions();
        for region in self.regions.iter().filter_map(|r| r.clip(width, height)) {
            for y in region.y..region.bottom() {
                for x in region.x..region.right() {
                    out.put_pixel(x, y, fill);
                }
            }
        }
        out
    }
}

impl FromIterator<MaskRegion> for RegionMask {
    fn from_iter<I: IntoIterator<Item = MaskRegion>>(iter: I) -> Self {
        Self {
            regions: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_mask_region_contains() {
        let mask = MaskRegion::new(10, 20, 100, 50);
        assert!(mask.contains(10, 20));
        assert!(mask.contains(109, 69));
        assert!(!mask.contains(110, 20));
        assert!(!mask.contains(10, 70));
        assert!(!mask.contains(9, 20));
    }

    #[test]
    fn test_contains_near_u32_max() {
        let mask = MaskRegion::new(u32::MAX - 1, 0, 10, 1);
        assert!(mask.contains(u32::MAX - 1, 0));
        assert_eq!(mask.right(), u32::MAX);
    }

    #[test]
    fn test_clip_inside() {
        let r = MaskRegion::new(1, 1, 2, 2);
        assert_eq!(r.clip(10, 10), Some(r));
    }

    #[test]
    fn test_clip_partial() {
        let r = MaskRegion::new(8, 5, 10, 10);
        assert_eq!(r.clip(10, 10), Some(MaskRegion::new(8, 5, 2, 5)));
    }

    #[test]
    fn test_clip_outside() {
        assert_eq!(MaskRegion::new(10, 0, 5, 5).clip(10, 10), None);
        assert_eq!(MaskRegion::new(0, 0, 0, 5).clip(10, 10), None);
    }

    #[test]
    fn test_intersects() {
        let a = MaskRegion::new(0, 0, 10, 10);
        assert!(a.intersects(&MaskRegion::new(9, 9, 5, 5)));
        assert!(!a.intersects(&MaskRegion::new(10, 0, 5, 5)));
    }

    #[test]
    fn test_parse_mask_region() {
        let r: MaskRegion = "10, 20,30,40".parse().unwrap();
        assert_eq!(r, MaskRegion::new(10, 20, 30, 40));
        assert!("1,2,3".parse::<MaskRegion>().is_err());
        assert!("a,2,3,4".parse::<MaskRegion>().is_err());
        assert!("1,2,3,-4".parse::<MaskRegion>().is_err());
    }

    #[test]
    fn test_apply_paints_region() {
        let mut mask = RegionMask::new();
        mask.add_rectangle(1, 1, 2, 2);
        let out = mask.apply(&white(4, 4));

        assert_eq!(*out.get_pixel(1, 1), DEFAULT_MASK_FILL);
        assert_eq!(*out.get_pixel(2, 2), DEFAULT_MASK_FILL);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(3, 3), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let img = white(3, 3);
        let mask = RegionMask::new().with_region(MaskRegion::new(0, 0, 3, 3));
        let _ = mask.apply(&img);
        assert!(img.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_apply_clips_out_of_bounds() {
        let mask = RegionMask::new()
            .with_region(MaskRegion::new(2, 2, 100, 100))
            .with_region(MaskRegion::new(50, 50, 5, 5));
        let out = mask.apply(&white(4, 4));
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(*out.get_pixel(3, 3), DEFAULT_MASK_FILL);
        assert_eq!(*out.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_overlapping_rectangles_each_applied() {
        let mut mask = RegionMask::new().with_fill([0, 0, 0, 255]);
        mask.add_rectangle(0, 0, 3, 3);
        mask.add_rectangle(2, 2, 3, 3);
        let out = mask.apply(&white(6, 6));
        let masked = out.pixels().filter(|p| **p == Rgba([0, 0, 0, 255])).count();
        // 9 + 9 - 1 shared pixel
        assert_eq!(masked, 17);
        assert_eq!(mask.len(), 2);
        assert!(mask.contains(4, 4));
    }

    #[test]
    fn test_empty_mask_is_identity() {
        let img = white(5, 2);
        let mask = RegionMask::new();
        assert!(mask.is_empty());
        assert_eq!(mask.apply(&img), img);
    }

    #[test]
    fn test_from_iterator() {
        let mask: RegionMask = vec![MaskRegion::new(0, 0, 1, 1), MaskRegion::new(1, 1, 1, 1)]
            .into_iter()
            .collect();
        assert_eq!(mask.len(), 2);
        assert_eq!(mask.fill(), DEFAULT_MASK_FILL.0);
        assert_eq!(mask.explicit_fill(), None);
    }

    #[test]
    fn test_explicit_fill_is_kept() {
        let mask = RegionMask::new().with_fill([1, 2, 3, 255]);
        assert_eq!(mask.explicit_fill(), Some([1, 2, 3, 255]));
        assert_eq!(mask.fill(), [1, 2, 3, 255]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_clip_stays_in_bounds(
                x in 0u32..200,
                y in 0u32..200,
                w in 0u32..200,
                h in 0u32..200,
                cw in 1u32..100,
                ch in 1u32..100
            ) {
                if let Some(c) = MaskRegion::new(x, y, w, h).clip(cw, ch) {
                    prop_assert!(c.right() <= cw);
                    prop_assert!(c.bottom() <= ch);
                    prop_assert!(c.width > 0 && c.height > 0);
                }
            }

            #[test]
            fn prop_apply_keeps_dimensions(
                x in 0u32..40,
                y in 0u32..40,
                w in 0u32..40,
                h in 0u32..40
            ) {
                let mut mask = RegionMask::new();
                mask.add_rectangle(x, y, w, h);
                let out = mask.apply(&white(20, 10));
                prop_assert_eq!(out.dimensions(), (20, 10));
            }
        }
    }
}
