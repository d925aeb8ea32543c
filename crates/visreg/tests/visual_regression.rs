//! End-to-end behaviour of the comparison engine against a real baseline
//! directory.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use image::{Rgba, RgbaImage};
use proptest::prelude::*;
use tempfile::TempDir;
use visreg::prelude::*;

const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn engine(dir: &TempDir) -> VisualComparisonEngine {
    VisualComparisonEngine::new(VisualConfig::new().with_baseline_dir(dir.path().join("baselines")))
        .expect("default config is valid")
}

fn paint(image: &RgbaImage, rect: MaskRegion, color: Rgba<u8>) -> RgbaImage {
    let mut out = image.clone();
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            out.put_pixel(x, y, color);
        }
    }
    out
}

// ============================================================================
// Idempotence
// ============================================================================

fn assert_idempotent(image: &RgbaImage) {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    assert!(engine.capture_baseline("shot", image).unwrap());
    let result = engine.compare("shot", image, &CompareOptions::new()).unwrap();
    assert_eq!(result.similarity, 1.0);
    assert!(result.matched);
    assert!(result.differences.is_empty());
}

#[test]
fn test_idempotent_single_pixel() {
    assert_idempotent(&RgbaImage::from_pixel(1, 1, Rgba([12, 34, 56, 255])));
}

#[test]
fn test_idempotent_translucent() {
    assert_idempotent(&RgbaImage::from_fn(9, 7, |x, y| {
        Rgba([x as u8 * 20, y as u8 * 30, 90, (x * y * 4) as u8])
    }));
}

#[test]
fn test_idempotent_large() {
    let image = RgbaImage::from_fn(4000, 3000, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
    });
    assert_idempotent(&image);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_compare_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let base = RgbaImage::from_fn(64, 48, |x, y| Rgba([x as u8 * 3, y as u8 * 5, 40, 255]));
    let current = paint(&base, MaskRegion::new(5, 5, 12, 9), RED);
    let current = paint(&current, MaskRegion::new(40, 30, 6, 6), BLUE);
    engine.capture_baseline("det", &base).unwrap();

    let opts = CompareOptions::new().with_hash_prefilter(true);
    let first = engine.compare("det", &current, &opts).unwrap();
    let second = engine.compare("det", &current, &opts).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// ============================================================================
// Masking
// ============================================================================

#[test]
fn test_masking_correctness() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let base = RgbaImage::from_pixel(120, 80, Rgba([240, 240, 240, 255]));
    let clock = MaskRegion::new(90, 5, 25, 10);
    let current = paint(&base, clock, Rgba([10, 10, 10, 255]));
    engine.capture_baseline("dashboard", &base).unwrap();

    let masked = engine
        .compare(
            "dashboard",
            &current,
            &CompareOptions::new().with_mask(RegionMask::new().with_region(clock)),
        )
        .unwrap();
    assert_eq!(masked.similarity, 1.0);
    assert!(masked.matched);

    let unmasked = engine
        .compare("dashboard", &current, &CompareOptions::new())
        .unwrap();
    assert!(unmasked.similarity < 1.0);
    assert!(unmasked.differences.iter().any(|d| d.overlaps(&clock)));
}

#[test]
fn test_mask_outside_image_is_clipped() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let base = RgbaImage::from_pixel(10, 10, BLUE);
    engine.capture_baseline("clip", &base).unwrap();

    let mut mask = RegionMask::new();
    mask.add_rectangle(500, 500, 20, 20);
    mask.add_rectangle(8, 8, 100, 100);
    let result = engine
        .compare("clip", &base, &CompareOptions::new().with_mask(mask))
        .unwrap();
    assert_eq!(result.similarity, 1.0);
}

// ============================================================================
// Size mismatch and missing baselines
// ============================================================================

#[test]
fn test_size_mismatch_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    engine
        .capture_baseline("resized", &RgbaImage::from_pixel(100, 100, BLUE))
        .unwrap();

    let result = engine
        .compare("resized", &RgbaImage::from_pixel(50, 50, BLUE), &CompareOptions::new())
        .unwrap();
    assert!(!result.matched);
    assert!(!result.differences.is_empty());
    assert!(result
        .differences
        .iter()
        .any(|d| d.size() == (100, 100) && d.magnitude == 1.0));
}

#[test]
fn test_missing_baseline() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let image = RgbaImage::from_pixel(4, 4, BLUE);

    let err = engine
        .compare("neverCaptured", &image, &CompareOptions::new())
        .unwrap_err();
    assert!(err.is_baseline_not_found());
    assert!(matches!(err, VisregError::BaselineNotFound { ref name } if name == "neverCaptured"));

    engine.capture_baseline("neverCaptured", &image).unwrap();
    assert!(engine
        .compare("neverCaptured", &image, &CompareOptions::new())
        .is_ok());
}

#[test]
fn test_corrupt_baseline_surfaces_decode_error() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let path = engine.store().path_for("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"\x89PNG but not really").unwrap();

    let err = engine
        .compare("corrupt", &RgbaImage::from_pixel(2, 2, BLUE), &CompareOptions::new())
        .unwrap_err();
    assert!(matches!(err, VisregError::Decode { .. }));
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[test]
fn test_login_button_scenario() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let button = RgbaImage::from_pixel(200, 60, BLUE);

    assert!(engine.capture_baseline("login_button", &button).unwrap());

    let same = engine
        .compare("login_button", &button.clone(), &CompareOptions::new())
        .unwrap();
    assert!(same.matched);
    assert_eq!(same.similarity, 1.0);
    assert!(same.differences.is_empty());

    let broken = paint(&button, MaskRegion::new(10, 10, 20, 20), RED);
    let result = engine
        .compare("login_button", &broken, &CompareOptions::new())
        .unwrap();
    assert!(!result.matched);
    assert!(result.similarity < 0.95);
    assert_eq!(result.differences.len(), 1);
    assert!(result.differences[0].covers(&MaskRegion::new(10, 10, 20, 20)));
}

#[test]
fn test_report_for_failed_comparison() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let button = RgbaImage::from_pixel(200, 60, BLUE);
    engine.capture_baseline("login_button", &button).unwrap();
    let broken = paint(&button, MaskRegion::new(10, 10, 20, 20), RED);

    let (result, artifacts) = engine
        .compare_with_artifacts("login_button", &broken, &CompareOptions::new())
        .unwrap();
    let paths = ReportWriter::new()
        .with_annotations(true)
        .write("login_button", &result, &artifacts, dir.path().join("report"))
        .unwrap();

    for path in [&paths.baseline, &paths.current, &paths.diff, &paths.result] {
        assert!(path.is_file(), "{} missing", path.display());
    }
    let diff = visreg::codec::load(&paths.diff).unwrap();
    assert_eq!(*diff.get_pixel(15, 15), DIFF_HIGHLIGHT);
}

#[test]
fn test_recapture_after_intentional_change() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let v1 = RgbaImage::from_pixel(30, 30, BLUE);
    let v2 = paint(&v1, MaskRegion::new(0, 0, 30, 10), RED);

    engine.capture_baseline("header", &v1).unwrap();
    assert!(!engine.compare("header", &v2, &CompareOptions::new()).unwrap().matched);

    engine.capture_baseline("header", &v2).unwrap();
    assert!(engine.compare("header", &v2, &CompareOptions::new()).unwrap().matched);
    assert_eq!(engine.baseline_names().unwrap(), vec!["header"]);
}

// ============================================================================
// Monotonicity
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_more_differing_pixels_never_more_similar(
        fewer in 0u32..200,
        extra in 1u32..200,
        shade in 31u8..=255
    ) {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let base = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        engine.capture_baseline("mono", &base).unwrap();

        let candidate = |n: u32| {
            let mut img = base.clone();
            for i in 0..n.min(400) {
                img.put_pixel(i % 20, i / 20, Rgba([shade, shade, shade, 255]));
            }
            img
        };
        let a = engine.compare("mono", &candidate(fewer), &CompareOptions::new()).unwrap();
        let b = engine.compare("mono", &candidate(fewer + extra), &CompareOptions::new()).unwrap();
        prop_assert!(a.similarity >= b.similarity);
    }
}
