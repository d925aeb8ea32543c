//! Visual Regression Demo
//!
//! Walks through the engine's main operations:
//! - Baseline capture and identical comparison
//! - A localised change and its difference region
//! - Masking dynamic content
//! - Perceptual hash verification
//! - Writing report artifacts
//!
//! Run with: cargo run --example visual_regression_demo -p visreg

use image::{Rgba, RgbaImage};
use visreg::prelude::*;

fn main() -> VisregResult<()> {
    println!("=== Visual Regression Demo ===\n");

    let workdir = std::env::temp_dir().join("visreg_demo");
    let engine = VisualComparisonEngine::new(
        VisualConfig::default().with_baseline_dir(workdir.join("baselines")),
    )?;

    // Demo 1: Configuration
    println!("1. Configuration");
    println!("   -------------");
    let config = engine.config();
    println!("   Baseline dir: {}", config.baseline_dir.display());
    println!("   Threshold:    {}", config.threshold);
    println!("   Noise floor:  {}", config.noise_floor);
    println!("   Hash size:    {}x{}\n", config.hash_size, config.hash_size);

    // Demo 2: Capture and identical comparison
    println!("2. Capture + Identical Comparison");
    println!("   ------------------------------");
    let button = create_solid_image(200, 60, Rgba([0, 0, 255, 255]));
    engine.capture_baseline("login_button", &button)?;
    let result = engine.compare("login_button", &button, &CompareOptions::new())?;
    println!("   {}\n", result.summary());

    // Demo 3: Localised change
    println!("3. Localised Change");
    println!("   ----------------");
    let broken = paint(&button, MaskRegion::new(10, 10, 20, 20), Rgba([255, 0, 0, 255]));
    let result = engine.compare("login_button", &broken, &CompareOptions::new())?;
    println!("   {}", result.summary());
    for region in &result.differences {
        println!(
            "     region at ({}, {}) size {}x{} magnitude {:.3} kind {:?}",
            region.x, region.y, region.width, region.height, region.magnitude, region.kind
        );
    }
    println!();

    // Demo 4: Masking
    println!("4. Masking Dynamic Content");
    println!("   -----------------------");
    let mask = RegionMask::new().with_region(MaskRegion::new(10, 10, 20, 20));
    let result = engine.compare(
        "login_button",
        &broken,
        &CompareOptions::new().with_mask(mask),
    )?;
    println!("   With the change masked: {}\n", result.summary());

    // Demo 5: Perceptual hash
    println!("5. Perceptual Hash");
    println!("   ---------------");
    let hash = PerceptualHasher::default().compute(&broken)?;
    println!("   pHash of changed button: {hash}");
    println!(
        "   verify_hash(identical): {}",
        engine.verify_hash("login_button", &button)?
    );
    println!(
        "   hash similarity(changed): {:.3}\n",
        engine.hash_similarity("login_button", &broken)?
    );

    // Demo 6: Report artifacts
    println!("6. Report Artifacts");
    println!("   ----------------");
    let (result, artifacts) =
        engine.compare_with_artifacts("login_button", &broken, &CompareOptions::new())?;
    let paths = ReportWriter::new().with_annotations(true).write(
        "login_button",
        &result,
        &artifacts,
        workdir.join("report"),
    )?;
    println!("   Diff image:  {}", paths.diff.display());
    println!("   Result JSON: {}", paths.result.display());

    println!("\n=== Demo Complete ===");
    Ok(())
}

fn create_solid_image(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
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
