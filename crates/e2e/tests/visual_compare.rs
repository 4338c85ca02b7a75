//! Visual regression comparison behavior

use std::io::Cursor;

use image::{ImageOutputFormat, RgbaImage};

use storecheck_e2e::visual::VisualTester;
use storecheck_harness::{Error, VisualTolerance};

fn png_of(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba(color));
    encode(img)
}

/// Left half `left`, right half `right`
fn split_png(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _y| {
        if x < width / 2 {
            image::Rgba(left)
        } else {
            image::Rgba(right)
        }
    });
    encode(img)
}

fn encode(img: RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn tester(dir: &std::path::Path, seed_missing: bool) -> VisualTester {
    VisualTester::new(
        dir.join("baselines"),
        &dir.join("out"),
        VisualTolerance::default(),
        seed_missing,
    )
    .unwrap()
}

#[test]
fn a_missing_baseline_is_its_own_error_until_seeded() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), false);
    let shot = png_of(32, 32, [100, 100, 100, 255]);

    let err = tester.compare("login-page", &shot, None).unwrap_err();
    assert!(matches!(err, Error::BaselineMissing(name) if name == "login-page"));

    // The actual screenshot was still persisted, so it can become the baseline.
    tester.update_baseline("login-page").unwrap();
    let diff = tester.compare("login-page", &shot, None).unwrap();
    assert!(diff.matches);
    assert_eq!(diff.diff_pixels, 0);
    assert_eq!(tester.list_baselines(), vec!["login-page".to_string()]);
}

#[test]
fn seeding_mode_creates_the_baseline_on_first_sight() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), true);
    let shot = png_of(16, 16, [10, 20, 30, 255]);

    let diff = tester.compare("product-grid", &shot, None).unwrap();
    assert!(diff.matches);
    assert_eq!(tester.list_baselines(), vec!["product-grid".to_string()]);
}

#[test]
fn identical_screenshots_match_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), true);
    let shot = png_of(64, 48, [1, 2, 3, 255]);

    tester.compare("page", &shot, None).unwrap();
    let diff = tester.compare("page", &shot, None).unwrap();

    assert!(diff.matches);
    assert_eq!(diff.diff_ratio, 0.0);
    assert_eq!(diff.total_pixels, 64 * 48);
    assert_eq!(diff.actual_hash, diff.baseline_hash);
    assert!(diff.diff_image_path.is_none());
}

#[test]
fn noise_below_the_pixel_threshold_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), true);

    tester
        .compare("page", &png_of(32, 32, [100, 100, 100, 255]), None)
        .unwrap();
    // 10/255 per channel is well under the default 0.2 threshold
    let diff = tester
        .compare("page", &png_of(32, 32, [110, 95, 100, 255]), None)
        .unwrap();

    assert!(diff.matches);
    assert_eq!(diff.diff_pixels, 0);
}

#[test]
fn a_large_change_fails_and_writes_a_diff_image() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), true);

    tester
        .compare("page", &png_of(32, 32, [100, 100, 100, 255]), None)
        .unwrap();
    let diff = tester
        .compare(
            "page",
            &split_png(32, 32, [100, 100, 100, 255], [250, 100, 100, 255]),
            None,
        )
        .unwrap();

    assert!(!diff.matches);
    assert!(diff.diff_ratio > 0.4 && diff.diff_ratio < 0.6, "{}", diff.diff_ratio);
    let diff_path = diff.diff_image_path.expect("a diff image is written");
    assert!(diff_path.exists());
}

#[test]
fn a_tight_override_catches_small_regressions() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), true);

    tester
        .compare("page", &png_of(100, 100, [100, 100, 100, 255]), None)
        .unwrap();
    // 2% of pixels change drastically: inside the default 5% budget but
    // outside a 1% override.
    let mut img = RgbaImage::from_pixel(100, 100, image::Rgba([100, 100, 100, 255]));
    for x in 0..100 {
        for y in 0..2 {
            img.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
        }
    }
    let shot = encode(img);

    let default_budget = tester.compare("page", &shot, None).unwrap();
    assert!(default_budget.matches);

    let tight = tester.compare("page", &shot, Some(0.01)).unwrap();
    assert!(!tight.matches);
}

#[test]
fn dimension_changes_count_as_differences() {
    let dir = tempfile::tempdir().unwrap();
    let tester = tester(dir.path(), true);

    tester
        .compare("page", &png_of(32, 32, [5, 5, 5, 255]), None)
        .unwrap();
    let diff = tester
        .compare("page", &png_of(32, 48, [5, 5, 5, 255]), None)
        .unwrap();

    assert!(!diff.matches);
    assert!(diff.diff_pixels >= 32 * 16);
}

#[test]
fn update_all_baselines_promotes_every_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let strict = tester(dir.path(), false);

    assert!(strict.compare("a", &png_of(8, 8, [1, 1, 1, 255]), None).is_err());
    assert!(strict.compare("b", &png_of(8, 8, [2, 2, 2, 255]), None).is_err());

    let updated = strict.update_all_baselines().unwrap();
    assert_eq!(updated, 2);
    assert_eq!(
        strict.list_baselines(),
        vec!["a".to_string(), "b".to_string()]
    );
}
