//! Visual regression testing with baseline screenshots
//!
//! Screenshots arrive as PNG bytes from the driver; the tester persists them
//! under `actual/`, compares against `baseline/` and writes a red-marked
//! diff image on mismatch. Two pixels count as equal when every channel
//! differs by at most `pixel_threshold` (as a 0..1 fraction); the comparison
//! passes when the ratio of differing pixels stays within `max_diff_ratio`.

use std::path::{Path, PathBuf};

use image::{GenericImageView, Pixel, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use storecheck_harness::{Error, Result, SuiteConfig, VisualTolerance};

/// Result of one baseline comparison
#[derive(Debug, Clone)]
pub struct VisualDiff {
    /// Whether the screenshot matched within tolerance
    pub matches: bool,

    /// Ratio of differing pixels (0.0 - 1.0)
    pub diff_ratio: f64,

    pub diff_pixels: u64,

    pub total_pixels: u64,

    /// Path to the diff image, when one was written
    pub diff_image_path: Option<PathBuf>,

    pub actual_hash: String,

    pub baseline_hash: String,
}

/// Compares screenshots against named baselines
pub struct VisualTester {
    baseline_dir: PathBuf,
    actual_dir: PathBuf,
    diff_dir: PathBuf,
    tolerance: VisualTolerance,
    seed_missing: bool,
}

impl VisualTester {
    pub fn new(
        baseline_dir: impl Into<PathBuf>,
        output_dir: &Path,
        tolerance: VisualTolerance,
        seed_missing: bool,
    ) -> Result<Self> {
        let baseline_dir = baseline_dir.into();
        let actual_dir = output_dir.join("screenshots");
        let diff_dir = output_dir.join("diffs");

        std::fs::create_dir_all(&baseline_dir)?;
        std::fs::create_dir_all(&actual_dir)?;
        std::fs::create_dir_all(&diff_dir)?;

        Ok(Self {
            baseline_dir,
            actual_dir,
            diff_dir,
            tolerance,
            seed_missing,
        })
    }

    /// Baselines live next to the report output; seeding is controlled by
    /// the suite's `update_baselines` switch
    pub fn from_config(config: &SuiteConfig) -> Result<Self> {
        Self::new(
            config.output_dir.join("baselines"),
            &config.output_dir,
            config.visual,
            config.update_baselines,
        )
    }

    /// Compare PNG bytes against the named baseline. The actual image is
    /// always persisted. `max_diff_ratio` overrides the configured ratio
    /// for this one comparison.
    pub fn compare(
        &self,
        name: &str,
        png: &[u8],
        max_diff_ratio: Option<f64>,
    ) -> Result<VisualDiff> {
        let max_ratio = max_diff_ratio.unwrap_or(self.tolerance.max_diff_ratio);

        let actual_path = self.actual_dir.join(format!("{name}.png"));
        std::fs::write(&actual_path, png)?;

        let baseline_path = self.baseline_dir.join(format!("{name}.png"));
        if !baseline_path.exists() {
            if self.seed_missing {
                info!("seeding baseline for '{name}'");
                std::fs::copy(&actual_path, &baseline_path)?;

                let hash = hash_bytes(png);
                return Ok(VisualDiff {
                    matches: true,
                    diff_ratio: 0.0,
                    diff_pixels: 0,
                    total_pixels: 0,
                    diff_image_path: None,
                    actual_hash: hash.clone(),
                    baseline_hash: hash,
                });
            }
            return Err(Error::BaselineMissing(name.to_string()));
        }

        let baseline_bytes = std::fs::read(&baseline_path)?;
        let actual_hash = hash_bytes(png);
        let baseline_hash = hash_bytes(&baseline_bytes);

        // Byte-identical screenshots skip the pixel walk.
        if actual_hash == baseline_hash {
            debug!("'{name}' matches its baseline exactly");
            let img = decode(name, png)?;
            return Ok(VisualDiff {
                matches: true,
                diff_ratio: 0.0,
                diff_pixels: 0,
                total_pixels: u64::from(img.width()) * u64::from(img.height()),
                diff_image_path: None,
                actual_hash,
                baseline_hash,
            });
        }

        let actual_img = decode(name, png)?.to_rgba8();
        let baseline_img = decode(name, &baseline_bytes)?.to_rgba8();

        if actual_img.dimensions() != baseline_img.dimensions() {
            warn!(
                "'{name}' dimensions differ: actual {:?} vs baseline {:?}",
                actual_img.dimensions(),
                baseline_img.dimensions()
            );
        }

        // Compare over the union of both sizes; pixels outside the overlap
        // count as differing.
        let width = actual_img.width().max(baseline_img.width());
        let height = actual_img.height().max(baseline_img.height());
        let total_pixels = u64::from(width) * u64::from(height);

        let mut diff_img = RgbaImage::new(width, height);
        let mut diff_pixels = 0u64;

        for y in 0..height {
            for x in 0..width {
                let inside =
                    x < actual_img.width().min(baseline_img.width())
                        && y < actual_img.height().min(baseline_img.height());
                let differs = if inside {
                    pixels_differ(
                        actual_img.get_pixel(x, y),
                        baseline_img.get_pixel(x, y),
                        self.tolerance.pixel_threshold,
                    )
                } else {
                    true
                };

                if differs {
                    diff_pixels += 1;
                    diff_img.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
                } else {
                    // Keep the original but dimmed, so the diff reads in context
                    let channels = actual_img.get_pixel(x, y).channels();
                    diff_img.put_pixel(
                        x,
                        y,
                        image::Rgba([channels[0] / 2, channels[1] / 2, channels[2] / 2, 128]),
                    );
                }
            }
        }

        let diff_ratio = diff_pixels as f64 / total_pixels as f64;
        let matches = diff_ratio <= max_ratio;

        let diff_image_path = if diff_pixels > 0 {
            let path = self.diff_dir.join(format!("{name}-diff.png"));
            diff_img
                .save(&path)
                .map_err(|e| Error::Visual(e.to_string()))?;
            Some(path)
        } else {
            None
        };

        if !matches {
            warn!(
                "visual regression in '{name}': ratio {:.4} exceeds {:.4}",
                diff_ratio, max_ratio
            );
        }

        Ok(VisualDiff {
            matches,
            diff_ratio,
            diff_pixels,
            total_pixels,
            diff_image_path,
            actual_hash,
            baseline_hash,
        })
    }

    /// Promote the stored actual screenshot to the baseline
    pub fn update_baseline(&self, name: &str) -> Result<()> {
        let actual_path = self.actual_dir.join(format!("{name}.png"));
        if !actual_path.exists() {
            return Err(Error::Visual(format!(
                "cannot update baseline '{name}': no actual screenshot at {}",
                actual_path.display()
            )));
        }

        std::fs::copy(&actual_path, self.baseline_dir.join(format!("{name}.png")))?;
        info!("updated baseline for '{name}'");
        Ok(())
    }

    /// Promote every stored actual screenshot to its baseline
    pub fn update_all_baselines(&self) -> Result<usize> {
        let mut updated = 0;
        for name in png_names(&self.actual_dir) {
            self.update_baseline(&name)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Names of all known baselines, sorted
    pub fn list_baselines(&self) -> Vec<String> {
        png_names(&self.baseline_dir)
    }
}

fn png_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "png").unwrap_or(false))
        .filter_map(|e| e.path().file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    names.sort_unstable();
    names
}

fn decode(name: &str, bytes: &[u8]) -> Result<image::DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| Error::Visual(format!("undecodable screenshot '{name}': {e}")))
}

fn pixels_differ(a: &image::Rgba<u8>, b: &image::Rgba<u8>, threshold: f64) -> bool {
    let limit = (threshold * 255.0) as i32;
    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(ca, cb)| (i32::from(*ca) - i32::from(*cb)).abs() > limit)
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
