//! Suite configuration, read once at startup

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Tolerance for screenshot comparison
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisualTolerance {
    /// Maximum ratio of differing pixels (0.0 - 1.0) for a match
    pub max_diff_ratio: f64,

    /// Per-pixel channel difference (0.0 - 1.0) below which two pixels
    /// are considered equal (absorbs anti-aliasing and compression noise)
    pub pixel_threshold: f64,
}

impl Default for VisualTolerance {
    fn default() -> Self {
        Self {
            max_diff_ratio: 0.05,
            pixel_threshold: 0.2,
        }
    }
}

/// Static configuration for a whole suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Base URL of the storefront under test
    pub base_url: String,

    /// Run the browser headless
    pub headless: bool,

    /// Viewport applied to every fresh browser context
    pub viewport: Viewport,

    /// Deadline for a single driver action, in milliseconds
    pub action_timeout_ms: u64,

    /// Deadline for a whole scenario (resolution + body), in milliseconds.
    /// Teardown gets the same budget again, separately.
    pub scenario_timeout_ms: u64,

    /// How many times a failed scenario is re-run before being recorded
    /// as failed
    pub retries: u32,

    /// Maximum number of scenarios in flight at once
    pub workers: usize,

    /// Screenshot comparison tolerance
    pub visual: VisualTolerance,

    /// Seed missing visual baselines from the current screenshots
    pub update_baselines: bool,

    /// Directory for results, screenshots, baselines and diffs
    pub output_dir: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.saucedemo.com".to_string(),
            headless: true,
            viewport: Viewport::default(),
            action_timeout_ms: 10_000,
            scenario_timeout_ms: 30_000,
            retries: 0,
            workers: 1,
            visual: VisualTolerance::default(),
            update_baselines: false,
            output_dir: PathBuf::from("test-results"),
        }
    }
}
