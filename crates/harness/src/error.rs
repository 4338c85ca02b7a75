//! Error types for the storecheck suite

use thiserror::Error;

/// Result type alias using the storecheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// storecheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid suite configuration: {0}")]
    Config(String),

    #[error("fixture dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("unknown fixture: {0}")]
    UnknownFixture(String),

    #[error("fixture '{fixture}' does not hold a {expected}")]
    FixtureType {
        fixture: String,
        expected: &'static str,
    },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("teardown of '{fixture}' failed: {reason}")]
    Teardown { fixture: String, reason: String },

    #[error("scenario timed out after {0} ms")]
    Timeout(u64),

    #[error("storefront unreachable at {0}")]
    Unreachable(String),

    #[error("screenshot '{name}' differs by ratio {ratio:.4} (max allowed: {max_ratio:.4})")]
    ScreenshotMismatch {
        name: String,
        ratio: f64,
        max_ratio: f64,
    },

    #[error("no baseline screenshot named '{0}'")]
    BaselineMissing(String),

    #[error("visual comparison error: {0}")]
    Visual(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
