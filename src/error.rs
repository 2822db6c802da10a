use thiserror::Error;

/// Failure of a single bootstrap step. The boundary in
/// [`Bootstrap::run`](crate::Bootstrap::run) logs exactly one of these per
/// failed boot, so each variant names the step it belongs to.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("canvas binding failed: {0}")]
    Canvas(String),

    #[error("package {name} unavailable: {reason}")]
    Package { name: String, reason: String },

    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("{module} raised: {message}")]
    Execution { module: String, message: String },
}
