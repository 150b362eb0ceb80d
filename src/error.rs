use thiserror::Error;

/// Fatal configuration misuse. These abort initialization; they are not
/// expected at runtime once a config is fixed.
#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("geometry collection is empty; cannot fit a projection")]
    EmptyGeometry,
    #[error("category schema has no category fields")]
    NoCategories,
    #[error("viewport dimensions must be positive, got {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}
