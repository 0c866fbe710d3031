//! Error types for streamnet

use thiserror::Error;

/// Main error type for streamnet operations
#[derive(Error, Debug)]
pub enum Error {
    /// Required spatial metadata is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Raster shape mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    ShapeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster transform mismatch: expected {expected}, got {actual}")]
    TransformMismatch { expected: String, actual: String },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    /// A boolean selector had the wrong length, or an ID is not in the network.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unknown statistic \"{name}\" (supported: {supported})")]
    UnknownStatistic { name: String, supported: String },

    /// A parallel basin worker failed; the whole call was aborted.
    #[error("Basin worker failed: {0}")]
    WorkerFailure(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is one of the shape/transform/CRS mismatch family.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Error::ShapeMismatch { .. } | Error::TransformMismatch { .. } | Error::CrsMismatch(..)
        )
    }
}

/// Result type alias for streamnet operations
pub type Result<T> = std::result::Result<T, Error>;
