//! Error taxonomy shared by every frame operation.
//!
//! All errors are raised at the point of detection and never retried
//! internally; batch drivers decide whether to skip, retry or abort a file.

use crate::io::fits::FitsError;
use crate::normalize::SampleEncoding;
use crate::stats::StatsError;
use thiserror::Error;

/// Errors produced while normalizing, transforming or grouping frames
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Unsupported sample encoding {0}: expected 16-bit unsigned integer or floating point")]
    UnsupportedEncoding(SampleEncoding),
    #[error("Unsupported array rank {0}: frames must be 2-D (gray) or 3-D (color)")]
    UnsupportedRank(usize),
    #[error("Shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("Missing header key: {0}")]
    MissingKey(String),
    #[error("Header key {0} does not hold a numeric value")]
    NonNumericKey(String),
    #[error("Region out of bounds: {0}")]
    OutOfBounds(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Fits(#[from] FitsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FrameError::MissingKey("EXPTIME".to_string());
        assert!(error.to_string().contains("Missing header key: EXPTIME"));

        let error = FrameError::UnsupportedEncoding(SampleEncoding::I32);
        assert!(error.to_string().contains("int32"));

        let error = FrameError::ShapeMismatch {
            left: (4, 5),
            right: (5, 4),
        };
        assert_eq!(error.to_string(), "Shape mismatch: (4, 5) vs (5, 4)");
    }

    #[test]
    fn test_fits_error_converts() {
        let error: FrameError = FitsError::NoImageData.into();
        assert!(matches!(error, FrameError::Fits(FitsError::NoImageData)));
        assert!(error.to_string().contains("no image data"));
    }
}
