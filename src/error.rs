//! Error types for png-compare operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for png-compare operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while comparing images or aggregating results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Failed to load an image file.
    #[error("Image load failed: {path}: {reason}")]
    ImageLoad {
        /// Path to the image that failed to load.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Failed to encode or write an image file.
    #[error("Image save failed: {path}: {reason}")]
    ImageSave {
        /// Destination path.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Pixel buffer does not describe a valid image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Channel count outside of the supported 1-4 range.
    #[error("Unsupported channel count: {0} (expected 1-4)")]
    UnsupportedChannels(usize),

    /// The SSIM engine only accepts single channel planes.
    #[error("SSIM input must have exactly one channel, got {channels}")]
    NotSingleChannel {
        /// Channel count of the offending input.
        channels: usize,
    },

    /// Image dimensions don't match between the two operands.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Dimensions of the first image (width, height).
        expected: (usize, usize),
        /// Dimensions of the second image (width, height).
        actual: (usize, usize),
    },

    /// Channel counts don't match between the two operands.
    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch {
        /// Channel count of the first image.
        expected: usize,
        /// Channel count of the second image.
        actual: usize,
    },

    /// Malformed `info.txt` result record.
    #[error("Invalid result record {path}: {reason}")]
    Record {
        /// Record file (empty when parsing from memory).
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Unknown score filter name.
    #[error("Invalid filter type: {0}")]
    InvalidFilter(String),

    /// Unknown decode color mode name.
    #[error("Invalid color mode: {0} (expected rgb or native)")]
    InvalidColorMode(String),

    /// A path that must be a directory is not one.
    #[error("Invalid directory: {0}")]
    NotADirectory(PathBuf),

    /// Copying a result file failed.
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source file.
        from: PathBuf,
        /// Destination file.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
