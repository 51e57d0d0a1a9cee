//! # png-compare
//!
//! Perceptual image comparison for visual regression pipelines.
//!
//! Two equally sized 8-bit images are scored with SSIM (structural
//! similarity, averaged over channels and scaled to 0-100) and diffed in
//! their own color space and in HSV. The HSV difference yields a binary
//! change mask. Everything is published into a result directory named after
//! the two inputs, together with an `info.txt` record that the aggregation
//! tooling consumes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use png_compare::{compare_files, CompareConfig};
//!
//! let cmp = compare_files(
//!     Path::new("golden/login.png"),
//!     Path::new("actual/login.png"),
//!     Path::new("./results"),
//!     &CompareConfig::default(),
//! )?;
//! println!("Similarity: {:.2}", cmp.record.score);
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`raster`]: The in-memory [`Image`] type
//! - [`imageio`]: Decoding and PNG encoding
//! - [`metrics`]: SSIM engine and channel aggregation
//! - [`diff`]: Difference images and the change mask
//! - [`record`]: The `info.txt` result record
//! - [`publish`]: Result directory layout and publishing
//! - [`compare`]: The end-to-end comparison of one image pair
//! - [`aggregate`]: Score filtering over many result directories

pub mod aggregate;
pub mod compare;
pub mod diff;
pub mod error;
pub mod imageio;
pub mod metrics;
pub mod publish;
pub mod raster;
pub mod record;

// Re-export commonly used types
pub use aggregate::{AggregateConfig, AggregateReport, DiffSelection, ScoreFilter};
pub use compare::{compare_files, compare_images, CompareConfig, Comparison};
pub use diff::DiffArtifacts;
pub use error::{Error, Result};
pub use imageio::ColorMode;
pub use metrics::{compute_ssim, similarity_score};
pub use raster::Image;
pub use record::ResultRecord;
