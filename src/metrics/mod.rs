//! Structural similarity metrics.
//!
//! - [`gaussian`]: the 11x11, sigma 1.5 smoothing window
//! - [`ssim`]: SSIM map and score for a single channel pair
//! - [`channels`]: per-channel scores averaged over 1-4 channels
//!
//! Scores are reported two ways: the raw mean SSIM in `[-1, 1]`
//! ([`compute_ssim`]) and the percentage used in result records
//! ([`similarity_score`], 100 = identical).

pub mod channels;
pub mod gaussian;
pub mod ssim;

pub use channels::{compute_ssim, similarity_score};
pub use ssim::{compute_ssim_channel, ssim_map, ssim_plane, SSIM_C1, SSIM_C2};
