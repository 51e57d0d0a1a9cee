//! Multi-channel SSIM: per-channel scores averaged into one value.

use super::ssim::ssim_plane;
use crate::error::Result;
use crate::raster::Image;

/// Compute the mean SSIM over all channels of two images.
///
/// Both images must share dimensions and channel count. Nothing is computed
/// for a mismatched pair; the error is returned before any channel is
/// scored.
pub fn compute_ssim(a: &Image, b: &Image) -> Result<f64> {
    a.ensure_same_shape(b)?;

    let channels1 = a.split_channels();
    let channels2 = b.split_channels();

    let mut total = 0.0;
    for (c1, c2) in channels1.iter().zip(&channels2) {
        total += ssim_plane(c1, c2)?;
    }
    Ok(total / a.channels() as f64)
}

/// Mean SSIM scaled to a percentage (100 = identical).
pub fn similarity_score(a: &Image, b: &Image) -> Result<f64> {
    Ok(100.0 * compute_ssim(a, b)?)
}
