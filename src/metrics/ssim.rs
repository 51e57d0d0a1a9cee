//! Single channel SSIM (structural similarity).
//!
//! ```text
//!                 (2*mu_x*mu_y + c1)(2*sigma_xy + c2)
//!  SSIM(x,y) = --------------------------------------------------
//!              (mu_x^2 + mu_y^2 + c1)(sigma_x^2 + sigma_y^2 + c2)
//! ```
//!
//! Local statistics come from an 11x11 Gaussian window with sigma 1.5. The
//! score for a channel pair is the spatial mean of the SSIM map.
//!
//! Identical inputs land very close to 1.0 and black vs white lands close
//! to, but not exactly at, 0.0. The stabilization constants and the `f32`
//! smoothing make this unavoidable.

use imgref::ImgVec;

use super::gaussian::gaussian_blur;
use crate::error::{Error, Result};
use crate::raster::Image;

/// `(K1 * L)^2` with K1 = 0.01 and an 8-bit dynamic range L = 255.
pub const SSIM_C1: f32 = 6.5025;
/// `(K2 * L)^2` with K2 = 0.03 and L = 255.
pub const SSIM_C2: f32 = 58.5225;

fn to_f32(plane: &ImgVec<u8>) -> ImgVec<f32> {
    let buf = plane.pixels().map(f32::from).collect();
    ImgVec::new(buf, plane.width(), plane.height())
}

fn zip_map(a: &ImgVec<f32>, b: &ImgVec<f32>, f: impl Fn(f32, f32) -> f32) -> ImgVec<f32> {
    let buf = a.pixels().zip(b.pixels()).map(|(x, y)| f(x, y)).collect();
    ImgVec::new(buf, a.width(), a.height())
}

/// Compute the per-pixel SSIM map of two equally sized planes.
pub fn ssim_map(x: &ImgVec<u8>, y: &ImgVec<u8>) -> Result<ImgVec<f32>> {
    if (x.width(), x.height()) != (y.width(), y.height()) {
        return Err(Error::DimensionMismatch {
            expected: (x.width(), x.height()),
            actual: (y.width(), y.height()),
        });
    }

    let x = to_f32(x);
    let y = to_f32(y);

    let mu_x = gaussian_blur(&x);
    let mu_y = gaussian_blur(&y);

    let x_2 = gaussian_blur(&zip_map(&x, &x, |a, b| a * b));
    let y_2 = gaussian_blur(&zip_map(&y, &y, |a, b| a * b));
    let x_y = gaussian_blur(&zip_map(&x, &y, |a, b| a * b));

    let buf = mu_x
        .pixels()
        .zip(mu_y.pixels())
        .zip(x_2.pixels().zip(y_2.pixels()).zip(x_y.pixels()))
        .map(|((mx, my), ((ex2, ey2), exy))| {
            let mu_x_2 = mx * mx;
            let mu_y_2 = my * my;
            let mu_x_mu_y = mx * my;

            let sigma_x_2 = ex2 - mu_x_2;
            let sigma_y_2 = ey2 - mu_y_2;
            let sigma_xy = exy - mu_x_mu_y;

            let numerator = (2.0 * mu_x_mu_y + SSIM_C1) * (2.0 * sigma_xy + SSIM_C2);
            let denominator = (mu_x_2 + mu_y_2 + SSIM_C1) * (sigma_x_2 + sigma_y_2 + SSIM_C2);
            numerator / denominator
        })
        .collect();

    Ok(ImgVec::new(buf, x.width(), x.height()))
}

/// Mean SSIM of two equally sized planes, in `[-1, 1]`.
pub fn ssim_plane(x: &ImgVec<u8>, y: &ImgVec<u8>) -> Result<f64> {
    let map = ssim_map(x, y)?;
    let total: f64 = map.pixels().map(f64::from).sum();
    Ok(total / (map.width() * map.height()) as f64)
}

/// Mean SSIM of two single channel images.
///
/// Multi-channel inputs are rejected with [`Error::NotSingleChannel`]; use
/// [`compute_ssim`](super::channels::compute_ssim) for those.
pub fn compute_ssim_channel(x: &Image, y: &Image) -> Result<f64> {
    for img in [x, y] {
        if img.channels() != 1 {
            return Err(Error::NotSingleChannel {
                channels: img.channels(),
            });
        }
    }
    ssim_plane(&x.plane(0), &y.plane(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> ImgVec<u8> {
        let buf = (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                ((x * 7 + y * 13) % 256) as u8
            })
            .collect();
        ImgVec::new(buf, width, height)
    }

    #[test]
    fn test_identical_planes() {
        let plane = gradient(32, 24);
        let ssim = ssim_plane(&plane, &plane).unwrap();
        assert!((ssim - 1.0).abs() < 1e-4, "got {ssim}");
    }

    #[test]
    fn test_black_vs_white_near_zero() {
        let black = ImgVec::new(vec![0u8; 16 * 16], 16, 16);
        let white = ImgVec::new(vec![255u8; 16 * 16], 16, 16);
        let ssim = ssim_plane(&black, &white).unwrap();
        assert!(ssim > 0.0, "constants keep the score positive, got {ssim}");
        assert!(ssim < 0.001, "got {ssim}");
    }

    #[test]
    fn test_map_shape() {
        let a = gradient(13, 5);
        let map = ssim_map(&a, &a).unwrap();
        assert_eq!((map.width(), map.height()), (13, 5));
    }

    #[test]
    fn test_plane_dimension_mismatch() {
        let a = gradient(16, 16);
        let b = gradient(16, 15);
        assert!(matches!(
            ssim_plane(&a, &b),
            Err(Error::DimensionMismatch { expected: (16, 16), actual: (16, 15) })
        ));
    }

    #[test]
    fn test_channel_rejects_multichannel() {
        let gray = Image::filled(16, 16, &[128]).unwrap();
        let rgb = Image::filled(16, 16, &[128, 128, 128]).unwrap();
        assert!(matches!(
            compute_ssim_channel(&gray, &rgb),
            Err(Error::NotSingleChannel { channels: 3 })
        ));
        assert!(matches!(
            compute_ssim_channel(&rgb, &gray),
            Err(Error::NotSingleChannel { channels: 3 })
        ));
        assert!(compute_ssim_channel(&gray, &gray).is_ok());
    }

    #[test]
    fn test_shift_lowers_score() {
        let a = gradient(32, 32);
        let shifted = ImgVec::new(
            a.pixels().map(|v| v.saturating_add(40)).collect(),
            32,
            32,
        );
        let ssim = ssim_plane(&a, &shifted).unwrap();
        assert!(ssim < 0.999);
        assert!(ssim > 0.0);
    }
}
