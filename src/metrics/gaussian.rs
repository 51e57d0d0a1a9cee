//! Separable Gaussian smoothing for `f32` planes.

use imgref::ImgVec;

/// Side length of the SSIM smoothing window.
pub const WINDOW_SIZE: usize = 11;

/// Standard deviation of the SSIM smoothing window.
pub const WINDOW_SIGMA: f64 = 1.5;

/// Build a normalized 1-D Gaussian kernel of odd length `size`.
///
/// Taps are `exp(-(i - center)^2 / (2 * sigma^2))`, scaled to sum to 1.
#[must_use]
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f32> {
    assert!(size % 2 == 1, "kernel size must be odd");
    let center = (size / 2) as f64;
    let scale = -0.5 / (sigma * sigma);

    let taps: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();

    taps.iter().map(|t| (t / sum) as f32).collect()
}

/// Reflect-101 border handling: `...cba|abcd|dcb...`.
///
/// A single-pixel axis maps every index onto itself.
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

/// Smooth a plane with the SSIM window (11 taps, sigma 1.5).
#[must_use]
pub fn gaussian_blur(plane: &ImgVec<f32>) -> ImgVec<f32> {
    let kernel = gaussian_kernel(WINDOW_SIZE, WINDOW_SIGMA);
    convolve_separable(plane, &kernel)
}

/// Convolve rows then columns with the same symmetric kernel.
#[must_use]
pub fn convolve_separable(plane: &ImgVec<f32>, kernel: &[f32]) -> ImgVec<f32> {
    let width = plane.width();
    let height = plane.height();
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0.0f32; width * height];
    for (y, row) in plane.rows().enumerate() {
        let out = &mut horizontal[y * width..(y + 1) * width];
        for (x, dst) in out.iter_mut().enumerate() {
            *dst = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sx = reflect_101(x as isize + k as isize - radius, width);
                    w * row[sx]
                })
                .sum();
        }
    }

    let mut vertical = vec![0.0f32; width * height];
    for y in 0..height {
        for (k, w) in kernel.iter().enumerate() {
            let sy = reflect_101(y as isize + k as isize - radius, height);
            let src = &horizontal[sy * width..(sy + 1) * width];
            let dst = &mut vertical[y * width..(y + 1) * width];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += w * s;
            }
        }
    }

    ImgVec::new(vertical, width, height)
}
