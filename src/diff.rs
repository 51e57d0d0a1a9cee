//! Difference images and the change mask.
//!
//! Two images are compared pixel by pixel twice: once in their own color
//! representation and once after conversion to 8-bit HSV. The HSV difference
//! drives the mask, which marks every pixel whose HSV delta vector is longer
//! than [`MASK_THRESHOLD`].

use rgb::RGB8;

use crate::error::{Error, Result};
use crate::raster::Image;

/// Euclidean HSV distance above which a pixel is marked as changed.
pub const MASK_THRESHOLD: f32 = 25.0;

/// Mask value for changed pixels.
pub const MASK_ON: u8 = 255;

/// Fractional bits of the fixed-point HSV arithmetic.
const HSV_SHIFT: u32 = 12;

/// Convert one pixel to 8-bit HSV.
///
/// Hue is halved into `0..180` so it fits a byte; saturation and value use
/// `0..=255`. The divisions run in 12-bit fixed point with reciprocals
/// rounded half to even, which is the arithmetic of the usual 8-bit
/// `RGB2HSV` conversion. A plain float division can land one step away on
/// exact halves.
#[must_use]
pub fn rgb_to_hsv(px: RGB8) -> [u8; 3] {
    let (r, g, b) = (i32::from(px.r), i32::from(px.g), i32::from(px.b));
    let v = r.max(g).max(b);
    let delta = v - r.min(g).min(b);

    let s = fixed_mul(delta, reciprocal(255, v));

    // Position on the hue circle in units of `delta`, 0..6 sextants.
    let sextant = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * delta
    } else {
        r - g + 4 * delta
    };
    let h = fixed_mul(sextant, reciprocal(180, 6 * delta));
    let h = if h < 0 { h + 180 } else { h };

    [h as u8, s as u8, v as u8]
}

/// `(scale << HSV_SHIFT) / divisor`, rounded half to even; 0 for a zero divisor.
fn reciprocal(scale: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        return 0;
    }
    (f64::from(scale << HSV_SHIFT) / f64::from(divisor)).round_ties_even() as i32
}

/// Multiply by a fixed-point factor and round back to an integer.
fn fixed_mul(x: i32, factor: i32) -> i32 {
    (x * factor + (1 << (HSV_SHIFT - 1))) >> HSV_SHIFT
}

/// Convert an image to 3-channel HSV.
///
/// Gray inputs are treated as `R = G = B`; alpha is dropped.
#[must_use]
pub fn to_hsv(img: &Image) -> Image {
    let data: Vec<u8> = img.rgb_pixels().flat_map(rgb_to_hsv).collect();
    Image::from_parts(data, img.width(), img.height(), 3)
}

/// Per-byte absolute difference of two images with the same shape.
pub fn abs_diff(a: &Image, b: &Image) -> Result<Image> {
    a.ensure_same_shape(b)?;
    let data = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(x, y)| x.abs_diff(*y))
        .collect();
    Image::new(data, a.width(), a.height(), a.channels())
}

/// Binary mask from a 3-channel difference image.
///
/// A pixel is [`MASK_ON`] when the Euclidean norm of its three channel
/// values exceeds `threshold`, otherwise 0. Inputs with any other channel
/// count are rejected.
pub fn threshold_mask(hsv_diff: &Image, threshold: f32) -> Result<Image> {
    if hsv_diff.channels() != 3 {
        return Err(Error::ChannelMismatch {
            expected: 3,
            actual: hsv_diff.channels(),
        });
    }
    let data = hsv_diff
        .pixels()
        .map(|px| {
            let norm = px
                .iter()
                .map(|&c| f32::from(c) * f32::from(c))
                .sum::<f32>()
                .sqrt();
            if norm > threshold { MASK_ON } else { 0 }
        })
        .collect();
    Ok(Image::from_parts(data, hsv_diff.width(), hsv_diff.height(), 1))
}

/// The three visual artifacts of a comparison.
#[derive(Debug, Clone)]
pub struct DiffArtifacts {
    /// Absolute difference in the images' own color representation.
    pub native: Image,
    /// Absolute difference after HSV conversion.
    pub hsv: Image,
    /// Single channel change mask (0 or 255).
    pub mask: Image,
}

impl DiffArtifacts {
    /// Compute all artifacts for an image pair.
    pub fn compute(a: &Image, b: &Image) -> Result<Self> {
        let native = abs_diff(a, b)?;
        let hsv = abs_diff(&to_hsv(a), &to_hsv(b))?;
        let mask = threshold_mask(&hsv, MASK_THRESHOLD)?;
        Ok(Self { native, hsv, mask })
    }

    /// Number of pixels flagged in the mask.
    #[must_use]
    pub fn changed_pixels(&self) -> usize {
        self.mask.as_bytes().iter().filter(|&&v| v == MASK_ON).count()
    }
}
