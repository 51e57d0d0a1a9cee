//! Decoding image files into [`Image`]s and encoding them back to PNG.
//!
//! Decoding goes through the `image` crate. Anything above 8 bits per
//! channel is narrowed to 8 bits, since the metric constants assume a
//! dynamic range of 255.
//!
//! # Example
//!
//! ```ignore
//! use png_compare::imageio::{load_image, save_png, ColorMode};
//!
//! let img = load_image("before.png", ColorMode::Rgb)?;
//! save_png("copy.png", &img)?;
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::{DynamicImage, ExtendedColorType, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::Image;

/// Channel layout applied when decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Always decode to 3-channel RGB, dropping alpha and expanding gray.
    #[default]
    Rgb,
    /// Keep the file's own layout (gray, gray+alpha, RGB or RGBA).
    Native,
}

impl FromStr for ColorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rgb" => Ok(Self::Rgb),
            "native" => Ok(Self::Native),
            other => Err(Error::InvalidColorMode(other.to_string())),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb => write!(f, "rgb"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// Decode an image file.
///
/// The format is sniffed from the file contents, not the extension.
pub fn load_image(path: impl AsRef<Path>, mode: ColorMode) -> Result<Image> {
    let path = path.as_ref();
    let load_err = |reason: String| Error::ImageLoad {
        path: path.to_path_buf(),
        reason,
    };

    let decoded = ImageReader::open(path)
        .map_err(|e| load_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| load_err(e.to_string()))?
        .decode()
        .map_err(|e| load_err(e.to_string()))?;

    tracing::debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded image"
    );

    from_dynamic(decoded, mode)
}

/// Convert a decoded `image` buffer into an [`Image`].
pub fn from_dynamic(decoded: DynamicImage, mode: ColorMode) -> Result<Image> {
    let width = decoded.width() as usize;
    let height = decoded.height() as usize;

    let (data, channels) = match mode {
        ColorMode::Rgb => (decoded.into_rgb8().into_raw(), 3),
        ColorMode::Native => match decoded.color().channel_count() {
            1 => (decoded.into_luma8().into_raw(), 1),
            2 => (decoded.into_luma_alpha8().into_raw(), 2),
            3 => (decoded.into_rgb8().into_raw(), 3),
            _ => (decoded.into_rgba8().into_raw(), 4),
        },
    };

    Image::new(data, width, height, channels)
}

/// Encode an image as PNG, regardless of the extension of `path`.
pub fn save_png(path: impl AsRef<Path>, img: &Image) -> Result<()> {
    let path = path.as_ref();
    let color = match img.channels() {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        n => return Err(Error::UnsupportedChannels(n)),
    };

    image::save_buffer_with_format(
        path,
        img.as_bytes(),
        img.width() as u32,
        img.height() as u32,
        color,
        ImageFormat::Png,
    )
    .map_err(|e| Error::ImageSave {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_color_mode_parse() {
        assert_eq!("rgb".parse::<ColorMode>().unwrap(), ColorMode::Rgb);
        assert_eq!("native".parse::<ColorMode>().unwrap(), ColorMode::Native);
        let err = "hsv".parse::<ColorMode>().unwrap_err();
        assert!(matches!(&err, Error::InvalidColorMode(name) if name == "hsv"));
        assert_eq!(err.to_string(), "Invalid color mode: hsv (expected rgb or native)");
        assert_eq!(ColorMode::Native.to_string(), "native");
    }

    #[test]
    fn test_png_roundtrip_keeps_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray_alpha.png");
        let img = Image::new(vec![10, 255, 200, 128, 0, 0, 77, 1], 2, 2, 2).unwrap();

        save_png(&path, &img).unwrap();

        let native = load_image(&path, ColorMode::Native).unwrap();
        assert_eq!(native, img);

        let rgb = load_image(&path, ColorMode::Rgb).unwrap();
        assert_eq!(rgb.channels(), 3);
        assert_eq!(&rgb.as_bytes()[..6], &[10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_image(dir.path().join("nope.png"), ColorMode::Rgb);
        assert!(matches!(result, Err(Error::ImageLoad { .. })));
    }

    #[test]
    fn test_load_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(matches!(
            load_image(&path, ColorMode::Rgb),
            Err(Error::ImageLoad { .. })
        ));
    }
}
