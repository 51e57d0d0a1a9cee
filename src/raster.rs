//! In-memory 8-bit raster images.
//!
//! An [`Image`] is an immutable, row-major, interleaved buffer with one to
//! four channels. Per-channel planes are handed out as [`ImgVec<u8>`] so the
//! metric code can work on a single channel at a time.

use imgref::ImgVec;
use rgb::RGB8;

use crate::error::{Error, Result};

/// Largest channel count an [`Image`] may carry (RGBA).
pub const MAX_CHANNELS: usize = 4;

/// An 8-bit image with 1-4 interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Image {
    /// Wrap an interleaved pixel buffer.
    ///
    /// Fails if the dimensions are zero, the channel count is outside 1-4, or
    /// the buffer length does not equal `width * height * channels`.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Result<Self> {
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(Error::UnsupportedChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage(format!(
                "zero-sized image ({width}x{height})"
            )));
        }
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "buffer holds {} bytes, {width}x{height}x{channels} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Assemble an image from a buffer already known to be well formed.
    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Image filled with a single pixel value.
    ///
    /// `pixel.len()` determines the channel count.
    pub fn filled(width: usize, height: usize, pixel: &[u8]) -> Result<Self> {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width * height * pixel.len())
            .collect();
        Self::new(data, width, height, pixel.len())
    }

    /// Image width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of interleaved channels.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Raw interleaved bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Iterator over pixels as channel slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.channels)
    }

    /// Extract one channel as a plane.
    #[must_use]
    pub fn plane(&self, channel: usize) -> ImgVec<u8> {
        assert!(channel < self.channels, "channel {channel} out of range");
        let buf = self.pixels().map(|px| px[channel]).collect();
        ImgVec::new(buf, self.width, self.height)
    }

    /// Split into one plane per channel.
    #[must_use]
    pub fn split_channels(&self) -> Vec<ImgVec<u8>> {
        (0..self.channels).map(|c| self.plane(c)).collect()
    }

    /// Color view of every pixel, ignoring alpha.
    ///
    /// Gray inputs (1 or 2 channels) are expanded to `R = G = B`.
    pub fn rgb_pixels(&self) -> impl Iterator<Item = RGB8> + '_ {
        let channels = self.channels;
        self.pixels().map(move |px| {
            if channels >= 3 {
                RGB8::new(px[0], px[1], px[2])
            } else {
                RGB8::new(px[0], px[0], px[0])
            }
        })
    }

    /// Fail unless `other` has the same dimensions and channel count.
    pub fn ensure_same_shape(&self, other: &Image) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        if self.channels != other.channels {
            return Err(Error::ChannelMismatch {
                expected: self.channels,
                actual: other.channels,
            });
        }
        Ok(())
    }
}
