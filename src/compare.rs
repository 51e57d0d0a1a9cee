//! One image pair, start to finish: load, score, diff, publish.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diff::DiffArtifacts;
use crate::error::Result;
use crate::imageio::{load_image, ColorMode};
use crate::metrics::similarity_score;
use crate::publish::{path_stem, publish, ResultBundle};
use crate::raster::Image;
use crate::record::ResultRecord;

/// Settings for a comparison run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Channel layout used when decoding the inputs.
    pub color_mode: ColorMode,
}

impl CompareConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> CompareConfigBuilder {
        CompareConfigBuilder::default()
    }
}

/// Builder for [`CompareConfig`].
#[derive(Debug, Default)]
pub struct CompareConfigBuilder {
    color_mode: Option<ColorMode>,
}

impl CompareConfigBuilder {
    /// Set the decode color mode.
    #[must_use]
    pub fn color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = Some(mode);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> CompareConfig {
        CompareConfig {
            color_mode: self.color_mode.unwrap_or_default(),
        }
    }
}

/// Outcome of [`compare_files`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    /// The record written to `info.txt`.
    pub record: ResultRecord,
    /// Published result directory.
    pub result_dir: PathBuf,
    /// Pixels flagged in the change mask.
    pub changed_pixels: usize,
}

/// Score and diff two decoded images without touching the disk.
pub fn compare_images(a: &Image, b: &Image) -> Result<(f64, DiffArtifacts)> {
    tracing::info!("Computing SSIM...");
    let score = similarity_score(a, b)?;
    tracing::info!("Computing deltas...");
    let artifacts = DiffArtifacts::compute(a, b)?;
    Ok((score, artifacts))
}

/// Compare two image files and publish the result under `output_root`.
///
/// `output_root` must exist. Invalid pairs (size or channel mismatch) fail
/// before anything is written.
pub fn compare_files(
    path1: &Path,
    path2: &Path,
    output_root: &Path,
    config: &CompareConfig,
) -> Result<Comparison> {
    let image1 = load_image(path1, config.color_mode)?;
    let image2 = load_image(path2, config.color_mode)?;

    let (score, artifacts) = compare_images(&image1, &image2)?;

    let stem1 = path_stem(path1);
    let stem2 = path_stem(path2);
    let bundle = ResultBundle {
        stem1: &stem1,
        stem2: &stem2,
        image1: &image1,
        image2: &image2,
        artifacts: &artifacts,
        score,
    };
    let result_dir = publish(output_root, &bundle)?;
    tracing::info!(dir = %result_dir.display(), score, "Done.");

    Ok(Comparison {
        record: bundle.record(),
        result_dir,
        changed_pixels: artifacts.changed_pixels(),
    })
}
