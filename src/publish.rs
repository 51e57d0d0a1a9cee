//! Writing a comparison into its result directory.
//!
//! Every comparison owns `<output>/<stem1>-<stem2>/`. The directory name is a
//! pure function of the two input stems, so comparing another pair with the
//! same stems replaces the earlier result.
//!
//! Artifacts are first written to a staging directory (named with
//! [`TRANSIENT_PREFIX`]) next to the target and then renamed into place, so readers never observe a half
//! written result directory. An existing result is moved aside before the
//! rename and deleted afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use crate::diff::DiffArtifacts;
use crate::error::Result;
use crate::imageio::save_png;
use crate::raster::Image;
use crate::record::{ResultRecord, RECORD_FILE};

/// Native color difference image.
pub const ABSDIFF_RGB_FILE: &str = "absdiff_rgb.png";
/// HSV difference image.
pub const ABSDIFF_HSV_FILE: &str = "absdiff_hsv.png";
/// Change mask.
pub const MASK_FILE: &str = "threshold_mask.png";

/// Result directory name for two input stems.
#[must_use]
pub fn result_dir_name(stem1: &str, stem2: &str) -> String {
    format!("{stem1}-{stem2}")
}

/// File name of the renamed copy of an input.
#[must_use]
pub fn source_copy_name(stem: &str) -> String {
    format!("{stem}_rgb.png")
}

/// File stem of a path: no parent directories, no extension.
#[must_use]
pub fn path_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Everything that goes into one result directory.
#[derive(Debug, Clone, Copy)]
pub struct ResultBundle<'a> {
    /// Stem of the first input.
    pub stem1: &'a str,
    /// Stem of the second input.
    pub stem2: &'a str,
    /// First input image.
    pub image1: &'a Image,
    /// Second input image.
    pub image2: &'a Image,
    /// Difference images and mask.
    pub artifacts: &'a DiffArtifacts,
    /// Similarity score (0-100).
    pub score: f64,
}

impl ResultBundle<'_> {
    /// The `info.txt` record for this bundle.
    #[must_use]
    pub fn record(&self) -> ResultRecord {
        ResultRecord::new(
            source_copy_name(self.stem1),
            source_copy_name(self.stem2),
            self.score,
        )
    }

    fn write_into(&self, dir: &Path) -> Result<()> {
        let record = self.record();
        save_png(dir.join(&record.name1), self.image1)?;
        save_png(dir.join(&record.name2), self.image2)?;
        save_png(dir.join(ABSDIFF_RGB_FILE), &self.artifacts.native)?;
        save_png(dir.join(ABSDIFF_HSV_FILE), &self.artifacts.hsv)?;
        save_png(dir.join(MASK_FILE), &self.artifacts.mask)?;
        record.write(dir.join(RECORD_FILE))
    }
}

/// Name prefix of the staging and stale directories used while publishing.
///
/// Result directories never start with it, so readers of the output root
/// can tell in-flight directories apart from results whose stem happens to
/// start with a dot.
pub const TRANSIENT_PREFIX: &str = ".png-compare-";

/// Whether `path` is a staging or stale directory of a publish.
#[must_use]
pub fn is_transient_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.starts_with(TRANSIENT_PREFIX))
}

/// Write a bundle under `output_root` and return the published directory.
///
/// `output_root` must already exist. On failure the staging directory is
/// removed and any previous result stays in place.
pub fn publish(output_root: &Path, bundle: &ResultBundle<'_>) -> Result<PathBuf> {
    let name = result_dir_name(bundle.stem1, bundle.stem2);
    publish_with(output_root, &name, |dir| bundle.write_into(dir))
}

fn publish_with(
    output_root: &Path,
    name: &str,
    write: impl FnOnce(&Path) -> Result<()>,
) -> Result<PathBuf> {
    let target = output_root.join(name);
    let pid = std::process::id();
    let staging = output_root.join(format!("{TRANSIENT_PREFIX}staging-{name}-{pid}"));

    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir(&staging)?;

    if let Err(e) = write(&staging) {
        discard(&staging);
        return Err(e);
    }

    if !target.is_dir() {
        if let Err(e) = fs::rename(&staging, &target) {
            discard(&staging);
            return Err(e.into());
        }
        tracing::debug!(dir = %target.display(), "published result");
        return Ok(target);
    }

    tracing::warn!(dir = %target.display(), "Overwriting previous result...");
    let stale = output_root.join(format!("{TRANSIENT_PREFIX}stale-{name}-{pid}"));
    if let Err(e) = move_aside(&target, &stale) {
        discard(&staging);
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staging, &target) {
        if let Err(restore) = fs::rename(&stale, &target) {
            tracing::warn!(
                stale = %stale.display(),
                error = %restore,
                "failed to restore previous result"
            );
        }
        discard(&staging);
        return Err(e.into());
    }

    // The new result is already published here.
    if let Err(e) = fs::remove_dir_all(&stale) {
        tracing::warn!(stale = %stale.display(), error = %e, "failed to remove previous result");
    }

    tracing::debug!(dir = %target.display(), "published result");
    Ok(target)
}

fn move_aside(target: &Path, stale: &Path) -> std::io::Result<()> {
    if stale.exists() {
        fs::remove_dir_all(stale)?;
    }
    fs::rename(target, stale)
}

/// Best-effort removal of a staging directory.
fn discard(staging: &Path) {
    if !staging.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(staging) {
        tracing::warn!(
            staging = %staging.display(),
            error = %e,
            "failed to remove staging directory"
        );
    }
}
