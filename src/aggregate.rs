//! Filtering comparison results by score.
//!
//! `aggregate` walks the result directories produced by `png-compare`,
//! keeps the ones whose score passes a [`ScoreFilter`], and copies a chosen
//! subset of their files into a mirrored tree under a separate output root.
//!
//! ## Example
//!
//! ```rust,ignore
//! use png_compare::aggregate::{AggregateConfig, ScoreFilter, run};
//!
//! let config = AggregateConfig::builder()
//!     .input_dir("./results")
//!     .output_dir("./regressions")
//!     .filter(ScoreFilter::Less)
//!     .threshold(99.5)
//!     .build();
//!
//! let report = run(&config, &std::env::args().collect::<Vec<_>>())?;
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::publish::{is_transient_dir, ABSDIFF_HSV_FILE, ABSDIFF_RGB_FILE, MASK_FILE};
use crate::record::{ResultRecord, RECORD_FILE};

/// File recording the command line of the last run, in the output root.
pub const COMMAND_FILE: &str = "command.txt";

/// Which side of the threshold to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreFilter {
    /// Keep `score <= threshold`.
    #[default]
    Less,
    /// Keep `score >= threshold`.
    More,
}

impl ScoreFilter {
    /// Whether `score` passes this filter.
    #[must_use]
    pub fn accepts(self, score: f64, threshold: f64) -> bool {
        match self {
            Self::Less => score <= threshold,
            Self::More => score >= threshold,
        }
    }
}

impl FromStr for ScoreFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "less" => Ok(Self::Less),
            "more" => Ok(Self::More),
            other => Err(Error::InvalidFilter(other.to_string())),
        }
    }
}

impl fmt::Display for ScoreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Less => write!(f, "less"),
            Self::More => write!(f, "more"),
        }
    }
}

/// Which difference images to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSelection {
    /// `absdiff_rgb.png`.
    pub rgb: bool,
    /// `absdiff_hsv.png`.
    pub hsv: bool,
    /// `threshold_mask.png`.
    pub mask: bool,
}

impl Default for DiffSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl DiffSelection {
    /// Every difference image.
    #[must_use]
    pub fn all() -> Self {
        Self {
            rgb: true,
            hsv: true,
            mask: true,
        }
    }

    /// Parse a comma separated list such as `rgb,mask`.
    ///
    /// Unknown entries are logged and ignored. A list with no valid entry
    /// selects everything.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        let mut selection = Self {
            rgb: false,
            hsv: false,
            mask: false,
        };
        for token in list.split(',') {
            match token.trim() {
                "rgb" => selection.rgb = true,
                "hsv" => selection.hsv = true,
                "mask" => selection.mask = true,
                "" => {}
                other => tracing::warn!("Invalid diff flag option {other}"),
            }
        }
        if selection.is_empty() {
            Self::all()
        } else {
            selection
        }
    }

    /// True when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.rgb || self.hsv || self.mask)
    }

    /// Selected file names in copy order.
    #[must_use]
    pub fn files(&self) -> Vec<&'static str> {
        [
            (self.rgb, ABSDIFF_RGB_FILE),
            (self.hsv, ABSDIFF_HSV_FILE),
            (self.mask, MASK_FILE),
        ]
        .into_iter()
        .filter_map(|(on, file)| on.then_some(file))
        .collect()
    }
}

/// Configuration for an aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Directory holding `png-compare` result directories.
    pub input_dir: PathBuf,
    /// Root of the mirrored output tree.
    pub output_dir: PathBuf,
    /// Which side of the threshold to keep.
    pub filter: ScoreFilter,
    /// Score threshold (0-100).
    pub threshold: f64,
    /// Difference images to copy.
    pub diffs: DiffSelection,
    /// Copy the renamed source images too.
    pub include_inputs: bool,
    /// Plan only, never touch the disk.
    pub dry_run: bool,
}

impl AggregateConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> AggregateConfigBuilder {
        AggregateConfigBuilder::default()
    }
}

/// Builder for [`AggregateConfig`].
#[derive(Debug, Default)]
pub struct AggregateConfigBuilder {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    filter: Option<ScoreFilter>,
    threshold: Option<f64>,
    diffs: Option<DiffSelection>,
    include_inputs: Option<bool>,
    dry_run: bool,
}

impl AggregateConfigBuilder {
    /// Set the directory to scan.
    #[must_use]
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    /// Set the output root.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the score filter direction.
    #[must_use]
    pub fn filter(mut self, filter: ScoreFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the score threshold.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set which difference images to copy.
    #[must_use]
    pub fn diffs(mut self, diffs: DiffSelection) -> Self {
        self.diffs = Some(diffs);
        self
    }

    /// Whether to copy the renamed source images.
    #[must_use]
    pub fn include_inputs(mut self, include: bool) -> Self {
        self.include_inputs = Some(include);
        self
    }

    /// Enable dry-run mode.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Build the configuration.
    ///
    /// Unset directories default to the current directory and `./aggregate`.
    #[must_use]
    pub fn build(self) -> AggregateConfig {
        AggregateConfig {
            input_dir: self.input_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("./aggregate")),
            filter: self.filter.unwrap_or_default(),
            threshold: self.threshold.unwrap_or(100.0),
            diffs: self.diffs.unwrap_or_default(),
            include_inputs: self.include_inputs.unwrap_or(true),
            dry_run: self.dry_run,
        }
    }
}

/// A result directory and its parsed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    /// The result directory.
    pub dir: PathBuf,
    /// Parsed `info.txt`.
    pub record: ResultRecord,
}

/// Files to copy out of one qualifying result directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyPlan {
    /// Source result directory.
    pub source_dir: PathBuf,
    /// Mirrored directory under the output root.
    pub target_dir: PathBuf,
    /// File names relative to both directories.
    pub files: Vec<String>,
    /// The record that qualified this directory.
    pub record: ResultRecord,
}

/// One filesystem step of an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Create a missing target directory.
    CreateDir(PathBuf),
    /// Copy a file.
    Copy {
        /// Source file.
        from: PathBuf,
        /// Destination file.
        to: PathBuf,
    },
    /// Target is at least as new as the source; left alone.
    UpToDate(PathBuf),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir(dir) => write!(f, "Create directory {}", dir.display()),
            Self::Copy { from, to } => write!(f, "Copy {} to {}", from.display(), to.display()),
            Self::UpToDate(path) => write!(f, "Up to date {}", path.display()),
        }
    }
}

/// What an aggregation run did (or would do, in dry-run mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Result directories that passed the filter.
    pub selected: Vec<CopyPlan>,
    /// Filesystem steps in execution order.
    pub actions: Vec<Action>,
    /// Whether `command.txt` was written.
    pub command_recorded: bool,
}

impl AggregateReport {
    /// Number of files copied.
    #[must_use]
    pub fn files_copied(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Copy { .. }))
            .count()
    }
}

/// Read the records of every result directory directly under `input_dir`.
///
/// In-flight staging and stale directories of a concurrent publish are
/// skipped. Directories without a readable record are logged and skipped.
/// Entries are sorted by directory path.
pub fn scan_results(input_dir: &Path) -> Result<Vec<ResultEntry>> {
    if !input_dir.is_dir() {
        return Err(Error::NotADirectory(input_dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let dir = entry?.path();
        if !dir.is_dir() || is_transient_dir(&dir) {
            continue;
        }

        let info_file = dir.join(RECORD_FILE);
        if !info_file.is_file() {
            tracing::warn!("Couldn't find {}", info_file.display());
            continue;
        }
        match ResultRecord::read(&info_file) {
            Ok(record) => entries.push(ResultEntry { dir, record }),
            Err(e) => tracing::warn!("Failed to read file {}: {e}", info_file.display()),
        }
    }

    entries.sort_by(|a, b| a.dir.cmp(&b.dir));
    tracing::debug!(count = entries.len(), "scanned result directories");
    Ok(entries)
}

/// Build copy plans for the entries that pass the configured filter.
#[must_use]
pub fn select(entries: &[ResultEntry], config: &AggregateConfig) -> Vec<CopyPlan> {
    entries
        .iter()
        .filter(|e| config.filter.accepts(e.record.score, config.threshold))
        .map(|e| {
            let mut files = vec![RECORD_FILE.to_string()];
            files.extend(config.diffs.files().into_iter().map(str::to_string));
            if config.include_inputs {
                files.push(e.record.name1.clone());
                files.push(e.record.name2.clone());
            }

            let name = e.dir.file_name().map(PathBuf::from).unwrap_or_default();
            CopyPlan {
                source_dir: e.dir.clone(),
                target_dir: config.output_dir.join(name),
                files,
                record: e.record.clone(),
            }
        })
        .collect()
}

fn is_up_to_date(source: &Path, target: &Path) -> Result<bool> {
    let Ok(target_meta) = fs::metadata(target) else {
        return Ok(false);
    };
    let source_modified = fs::metadata(source)?.modified()?;
    Ok(target_meta.modified()? >= source_modified)
}

/// Carry out copy plans.
///
/// Existing targets are only overwritten when the source is newer. After
/// the copies, `command.txt` in the output root receives the command line,
/// once per run, and only if at least one directory qualified. In dry-run
/// mode the actions are only collected.
pub fn execute(
    plans: Vec<CopyPlan>,
    config: &AggregateConfig,
    command_line: &[String],
) -> Result<AggregateReport> {
    let mut actions = Vec::new();

    for plan in &plans {
        if !plan.target_dir.is_dir() {
            if !config.dry_run {
                fs::create_dir_all(&plan.target_dir)?;
            }
            actions.push(Action::CreateDir(plan.target_dir.clone()));
        }

        for file in &plan.files {
            let from = plan.source_dir.join(file);
            let to = plan.target_dir.join(file);

            if config.dry_run {
                actions.push(Action::Copy { from, to });
                continue;
            }
            if is_up_to_date(&from, &to).map_err(|e| copy_error(&from, &to, e))? {
                actions.push(Action::UpToDate(to));
                continue;
            }
            fs::copy(&from, &to).map_err(|source| Error::Copy {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            tracing::debug!("Copied {} to {}", from.display(), to.display());
            actions.push(Action::Copy { from, to });
        }
    }

    let command_recorded = !config.dry_run && !plans.is_empty();
    if command_recorded {
        write_command_file(&config.output_dir, command_line)?;
    }

    Ok(AggregateReport {
        selected: plans,
        actions,
        command_recorded,
    })
}

fn copy_error(from: &Path, to: &Path, err: Error) -> Error {
    match err {
        Error::Io(source) => Error::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        },
        other => other,
    }
}

/// Write `Command used: <args...>` to `command.txt` under `output_dir`.
pub fn write_command_file(output_dir: &Path, command_line: &[String]) -> Result<()> {
    let mut text = String::from("Command used: ");
    for arg in command_line {
        text.push_str(arg);
        text.push(' ');
    }
    fs::write(output_dir.join(COMMAND_FILE), text)?;
    Ok(())
}

/// Write the records of the selected directories as a JSON array.
pub fn write_summary(report: &AggregateReport, path: &Path) -> Result<()> {
    let records: Vec<&ResultRecord> = report.selected.iter().map(|p| &p.record).collect();
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(path, json)?;
    Ok(())
}

/// Scan, filter and copy in one go.
pub fn run(config: &AggregateConfig, command_line: &[String]) -> Result<AggregateReport> {
    let entries = scan_results(&config.input_dir)?;
    let plans = select(&entries, config);
    tracing::info!(
        scanned = entries.len(),
        selected = plans.len(),
        filter = %config.filter,
        threshold = config.threshold,
        "filtered results"
    );
    execute(plans, config, command_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_result(root: &Path, name: &str, score: f64) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let (a, b) = name.split_once('-').unwrap();
        let record = ResultRecord::new(format!("{a}_rgb.png"), format!("{b}_rgb.png"), score);
        record.write(dir.join(RECORD_FILE)).unwrap();
        for file in [
            ABSDIFF_RGB_FILE,
            ABSDIFF_HSV_FILE,
            MASK_FILE,
            record.name1.as_str(),
            record.name2.as_str(),
        ] {
            fs::write(dir.join(file), name).unwrap();
        }
        dir
    }

    fn args() -> Vec<String> {
        vec!["aggregate".into(), "-i".into(), "in".into(), "-o".into(), "out".into()]
    }

    #[test]
    fn test_score_filter() {
        assert!(ScoreFilter::Less.accepts(99.0, 99.0));
        assert!(ScoreFilter::Less.accepts(10.0, 99.0));
        assert!(!ScoreFilter::Less.accepts(99.5, 99.0));
        assert!(ScoreFilter::More.accepts(99.0, 99.0));
        assert!(!ScoreFilter::More.accepts(98.0, 99.0));
        assert_eq!("more".parse::<ScoreFilter>().unwrap(), ScoreFilter::More);
        assert!(matches!("above".parse::<ScoreFilter>(), Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn test_diff_selection_parse() {
        let sel = DiffSelection::parse("rgb,mask");
        assert_eq!(sel.files(), vec![ABSDIFF_RGB_FILE, MASK_FILE]);
        assert_eq!(DiffSelection::parse("hsv,bogus").files(), vec![ABSDIFF_HSV_FILE]);
        assert_eq!(DiffSelection::parse("bogus"), DiffSelection::all());
        assert_eq!(DiffSelection::parse(""), DiffSelection::all());
    }

    #[test]
    fn test_scan_skips_transient_and_broken() {
        let input = TempDir::new().unwrap();
        fake_result(input.path(), "b-c", 50.0);
        fake_result(input.path(), "a-b", 90.0);
        fake_result(input.path(), ".png-compare-staging-a-b-1", 10.0);
        fake_result(input.path(), ".png-compare-stale-a-b-1", 10.0);
        fs::create_dir(input.path().join("norecord")).unwrap();
        let broken = input.path().join("broken");
        fs::create_dir(&broken).unwrap();
        fs::write(broken.join(RECORD_FILE), "\"only-one\"").unwrap();
        fs::write(input.path().join("stray.txt"), "x").unwrap();

        let entries = scan_results(input.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.dir.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-b", "b-c"]);
        assert_eq!(entries[0].record.score, 90.0);
    }

    #[test]
    fn test_scan_finds_dot_prefixed_stems() {
        use crate::compare::{compare_files, CompareConfig};
        use crate::imageio::save_png;
        use crate::raster::Image;

        let inputs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let baseline = inputs.path().join(".baseline.png");
        let actual = inputs.path().join("actual.png");
        save_png(&baseline, &Image::filled(16, 16, &[9, 9, 9]).unwrap()).unwrap();
        save_png(&actual, &Image::filled(16, 16, &[9, 9, 9]).unwrap()).unwrap();

        let cmp = compare_files(&baseline, &actual, out.path(), &CompareConfig::default()).unwrap();
        assert_eq!(cmp.result_dir, out.path().join(".baseline-actual"));

        let entries = scan_results(out.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dir, cmp.result_dir);
        assert_eq!(entries[0].record.name1, ".baseline_rgb.png");
    }

    #[test]
    fn test_scan_requires_directory() {
        let input = TempDir::new().unwrap();
        let file = input.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(matches!(scan_results(&file), Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_select_file_order() {
        let input = TempDir::new().unwrap();
        fake_result(input.path(), "a-b", 42.0);
        let entries = scan_results(input.path()).unwrap();

        let config = AggregateConfig::builder()
            .output_dir("/out")
            .diffs(DiffSelection::parse("mask,rgb"))
            .build();
        let plans = select(&entries, &config);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].target_dir, PathBuf::from("/out/a-b"));
        assert_eq!(
            plans[0].files,
            vec!["info.txt", "absdiff_rgb.png", "threshold_mask.png", "a_rgb.png", "b_rgb.png"]
        );

        let no_inputs = AggregateConfig::builder().include_inputs(false).build();
        assert_eq!(select(&entries, &no_inputs)[0].files.len(), 4);

        let strict = AggregateConfig::builder().threshold(40.0).build();
        assert!(select(&entries, &strict).is_empty());
    }

    #[test]
    fn test_run_copies_and_records_command() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fake_result(input.path(), "a-b", 80.0);
        fake_result(input.path(), "c-d", 99.9);

        let config = AggregateConfig::builder()
            .input_dir(input.path())
            .output_dir(output.path())
            .threshold(95.0)
            .build();
        let report = run(&config, &args()).unwrap();

        assert_eq!(report.selected.len(), 1);
        assert_eq!(report.files_copied(), 6);
        assert!(report.command_recorded);

        let mirrored = output.path().join("a-b");
        for file in &report.selected[0].files {
            assert!(mirrored.join(file).is_file(), "missing {file}");
        }
        assert!(!output.path().join("c-d").exists());
        let command = fs::read_to_string(output.path().join(COMMAND_FILE)).unwrap();
        assert_eq!(command, "Command used: aggregate -i in -o out ");

        // Second run: everything already up to date.
        let again = run(&config, &args()).unwrap();
        assert_eq!(again.files_copied(), 0);
        assert!(again.actions.iter().all(|a| matches!(a, Action::UpToDate(_))));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fake_result(input.path(), "a-b", 10.0);

        let config = AggregateConfig::builder()
            .input_dir(input.path())
            .output_dir(output.path())
            .dry_run(true)
            .build();
        let report = run(&config, &args()).unwrap();

        assert!(!report.command_recorded);
        assert_eq!(report.actions[0], Action::CreateDir(output.path().join("a-b")));
        assert_eq!(report.files_copied(), 6);
        assert!(report.actions[1].to_string().starts_with("Copy "));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_no_match_writes_no_command_file() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fake_result(input.path(), "a-b", 100.0);

        let config = AggregateConfig::builder()
            .input_dir(input.path())
            .output_dir(output.path())
            .filter(ScoreFilter::Less)
            .threshold(50.0)
            .build();
        let report = run(&config, &args()).unwrap();
        assert!(report.selected.is_empty());
        assert!(!output.path().join(COMMAND_FILE).exists());
    }

    #[test]
    fn test_write_summary() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fake_result(input.path(), "a-b", 12.5);
        fake_result(input.path(), "c-d", 99.0);

        let config = AggregateConfig::builder()
            .input_dir(input.path())
            .output_dir(output.path())
            .threshold(50.0)
            .dry_run(true)
            .build();
        let report = run(&config, &args()).unwrap();
        let summary = output.path().join("summary.json");
        write_summary(&report, &summary).unwrap();

        let records: Vec<ResultRecord> =
            serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(records, vec![ResultRecord::new("a_rgb.png", "b_rgb.png", 12.5)]);
    }

    #[test]
    fn test_missing_source_file_is_copy_error() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let dir = fake_result(input.path(), "a-b", 10.0);
        fs::remove_file(dir.join("b_rgb.png")).unwrap();

        let config = AggregateConfig::builder()
            .input_dir(input.path())
            .output_dir(output.path())
            .build();
        assert!(matches!(run(&config, &args()), Err(Error::Copy { .. })));
    }
}
