//! aggregate CLI - filter png-compare results by similarity score

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use png_compare::aggregate::{self, AggregateConfig, AggregateReport, DiffSelection, ScoreFilter};
use png_compare_cli::{init_logging, parse_args, report_failure};

/// Filters results created by png-compare based on similarity score.
#[derive(Parser, Debug)]
#[command(name = "aggregate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing image comparison results
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory to store aggregate results in
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only include outputs with a score above/below 'threshold' (less, more)
    #[arg(short, long, default_value = "less")]
    score_filter: String,

    /// Comma separated list of diff image types to include (rgb, hsv, mask)
    #[arg(short, long, default_value = "rgb,hsv,mask")]
    diff_flags: String,

    /// Score threshold to compare against
    #[arg(short, long, default_value_t = 100.0)]
    threshold: f64,

    /// Exclude source input images (only computed diff images are copied)
    #[arg(long)]
    exclude_inputs: bool,

    /// Print copy actions without actually copying
    #[arg(long)]
    dry_run: bool,

    /// Write the selected records as JSON to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli, input: PathBuf, output: PathBuf) -> Result<AggregateConfig> {
    let filter: ScoreFilter = match cli.score_filter.parse() {
        Ok(filter) => filter,
        Err(err) => {
            // Usage goes to stdout next to the message, as for --help.
            println!("{}", Cli::command().render_help());
            return Err(err.into());
        }
    };

    if !input.is_dir() {
        bail!("Invalid directory: {}", input.display());
    }

    Ok(AggregateConfig::builder()
        .input_dir(input)
        .output_dir(output)
        .filter(filter)
        .threshold(cli.threshold)
        .diffs(DiffSelection::parse(&cli.diff_flags))
        .include_inputs(!cli.exclude_inputs)
        .dry_run(cli.dry_run)
        .build())
}

fn write_summary(report: &AggregateReport, path: &Path) -> Result<()> {
    aggregate::write_summary(report, path)
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    tracing::info!("Saved summary to: {}", path.display());
    Ok(())
}

fn run(cli: &Cli, input: PathBuf, output: PathBuf) -> Result<()> {
    let config = build_config(cli, input, output)?;
    let command_line: Vec<String> = std::env::args().collect();

    let report = aggregate::run(&config, &command_line).context("Aggregation failed")?;

    if config.dry_run {
        for action in &report.actions {
            println!("{action}");
        }
    }
    tracing::info!(
        "{} of the scanned results matched, {} files copied",
        report.selected.len(),
        report.files_copied()
    );

    if let Some(path) = &cli.summary {
        write_summary(&report, path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    init_logging(cli.verbose);

    let (Some(input), Some(output)) = (cli.input.clone(), cli.output.clone()) else {
        println!("{}", Cli::command().render_help());
        return ExitCode::SUCCESS;
    };

    match run(&cli, input, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}
