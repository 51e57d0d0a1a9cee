//! png-compare CLI - score two images and write diff artifacts

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use png_compare::{compare_files, ColorMode, CompareConfig, Comparison};
use png_compare_cli::{init_logging, parse_args, report_failure};

/// Compute SSIM between two images and store diff images and a change mask.
#[derive(Parser, Debug)]
#[command(name = "png-compare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// First image
    image1: PathBuf,

    /// Second image
    image2: PathBuf,

    /// Directory to store the result directory in
    output_dir: PathBuf,

    /// Decode as 3-channel RGB or keep the file's own channel layout
    #[arg(long, default_value = "rgb", value_parser = parse_color_mode)]
    color_mode: ColorMode,

    /// Print the result record as JSON instead of the similarity line
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_color_mode(s: &str) -> std::result::Result<ColorMode, String> {
    s.parse().map_err(|e: png_compare::Error| e.to_string())
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        tracing::info!("Creating directory {}", dir.display());
        std::fs::create_dir(dir).context("Failed to create output directory!")?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<Comparison> {
    ensure_output_dir(&cli.output_dir)?;

    let config = CompareConfig::builder().color_mode(cli.color_mode).build();
    compare_files(&cli.image1, &cli.image2, &cli.output_dir, &config).with_context(|| {
        format!(
            "Failed to compare {} with {}",
            cli.image1.display(),
            cli.image2.display()
        )
    })
}

fn main() -> ExitCode {
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    init_logging(cli.verbose);

    let comparison = match run(&cli) {
        Ok(comparison) => comparison,
        Err(err) => return report_failure(&err),
    };

    if cli.json {
        match serde_json::to_string_pretty(&comparison) {
            Ok(json) => println!("{json}"),
            Err(err) => return report_failure(&err.into()),
        }
    } else {
        println!("Similarity: {:.2}", comparison.record.score);
    }
    ExitCode::SUCCESS
}
