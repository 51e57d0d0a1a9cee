//! Shared plumbing for the `png-compare` and `aggregate` binaries.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise library messages are shown at info
/// level, or debug with `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "png_compare=debug,png_compare_cli=debug"
    } else {
        "png_compare=info,png_compare_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

/// Parse arguments, mapping usage errors to exit code 1.
///
/// `--help` and `--version` still print and exit successfully.
pub fn parse_args<T: Parser>() -> Result<T, ExitCode> {
    T::try_parse().map_err(|err| {
        let code = if err.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
        // Nothing useful to do if the terminal is gone.
        let _ = err.print();
        code
    })
}

/// Report a failed run and turn it into exit code 1.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    tracing::error!("{err:#}");
    ExitCode::FAILURE
}
