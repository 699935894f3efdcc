//! Logging initialization and color control.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;

/// Pick the log level for the global verbosity flags.
pub const fn log_level(verbose: bool, quiet: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Initialize the logging subsystem based on CLI flags.
///
/// Logs go to stderr so stdout only carries command output.
///
/// # Errors
///
/// Returns an error if the global tracing subscriber cannot be set.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(cli.verbose, cli.quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let env_no_color = std::env::var_os("NO_COLOR").is_some();
    if cli.no_color || env_no_color {
        color_control::set_override(false);
    }
    Ok(())
}
