//! trustadm CLI - content-trust signer and volume administration
//!
//! This is the library behind the `trustadm` binary. Command implementations
//! live in separate modules; this file wires parsing, logging, configuration
//! and cancellation together.
use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use trustadm_core::Config;

mod cli;
mod commands;
pub mod error;
mod utils;

use crate::error::{ErrorCategory, IntoCliError};
use crate::utils::initialize_logging;
use cli::{Cli, Commands, SignerCommands, TrustCommands, VolumeCommands};

/// Execute the trustadm CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns an error if configuration loading or command execution fails.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    let config =
        Config::load(cli.config.as_deref()).map_err(|e| e.with_category(ErrorCategory::Usage))?;
    let endpoint = config
        .resolve(cli.context.as_deref())
        .map_err(|e| e.with_category(ErrorCategory::Usage))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight operation (press Ctrl-C again to exit)");
            interrupt.cancel();
        }
        // A pending confirmation prompt blocks on stdin and never sees the token.
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    match cli.command {
        Commands::Trust {
            command:
                TrustCommands::Signer {
                    command: SignerCommands::Remove(args),
                },
        } => commands::signer_remove::run(&args, &endpoint, cancel).await,
        Commands::Volume {
            command: VolumeCommands::Rm(args),
        } => commands::volume_rm::run(&args, &endpoint).await,
    }
}
