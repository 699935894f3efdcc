//! # CLI Structure and Argument Parsing
//!
//! The command tree mirrors the objects being administered:
//!
//! ```bash
//! # Remove a signer from one or more repositories
//! trustadm trust signer remove alice registry.example.com/team/app team/worker
//!
//! # Skip the last-signer confirmation
//! trustadm trust signer remove --force alice team/app
//!
//! # Remove volumes
//! trustadm volume rm data cache
//! ```
//!
//! Global options (`--verbose`, `--quiet`, `--no-color`, `--config`,
//! `--context`) may appear anywhere on the command line.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the `trustadm` command
#[derive(Parser, Clone, Debug)]
#[command(name = "trustadm")]
#[command(version)]
#[command(about = "trustadm - content-trust signer and volume administration", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also honors `NO_COLOR`)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the configuration file
    #[arg(long, global = true, env = "TRUSTADM_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Named context to use instead of `current_context`
    #[arg(short = 'c', long, global = true, env = "TRUSTADM_CONTEXT")]
    pub context: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Manage trust on images
    Trust {
        #[command(subcommand)]
        command: TrustCommands,
    },

    /// Manage volumes
    Volume {
        #[command(subcommand)]
        command: VolumeCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum TrustCommands {
    /// Manage entities who can sign images
    Signer {
        #[command(subcommand)]
        command: SignerCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SignerCommands {
    /// Remove a signer from one or more repositories
    Remove(SignerRemoveArgs),
}

#[derive(Args, Clone, Debug)]
pub struct SignerRemoveArgs {
    /// Do not prompt for confirmation before removing the most recent signer
    #[arg(
        short = 'f',
        long = "force",
        visible_short_alias = 'y',
        visible_alias = "yes"
    )]
    pub force: bool,

    /// Signer to remove
    #[arg(value_name = "SIGNER")]
    pub signer: String,

    /// Repositories to remove the signer from
    #[arg(value_name = "REPOSITORY", required = true, num_args = 1..)]
    pub repositories: Vec<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum VolumeCommands {
    /// Remove one or more volumes
    #[command(alias = "remove")]
    Rm(VolumeRmArgs),
}

#[derive(Args, Clone, Debug)]
pub struct VolumeRmArgs {
    /// Force the removal of one or more volumes
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Volumes to remove
    #[arg(value_name = "VOLUME", required = true, num_args = 1..)]
    pub volumes: Vec<String>,
}
