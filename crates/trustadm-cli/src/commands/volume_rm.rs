//! `trustadm volume rm` implementation
//!
//! ```bash
//! trustadm volume rm hello
//! hello
//! ```

use std::io;

use anyhow::Result;
use trustadm_core::{Endpoint, HttpEngineClient, remove_volumes};

use crate::cli::VolumeRmArgs;
use crate::error::CliError;

/// Remove volumes through the configured engine, printing each removed name.
///
/// # Errors
///
/// Returns every removal failure, one per line, after all volumes were tried.
pub async fn run(args: &VolumeRmArgs, endpoint: &Endpoint) -> Result<()> {
    let client = HttpEngineClient::new(&endpoint.engine_host, endpoint.timeout)
        .map_err(CliError::from_core)?;
    let mut stdout = io::stdout();
    remove_volumes(&client, &args.volumes, args.force, &mut stdout)
        .await
        .map_err(|e| CliError::from_core(e).into())
}
