//! `trustadm trust signer remove` implementation

use std::io::{self, Write};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use trustadm_core::{
    Confirm, Endpoint, FileTrustStore, ReaderConfirm, RemovalOutcome, SignerRemoval, TrustClient,
};

use crate::cli::SignerRemoveArgs;
use crate::error::{CliError, ErrorCategory};

/// Remove a signer using the configured trust store and terminal IO.
///
/// # Errors
///
/// Returns an error naming every repository the signer could not be removed from.
pub async fn run(
    args: &SignerRemoveArgs,
    endpoint: &Endpoint,
    cancel: CancellationToken,
) -> Result<()> {
    let store = FileTrustStore::new(&endpoint.trust_dir);
    execute(
        &store,
        ReaderConfirm::stdin(),
        io::stdout(),
        io::stderr(),
        args,
        cancel,
    )
    .await
}

/// Core signer removal with injectable trust client, prompt and streams.
///
/// The returned error carries the category shared by all failed
/// repositories, so the exit code reflects why the batch failed.
///
/// # Errors
///
/// Returns an error if any repository failed or an output stream broke.
pub async fn execute<C, P, O, E>(
    client: &C,
    confirm: P,
    out: O,
    err: E,
    args: &SignerRemoveArgs,
    cancel: CancellationToken,
) -> Result<()>
where
    C: TrustClient + ?Sized,
    P: Confirm,
    O: Write,
    E: Write,
{
    let mut removal = SignerRemoval::new(client, confirm, out, err).with_cancellation(cancel);
    let report = removal
        .remove_signer_report(&args.signer, &args.repositories, args.force)
        .await
        .map_err(CliError::from_core)?;

    let category = ErrorCategory::common(report.entries().iter().filter_map(|entry| {
        match &entry.outcome {
            RemovalOutcome::Failed(e) => Some(e),
            RemovalOutcome::Removed | RemovalOutcome::Declined => None,
        }
    }));
    report
        .into_result()
        .map_err(|e| CliError::new(category, e).into())
}
