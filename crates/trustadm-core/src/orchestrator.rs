//! Removing a signer from a batch of repositories.
//!
//! Repositories are processed one at a time in the order given. A failure on
//! one repository never stops the batch: its cause is written to the error
//! stream, the repository is recorded in a [`RemovalReport`], and the loop
//! moves on. Duplicated repositories are processed, and can fail, once per
//! occurrence.
//!
//! When a signer is the one whose signature alone satisfies a repository's
//! releases role, removal asks for confirmation first (unless forced). A
//! declined confirmation skips that repository without counting as a
//! failure.
//!
//! ```rust,no_run
//! use trustadm_core::{FixedAnswer, MemoryTrustStore, SignerRemoval};
//!
//! # async fn run() -> trustadm_core::Result<()> {
//! let store = MemoryTrustStore::new();
//! let mut out = Vec::<u8>::new();
//! let mut err = Vec::<u8>::new();
//! let mut removal = SignerRemoval::new(&store, FixedAnswer(false), &mut out, &mut err);
//! removal
//!     .remove_signer("alice", &["library/app".to_string()], false)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::io::Write;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::prompt::Confirm;
use crate::resolver::SignerResolver;
use crate::trust::{TrustClient, cancellable};
use crate::types::RELEASES_ROLE;
use crate::{Error, Result};

/// What happened to one repository in a batch.
#[derive(Debug)]
pub enum RemovalOutcome {
    /// Keys were removed and the change was published.
    Removed,
    /// The user declined the last-signer confirmation.
    Declined,
    /// Removal failed; nothing was published for this repository.
    Failed(Error),
}

impl RemovalOutcome {
    /// Whether this outcome counts against the batch.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome of one repository, in batch order.
#[derive(Debug)]
pub struct RepositoryOutcome {
    /// Repository exactly as it was passed in.
    pub repository: String,
    /// What happened to it.
    pub outcome: RemovalOutcome,
}

/// Accumulated per-repository outcomes of a signer-removal batch.
#[derive(Debug, Default)]
pub struct RemovalReport {
    entries: Vec<RepositoryOutcome>,
}

impl RemovalReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `repository`.
    pub fn record(&mut self, repository: &str, outcome: RemovalOutcome) {
        self.entries.push(RepositoryOutcome {
            repository: repository.to_string(),
            outcome,
        });
    }

    /// All outcomes in the order they were recorded.
    pub fn entries(&self) -> &[RepositoryOutcome] {
        &self.entries
    }

    /// Repositories that were removed from.
    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, RemovalOutcome::Removed))
            .map(|e| e.repository.as_str())
    }

    /// Repositories that failed, in order and with duplicates.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_failure())
            .map(|e| e.repository.as_str())
    }

    /// Fold the report into the batch result.
    ///
    /// Succeeds when no repository failed, including for an empty batch.
    pub fn into_result(self) -> Result<()> {
        let repositories: Vec<String> = self.failed().map(str::to_string).collect();
        if repositories.is_empty() {
            Ok(())
        } else {
            Err(Error::RemovalFailed { repositories })
        }
    }
}

/// Removes signers from repositories, guarding last-signer removals.
pub struct SignerRemoval<'a, C: ?Sized, P, O, E> {
    client: &'a C,
    confirm: P,
    out: O,
    err: E,
    cancel: CancellationToken,
}

impl<'a, C, P, O, E> SignerRemoval<'a, C, P, O, E>
where
    C: TrustClient + ?Sized,
    P: Confirm,
    O: Write,
    E: Write,
{
    /// Create an orchestrator writing progress to `out` and failure causes to `err`.
    pub fn new(client: &'a C, confirm: P, out: O, err: E) -> Self {
        Self {
            client,
            confirm,
            out,
            err,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the in-flight trust call when `token` is cancelled.
    ///
    /// Repositories already published stay published.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Remove `signer` from every repository in `repositories`.
    ///
    /// Fails with [`Error::RemovalFailed`] listing every failed repository
    /// once the whole batch has been processed.
    pub async fn remove_signer(
        &mut self,
        signer: &str,
        repositories: &[String],
        force_yes: bool,
    ) -> Result<()> {
        self.remove_signer_report(signer, repositories, force_yes)
            .await?
            .into_result()
    }

    /// Remove `signer` from every repository and return the per-repository report.
    ///
    /// Only a failure to write to the output streams ends the batch early.
    pub async fn remove_signer_report(
        &mut self,
        signer: &str,
        repositories: &[String],
        force_yes: bool,
    ) -> Result<RemovalReport> {
        let mut report = RemovalReport::new();
        for repository in repositories {
            writeln!(self.out, "Removing signer \"{signer}\" from {repository}...")?;
            let outcome = match self.remove_single_signer(repository, signer, force_yes).await {
                Ok(true) => RemovalOutcome::Removed,
                Ok(false) => RemovalOutcome::Declined,
                Err(e) => {
                    debug!(repository = %repository, signer, error = %e, "removal failed");
                    writeln!(self.err, "{e}\n")?;
                    RemovalOutcome::Failed(e)
                },
            };
            report.record(repository, outcome);
        }
        Ok(report)
    }

    /// Remove `signer` from one repository.
    ///
    /// Returns `Ok(false)` when the user declines the last-signer
    /// confirmation; nothing is changed in that case.
    pub async fn remove_single_signer(
        &mut self,
        repository: &str,
        signer: &str,
        force_yes: bool,
    ) -> Result<bool> {
        let resolved = SignerResolver::new(self.client)
            .with_cancellation(self.cancel.clone())
            .resolve(repository, signer)
            .await?;

        if resolved.is_last_signer && !force_yes {
            let message = format!(
                "The signer \"{signer}\" signed the last released version of {repository}. \
                 Removing this signer will make {repository} unpullable. \
                 Are you sure you want to continue?"
            );
            if !self.confirm.confirm(&mut self.out, &message)? {
                writeln!(self.out, "\nAborting action.")?;
                return Ok(false);
            }
        }

        let name = resolved.repository.as_str();
        let key_ids = resolved.key_ids();
        let publish_context = || format!("error publishing trust metadata for {repository}");
        cancellable(
            &self.cancel,
            self.client.remove_delegation_keys(name, RELEASES_ROLE, key_ids),
        )
        .await
        .map_err(|e| e.context(publish_context()))?;
        cancellable(
            &self.cancel,
            self.client
                .remove_delegation_keys(name, &resolved.role.name, key_ids),
        )
        .await
        .map_err(|e| e.context(publish_context()))?;
        cancellable(&self.cancel, self.client.publish(name))
            .await
            .map_err(|e| e.context(publish_context()))?;

        info!(repository, signer, keys = key_ids.len(), "removed signer");
        writeln!(self.out, "Successfully removed {signer} from {repository}\n")?;
        Ok(true)
    }

    /// Give back the output streams.
    pub fn into_streams(self) -> (O, E) {
        (self.out, self.err)
    }
}
