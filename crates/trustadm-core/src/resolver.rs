//! Resolving a signer on a repository and checking last-signer risk.
//!
//! Resolution is read-only. It validates the repository reference, refuses
//! the reserved releases alias, finds the signer's delegation role, and
//! decides whether that signer's keys are what currently satisfies a
//! threshold-1 releases role.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::reference::parse_repository;
use crate::trust::{TrustClient, cancellable};
use crate::types::{RELEASES_ALIAS, RELEASES_ROLE, Role, RoleWithSignatures};
use crate::{Error, Result};

/// Outcome of resolving a signer on one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSigner {
    /// Trust-store key of the repository.
    pub repository: String,
    /// The signer's delegation role.
    pub role: Role,
    /// Whether removing the signer needs an explicit confirmation.
    pub is_last_signer: bool,
}

impl ResolvedSigner {
    /// Key IDs that removal will revoke.
    pub fn key_ids(&self) -> &[String] {
        &self.role.key_ids
    }
}

/// Resolves signers against a trust client.
pub struct SignerResolver<'a, C: ?Sized> {
    client: &'a C,
    cancel: CancellationToken,
}

impl<'a, C: TrustClient + ?Sized> SignerResolver<'a, C> {
    /// Create a resolver that is never cancelled.
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight trust calls when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Resolve `signer` on `repository`.
    ///
    /// `repository` is used verbatim in error messages; the trust store is
    /// queried with its parsed name.
    pub async fn resolve(&self, repository: &str, signer: &str) -> Result<ResolvedSigner> {
        let name = parse_repository(repository)?.name();

        let delegation = Role::delegation_name(signer);
        if signer == RELEASES_ALIAS || delegation == RELEASES_ROLE {
            return Err(Error::ReservedRole(RELEASES_ALIAS.to_string()));
        }

        let roles = cancellable(&self.cancel, self.client.list_roles(&name))
            .await
            .map_err(|e| e.context(format!("error retrieving signers for {repository}")))?;
        let role = roles
            .into_iter()
            .find(|r| r.name == delegation)
            .ok_or_else(|| Error::SignerNotFound {
                signer: signer.to_string(),
                repository: repository.to_string(),
            })?;

        let all_roles = cancellable(&self.cancel, self.client.list_roles_with_signatures(&name))
            .await
            .map_err(|e| e.context(format!("error retrieving signatures for {repository}")))?;
        let is_last_signer = is_last_signer_for_releases(&role, &all_roles)?;
        debug!(
            repository,
            signer,
            keys = role.key_ids.len(),
            is_last_signer,
            "resolved signer"
        );

        Ok(ResolvedSigner {
            repository: name,
            role,
            is_last_signer,
        })
    }
}

/// Whether `role`'s keys are what currently satisfies the releases role.
///
/// Only a threshold of exactly one can be broken by removing a single
/// signer. A threshold-1 releases role with no signatures at all is reported
/// as [`Error::SignedTagsRevoked`]: there is no signer left to protect.
pub fn is_last_signer_for_releases(role: &Role, all_roles: &[RoleWithSignatures]) -> Result<bool> {
    let Some(releases) = all_roles.iter().find(|r| r.role.name == RELEASES_ROLE) else {
        return Ok(false);
    };
    if releases.role.threshold != 1 {
        return Ok(false);
    }
    if releases.signatures.is_empty() {
        return Err(Error::SignedTagsRevoked);
    }
    Ok(releases.signed_by_any(&role.key_ids))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::trust::MemoryTrustStore;
    use crate::types::Signature;

    fn releases(threshold: u32, signers: &[&str]) -> RoleWithSignatures {
        RoleWithSignatures::new(
            Role::new(RELEASES_ROLE, vec!["deadbeef".into(), "8badf00d".into()], threshold),
            signers.iter().map(|k| Signature::by(*k)).collect(),
        )
    }

    fn alice() -> Role {
        Role::new("targets/alice", vec!["deadbeef".into()], 1)
    }

    #[test]
    fn test_zero_signatures_under_threshold_one_is_revoked() {
        let err = is_last_signer_for_releases(&Role::default(), &[releases(1, &[])]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "all signed tags are currently revoked, use trustadm sign to fix"
        );
    }

    #[test]
    fn test_matching_signature_is_last_signer() {
        assert!(is_last_signer_for_releases(&alice(), &[releases(1, &["deadbeef"])]).unwrap());
    }

    #[test]
    fn test_other_signature_is_not_last_signer() {
        assert!(!is_last_signer_for_releases(&alice(), &[releases(1, &["8badf00d"])]).unwrap());
    }

    #[test]
    fn test_higher_threshold_tolerates_removal() {
        assert!(
            !is_last_signer_for_releases(&alice(), &[releases(2, &["deadbeef", "8badf00d"])])
                .unwrap()
        );
        // Even with no signatures at all, a threshold above one is not this check's concern.
        assert!(!is_last_signer_for_releases(&alice(), &[releases(2, &[])]).unwrap());
    }

    #[test]
    fn test_missing_releases_role() {
        assert!(!is_last_signer_for_releases(&alice(), &[]).unwrap());
    }

    fn store() -> MemoryTrustStore {
        MemoryTrustStore::new().with_repository(
            "signed-repo",
            vec![
                releases(1, &["deadbeef"]),
                RoleWithSignatures::new(alice(), vec![]),
                RoleWithSignatures::new(
                    Role::new("targets/bob", vec!["8badf00d".into()], 1),
                    vec![],
                ),
            ],
        )
    }

    #[tokio::test]
    async fn test_resolve_last_signer() {
        let store = store();
        let resolved = SignerResolver::new(&store)
            .resolve("signed-repo", "alice")
            .await
            .unwrap();
        assert!(resolved.is_last_signer);
        assert_eq!(resolved.key_ids(), ["deadbeef".to_string()]);

        let bob = SignerResolver::new(&store)
            .resolve("signed-repo", "bob")
            .await
            .unwrap();
        assert!(!bob.is_last_signer);
    }

    #[tokio::test]
    async fn test_resolve_unknown_signer() {
        let store = store();
        let err = SignerResolver::new(&store)
            .resolve("signed-repo", "test")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no signer test for repository signed-repo");
    }

    #[tokio::test]
    async fn test_reserved_alias_never_reaches_store() {
        let store = store();
        let err = SignerResolver::new(&store)
            .resolve("signed-repo", "releases")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "releases is a reserved keyword and cannot be removed"
        );
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_references_never_reach_store() {
        let store = store();
        let resolver = SignerResolver::new(&store);
        let err = resolver.resolve("ALPINE", "alice").await.unwrap_err();
        assert!(err.to_string().contains("invalid reference format"));
        let err = resolver
            .resolve(
                "870d292919d01a0af7e7f056271dc78792c05f55f49b9b9012b6d89725bd9abd",
                "alice",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid repository name"));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_trust_failure_is_wrapped_with_repository() {
        let store = MemoryTrustStore::offline();
        let err = SignerResolver::new(&store)
            .resolve("notanimage", "user")
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("error retrieving signers for notanimage")
        );
    }

    #[tokio::test]
    async fn test_cancelled_resolution() {
        let store = store();
        let token = CancellationToken::new();
        token.cancel();
        let err = SignerResolver::new(&store)
            .with_cancellation(token)
            .resolve("signed-repo", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::Cancelled));
    }
}
