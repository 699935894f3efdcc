//! The trust-client seam and an in-memory implementation.
//!
//! The signer tooling never touches trust metadata directly. It goes through
//! [`TrustClient`], which offers exactly four operations: list delegation
//! roles, list roles with their current signatures, stage a key removal, and
//! publish staged changes for one repository. Staged removals are only
//! visible after [`TrustClient::publish`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{Role, RoleWithSignatures};
use crate::{Error, Result};

/// Access to a trust-metadata store, keyed by repository name.
#[async_trait]
pub trait TrustClient: Send + Sync {
    /// Delegation roles of the repository with their authorized key IDs.
    async fn list_roles(&self, repository: &str) -> Result<Vec<Role>>;

    /// All roles of the repository with the signatures on their latest data.
    async fn list_roles_with_signatures(&self, repository: &str)
    -> Result<Vec<RoleWithSignatures>>;

    /// Stage removal of `key_ids` from `role`.
    async fn remove_delegation_keys(
        &self,
        repository: &str,
        role: &str,
        key_ids: &[String],
    ) -> Result<()>;

    /// Atomically commit all staged changes for the repository.
    async fn publish(&self, repository: &str) -> Result<()>;
}

/// A staged key removal awaiting publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRemoval {
    /// Role the keys are removed from.
    pub role: String,
    /// Keys to remove.
    pub key_ids: Vec<String>,
}

/// Apply staged removals to a repository's roles.
///
/// Keys are removed from the named role and their signatures stop counting.
/// A delegation role left without keys is dropped entirely; the releases role
/// is kept even when empty, since it is managed implicitly.
pub fn apply_staged(roles: &mut Vec<RoleWithSignatures>, staged: &[StagedRemoval]) {
    for change in staged {
        let Some(entry) = roles.iter_mut().find(|r| r.role.name == change.role) else {
            continue;
        };
        entry.role.key_ids.retain(|k| !change.key_ids.contains(k));
        entry
            .signatures
            .retain(|sig| !change.key_ids.contains(&sig.key_id));
    }
    roles.retain(|r| {
        r.role.is_releases() || r.role.signer().is_none() || !r.role.key_ids.is_empty()
    });
}

/// Run a trust-client call, abandoning it if `token` is cancelled first.
pub async fn cancellable<F, T>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

#[derive(Debug, Default)]
struct RepositoryState {
    roles: Vec<RoleWithSignatures>,
    staged: Vec<StagedRemoval>,
    publishes: usize,
    publish_failure: Option<String>,
}

/// In-memory trust store.
///
/// Useful for tests and dry runs. It can be switched to an offline mode where
/// every call fails, and individual repositories can be made to fail on
/// publish.
#[derive(Debug, Default)]
pub struct MemoryTrustStore {
    repositories: Mutex<HashMap<String, RepositoryState>>,
    offline: bool,
    calls: AtomicUsize,
}

impl MemoryTrustStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails every call as if the trust server were unreachable.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Add or replace a repository's roles.
    #[must_use]
    pub fn with_repository(self, repository: &str, roles: Vec<RoleWithSignatures>) -> Self {
        if let Ok(mut repos) = self.repositories.lock() {
            repos.insert(
                repository.to_string(),
                RepositoryState {
                    roles,
                    ..RepositoryState::default()
                },
            );
        }
        self
    }

    /// Make publishing `repository` fail with `message`.
    #[must_use]
    pub fn with_publish_failure(self, repository: &str, message: &str) -> Self {
        if let Ok(mut repos) = self.repositories.lock() {
            if let Some(state) = repos.get_mut(repository) {
                state.publish_failure = Some(message.to_string());
            }
        }
        self
    }

    /// Published roles of a repository.
    pub fn roles(&self, repository: &str) -> Option<Vec<RoleWithSignatures>> {
        let repos = self.repositories.lock().ok()?;
        repos.get(repository).map(|state| state.roles.clone())
    }

    /// Number of successful publishes for a repository.
    pub fn publish_count(&self, repository: &str) -> usize {
        self.repositories
            .lock()
            .ok()
            .and_then(|repos| repos.get(repository).map(|state| state.publishes))
            .unwrap_or(0)
    }

    /// Total number of trust-client calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_state<T>(
        &self,
        repository: &str,
        f: impl FnOnce(&mut RepositoryState) -> Result<T>,
    ) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(Error::TrustStore("client is offline".into()));
        }
        let mut repos = self
            .repositories
            .lock()
            .map_err(|_| Error::TrustStore("trust store lock poisoned".into()))?;
        let state = repos
            .get_mut(repository)
            .ok_or_else(|| Error::RepositoryNotFound(repository.to_string()))?;
        f(state)
    }
}

#[async_trait]
impl TrustClient for MemoryTrustStore {
    async fn list_roles(&self, repository: &str) -> Result<Vec<Role>> {
        self.with_state(repository, |state| {
            Ok(state
                .roles
                .iter()
                .filter(|r| r.role.signer().is_some())
                .map(|r| r.role.clone())
                .collect())
        })
    }

    async fn list_roles_with_signatures(
        &self,
        repository: &str,
    ) -> Result<Vec<RoleWithSignatures>> {
        self.with_state(repository, |state| Ok(state.roles.clone()))
    }

    async fn remove_delegation_keys(
        &self,
        repository: &str,
        role: &str,
        key_ids: &[String],
    ) -> Result<()> {
        self.with_state(repository, |state| {
            debug!(repository, role, keys = key_ids.len(), "staging key removal");
            state.staged.push(StagedRemoval {
                role: role.to_string(),
                key_ids: key_ids.to_vec(),
            });
            Ok(())
        })
    }

    async fn publish(&self, repository: &str) -> Result<()> {
        self.with_state(repository, |state| {
            if let Some(message) = &state.publish_failure {
                state.staged.clear();
                return Err(Error::TrustStore(message.clone()));
            }
            let staged = std::mem::take(&mut state.staged);
            apply_staged(&mut state.roles, &staged);
            state.publishes += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{RELEASES_ROLE, Signature};

    fn fixture() -> Vec<RoleWithSignatures> {
        vec![
            RoleWithSignatures::new(
                Role::new(RELEASES_ROLE, vec!["a1".into(), "b1".into()], 1),
                vec![Signature::by("a1")],
            ),
            RoleWithSignatures::new(Role::new("targets/alice", vec!["a1".into()], 1), vec![]),
            RoleWithSignatures::new(Role::new("targets/bob", vec!["b1".into()], 1), vec![]),
        ]
    }

    #[test]
    fn test_apply_staged_drops_empty_delegations_only() {
        let mut roles = fixture();
        apply_staged(
            &mut roles,
            &[
                StagedRemoval {
                    role: RELEASES_ROLE.into(),
                    key_ids: vec!["a1".into()],
                },
                StagedRemoval {
                    role: "targets/alice".into(),
                    key_ids: vec!["a1".into()],
                },
            ],
        );
        let names: Vec<_> = roles.iter().map(|r| r.role.name.as_str()).collect();
        assert_eq!(names, vec![RELEASES_ROLE, "targets/bob"]);
        assert_eq!(roles[0].role.key_ids, vec!["b1".to_string()]);
        assert!(roles[0].signatures.is_empty());
    }

    #[tokio::test]
    async fn test_changes_are_invisible_until_publish() {
        let store = MemoryTrustStore::new().with_repository("app", fixture());
        store
            .remove_delegation_keys("app", "targets/bob", &["b1".into()])
            .await
            .unwrap();
        assert_eq!(store.list_roles("app").await.unwrap().len(), 3);

        store.publish("app").await.unwrap();
        let roles = store.list_roles("app").await.unwrap();
        assert!(roles.iter().all(|r| r.name != "targets/bob"));
        assert_eq!(store.publish_count("app"), 1);
    }

    #[tokio::test]
    async fn test_list_roles_excludes_non_delegations() {
        let mut roles = fixture();
        roles.push(RoleWithSignatures::new(Role::new("root", vec!["r".into()], 1), vec![]));
        let store = MemoryTrustStore::new().with_repository("app", roles);
        let delegations = store.list_roles("app").await.unwrap();
        assert!(delegations.iter().all(|r| r.name.starts_with("targets/")));
        assert_eq!(store.list_roles_with_signatures("app").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_repository_and_offline() {
        let store = MemoryTrustStore::new();
        let err = store.list_roles("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "repository missing not found in trust store");

        let offline = MemoryTrustStore::offline().with_repository("app", fixture());
        let err = offline.list_roles("app").await.unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert_eq!(offline.call_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_discards_staged_changes() {
        let store = MemoryTrustStore::new()
            .with_repository("app", fixture())
            .with_publish_failure("app", "server rejected update");
        store
            .remove_delegation_keys("app", "targets/bob", &["b1".into()])
            .await
            .unwrap();
        let err = store.publish("app").await.unwrap_err();
        assert!(err.to_string().contains("server rejected update"));
        assert_eq!(store.roles("app").unwrap().len(), 3);
        assert_eq!(store.publish_count("app"), 0);
    }

    #[tokio::test]
    async fn test_cancellable_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let res: Result<()> = cancellable(&token, std::future::pending()).await;
        assert!(matches!(res, Err(Error::Cancelled)));

        let live = CancellationToken::new();
        let value = cancellable(&live, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
