//! File-backed trust store.
//!
//! Each repository's roles live in one JSON document under a root directory:
//!
//! ```text
//! <root>/<repository path>.json
//! ```
//!
//! Registry hosts with a port (`host:5000/app`) are stored with the `:`
//! replaced by `_`. Removals are staged in memory and written on publish
//! through a temporary file and rename, so a failed publish leaves the
//! document untouched.
//!
//! ```json
//! {
//!   "roles": [
//!     { "name": "targets/releases", "keyIds": ["a1"], "threshold": 1,
//!       "signatures": [{ "keyId": "a1" }] },
//!     { "name": "targets/alice", "keyIds": ["a1"], "threshold": 1 }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::trust::{StagedRemoval, TrustClient, apply_staged};
use crate::types::{Role, RoleWithSignatures};
use crate::{Error, Result};

/// On-disk shape of a repository document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryDocument {
    /// Roles with their current signatures.
    #[serde(default)]
    pub roles: Vec<RoleWithSignatures>,
}

/// Trust store persisted as JSON documents in a directory.
#[derive(Debug)]
pub struct FileTrustStore {
    root: PathBuf,
    staged: Mutex<HashMap<String, Vec<StagedRemoval>>>,
}

impl FileTrustStore {
    /// Open a store rooted at `root`. The directory is not created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staged: Mutex::new(HashMap::new()),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document holding `repository`.
    pub fn document_path(&self, repository: &str) -> PathBuf {
        let mut path = self.root.clone();
        let mut segments = repository.split('/').peekable();
        while let Some(segment) = segments.next() {
            let segment = segment.replace(':', "_");
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{segment}.json"));
            }
        }
        path
    }

    /// Write a repository document, creating parent directories.
    pub async fn save(&self, repository: &str, document: &RepositoryDocument) -> Result<()> {
        let path = self.document_path(repository);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(document)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, repository: &str) -> Result<RepositoryDocument> {
        let path = self.document_path(repository);
        debug!(path = %path.display(), "loading trust metadata");
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::RepositoryNotFound(repository.to_string()));
            },
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&body).map_err(|e| {
            Error::TrustStore(format!("corrupt metadata at {}: {e}", path.display()))
        })
    }

    fn take_staged(&self, repository: &str) -> Result<Vec<StagedRemoval>> {
        let mut staged = self
            .staged
            .lock()
            .map_err(|_| Error::TrustStore("staging lock poisoned".into()))?;
        Ok(staged.remove(repository).unwrap_or_default())
    }
}

#[async_trait]
impl TrustClient for FileTrustStore {
    async fn list_roles(&self, repository: &str) -> Result<Vec<Role>> {
        let document = self.load(repository).await?;
        Ok(document
            .roles
            .into_iter()
            .filter(|r| r.role.signer().is_some())
            .map(|r| r.role)
            .collect())
    }

    async fn list_roles_with_signatures(
        &self,
        repository: &str,
    ) -> Result<Vec<RoleWithSignatures>> {
        Ok(self.load(repository).await?.roles)
    }

    async fn remove_delegation_keys(
        &self,
        repository: &str,
        role: &str,
        key_ids: &[String],
    ) -> Result<()> {
        // Fail early for unknown repositories rather than at publish time.
        self.load(repository).await?;
        let mut staged = self
            .staged
            .lock()
            .map_err(|_| Error::TrustStore("staging lock poisoned".into()))?;
        staged
            .entry(repository.to_string())
            .or_default()
            .push(StagedRemoval {
                role: role.to_string(),
                key_ids: key_ids.to_vec(),
            });
        Ok(())
    }

    async fn publish(&self, repository: &str) -> Result<()> {
        let staged = self.take_staged(repository)?;
        if staged.is_empty() {
            return Ok(());
        }
        let mut document = self.load(repository).await?;
        apply_staged(&mut document.roles, &staged);
        self.save(repository, &document).await?;
        info!(repository, changes = staged.len(), "published trust metadata");
        Ok(())
    }
}
