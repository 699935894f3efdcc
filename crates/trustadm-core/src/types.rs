//! Trust metadata as seen by the signer tooling.
//!
//! These types mirror only what the orchestration logic needs from a
//! trust-metadata store: role names, the key IDs authorized for each role,
//! signature thresholds, and the signatures present on the latest published
//! data. They are serializable so file-backed stores can persist them as JSON.

use serde::{Deserialize, Serialize};

/// The top-level targets role of a repository.
pub const TARGETS_ROLE: &str = "targets";

/// The implicit delegation role whose signatures gate pulls.
pub const RELEASES_ROLE: &str = "targets/releases";

/// Signer alias that maps onto [`RELEASES_ROLE`] and can never be removed.
pub const RELEASES_ALIAS: &str = "releases";

/// A named signing policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Fully qualified role name, e.g. `targets/alice`.
    pub name: String,
    /// Key IDs authorized to sign for this role.
    #[serde(default)]
    pub key_ids: Vec<String>,
    /// Minimum number of valid signatures required.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

const fn default_threshold() -> u32 {
    1
}

impl Role {
    /// Create a role with the given keys and threshold.
    #[must_use]
    pub fn new(name: impl Into<String>, key_ids: Vec<String>, threshold: u32) -> Self {
        Self {
            name: name.into(),
            key_ids,
            threshold,
        }
    }

    /// Role name of the delegation belonging to `signer`.
    #[must_use]
    pub fn delegation_name(signer: &str) -> String {
        format!("{TARGETS_ROLE}/{signer}")
    }

    /// Signer alias for a delegation role, `None` for non-delegation roles.
    #[must_use]
    pub fn signer(&self) -> Option<&str> {
        self.name
            .strip_prefix(TARGETS_ROLE)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|alias| !alias.is_empty())
    }

    /// Whether this is the releases role.
    #[must_use]
    pub fn is_releases(&self) -> bool {
        self.name == RELEASES_ROLE
    }

    /// Whether any of `key_ids` is authorized for this role.
    #[must_use]
    pub fn has_any_key(&self, key_ids: &[String]) -> bool {
        self.key_ids.iter().any(|k| key_ids.contains(k))
    }
}

/// A signature present on a role's published metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// ID of the key that produced the signature.
    pub key_id: String,
    /// Signing method, e.g. `ecdsa`.
    #[serde(default)]
    pub method: String,
}

impl Signature {
    /// Signature made by `key_id` with an unspecified method.
    #[must_use]
    pub fn by(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            method: String::new(),
        }
    }
}

/// A role together with the signatures on its latest published data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleWithSignatures {
    /// The role definition.
    #[serde(flatten)]
    pub role: Role,
    /// Signatures currently present on the role's data.
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

impl RoleWithSignatures {
    /// Pair a role with its current signatures.
    #[must_use]
    pub const fn new(role: Role, signatures: Vec<Signature>) -> Self {
        Self { role, signatures }
    }

    /// Whether any current signature was made by one of `key_ids`.
    #[must_use]
    pub fn signed_by_any(&self, key_ids: &[String]) -> bool {
        self.signatures.iter().any(|sig| key_ids.contains(&sig.key_id))
    }
}
