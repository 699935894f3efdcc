//! Error types and handling for trustadm-core operations.
//!
//! Every fallible operation in the crate returns [`Result<T, Error>`](Result).
//! Errors fall into a handful of groups that callers treat differently:
//!
//! - **Input validation**: malformed repository references, reserved role names.
//!   Raised before any trust-store call is made.
//! - **Not found**: a signer that has no delegation on a repository, or a
//!   repository the trust store does not know about.
//! - **Safety gate**: the releases role has no valid signatures left.
//! - **Transport**: trust-store and engine API failures, wrapped with the
//!   repository or volume they concern.
//! - **Batch**: the aggregate error returned once a multi-repository operation
//!   has finished with at least one failure.
//!
//! ```rust
//! use trustadm_core::Error;
//!
//! let err = Error::SignerNotFound {
//!     signer: "alice".into(),
//!     repository: "library/app".into(),
//! };
//! assert_eq!(err.to_string(), "no signer alice for repository library/app");
//! assert_eq!(err.category(), "not_found");
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for trustadm-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Reference string does not follow the `name[:tag][@digest]` grammar.
    #[error("{}", invalid_reference_message(.0.as_deref()))]
    InvalidReferenceFormat(Option<String>),

    /// Reference parses but cannot name a repository for trust operations.
    ///
    /// Raised for bare 64-character hex identifiers and for digest
    /// references, which pin immutable content rather than a signed tag.
    #[error("invalid repository name ({name}), {reason}")]
    InvalidRepositoryName {
        /// Reference as supplied by the caller.
        name: String,
        /// Why the reference was refused.
        reason: String,
    },

    /// Attempted to remove a role that is managed implicitly.
    #[error("{0} is a reserved keyword and cannot be removed")]
    ReservedRole(String),

    /// The signer has no delegation role on the repository.
    #[error("no signer {signer} for repository {repository}")]
    SignerNotFound {
        /// Signer alias that was looked up.
        signer: String,
        /// Repository that was searched.
        repository: String,
    },

    /// The releases role requires one signature and currently has none.
    #[error("all signed tags are currently revoked, use trustadm sign to fix")]
    SignedTagsRevoked,

    /// The trust store has no metadata for the repository.
    #[error("repository {0} not found in trust store")]
    RepositoryNotFound(String),

    /// Trust-store backend failure.
    #[error("trust store error: {0}")]
    TrustStore(String),

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        /// Human-readable description of the failed operation.
        context: String,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The container engine answered with a non-success status.
    #[error("engine API error ({status}): {message}")]
    Engine {
        /// HTTP status code returned by the engine.
        status: u16,
        /// Message from the engine's error body, or the status reason.
        message: String,
    },

    /// Network operation failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// One or more repositories in a signer-removal batch failed.
    ///
    /// Only the repository names are carried here, in input order and
    /// including duplicates. The individual causes are reported on the
    /// error stream while the batch runs.
    #[error("error removing signer from: {}", .repositories.join(", "))]
    RemovalFailed {
        /// Repositories whose removal failed.
        repositories: Vec<String>,
    },

    /// One or more volumes could not be removed.
    #[error("{}", .0.join("\n"))]
    VolumeRemovalFailed(Vec<String>),
}

fn invalid_reference_message(detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("invalid reference format: {detail}"),
        None => "invalid reference format".to_string(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Wrap this error with a description of the operation that failed.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`Error::Context`] layers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if re-running the operation might succeed.
    ///
    /// Nothing in this crate retries on its own; the flag is surfaced so
    /// callers can tell the user whether re-invoking the command is worthwhile.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::Engine { status, .. } => *status >= 500,
            Self::Context { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Context wrappers report the category of the error they wrap.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidReferenceFormat(_)
            | Self::InvalidRepositoryName { .. }
            | Self::ReservedRole(_) => "validation",
            Self::SignerNotFound { .. } | Self::RepositoryNotFound(_) => "not_found",
            Self::SignedTagsRevoked => "trust_safety",
            Self::TrustStore(_) => "trust_store",
            Self::Context { source, .. } => source.category(),
            Self::Cancelled => "cancelled",
            Self::Engine { .. } => "engine",
            Self::Network(_) => "network",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::RemovalFailed { .. } | Self::VolumeRemovalFailed(_) => "batch",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
