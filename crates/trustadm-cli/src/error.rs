//! CLI error handling with semantic exit codes.
//!
//! | Code | Category | Description |
//! |------|----------|-------------|
//! | 0 | Success | Command completed successfully |
//! | 1 | `Internal` | Unexpected/internal error, or a batch with mixed failures |
//! | 2 | `Usage` | Invalid arguments, references, or configuration |
//! | 3 | `NotFound` | Signer, repository, or volume not found |
//! | 5 | `Network` | Engine or trust-store transport failure |
//! | 6 | `Timeout` | Operation timed out |
//! | 7 | `Integrity` | Trust metadata unsafe or unreadable |
//!
//! ```bash
//! trustadm trust signer remove alice team/app
//! case $? in
//!     0) echo "removed" ;;
//!     3) echo "alice is not a signer" ;;
//!     *) echo "other error" ;;
//! esac
//! ```

use std::fmt;
use std::process::ExitCode;

use trustadm_core::Error as CoreError;

/// Semantic error category determining the exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Unexpected or internal error (exit code 1).
    Internal = 1,

    /// Invalid arguments or configuration (exit code 2).
    Usage = 2,

    /// Requested resource not found (exit code 3).
    NotFound = 3,

    /// Network or API failure (exit code 5).
    Network = 5,

    /// Operation timed out (exit code 6).
    Timeout = 6,

    /// Trust metadata is unsafe to modify or corrupted (exit code 7).
    Integrity = 7,
}

impl ErrorCategory {
    /// Get the exit code for this category.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        self as u8
    }

    /// Create an `ExitCode` from this category.
    #[must_use]
    pub fn as_exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_code())
    }

    /// Get a short description of this error category.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Internal => "internal error",
            Self::Usage => "usage error",
            Self::NotFound => "not found",
            Self::Network => "network error",
            Self::Timeout => "timeout",
            Self::Integrity => "integrity error",
        }
    }

    /// Category of a core error.
    #[must_use]
    pub fn from_core(err: &CoreError) -> Self {
        match err.root() {
            CoreError::InvalidReferenceFormat(_)
            | CoreError::InvalidRepositoryName { .. }
            | CoreError::ReservedRole(_)
            | CoreError::Config(_) => Self::Usage,
            CoreError::SignerNotFound { .. } | CoreError::RepositoryNotFound(_) => Self::NotFound,
            CoreError::SignedTagsRevoked
            | CoreError::TrustStore(_)
            | CoreError::Serialization(_) => Self::Integrity,
            CoreError::Network(e) if e.is_timeout() => Self::Timeout,
            CoreError::Network(_) => Self::Network,
            CoreError::Engine { status: 404, .. } => Self::NotFound,
            CoreError::Engine { .. } => Self::Network,
            CoreError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => Self::Timeout,
            CoreError::VolumeRemovalFailed(messages) => {
                Self::infer_from_message(&messages.join("\n"))
            },
            CoreError::Io(_)
            | CoreError::Cancelled
            | CoreError::RemovalFailed { .. }
            | CoreError::Context { .. } => Self::Internal,
        }
    }

    /// The shared category of several errors, or `Internal` if they differ.
    #[must_use]
    pub fn common<'a>(errors: impl IntoIterator<Item = &'a CoreError>) -> Self {
        let mut categories = errors.into_iter().map(Self::from_core);
        let Some(first) = categories.next() else {
            return Self::Internal;
        };
        if categories.all(|c| c == first) {
            first
        } else {
            Self::Internal
        }
    }

    /// Infer the error category from an error message.
    ///
    /// Heuristic fallback for errors that were not categorized explicitly.
    #[must_use]
    pub fn infer_from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        // Timeout before network so "connection timed out" lands here
        if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            return Self::Timeout;
        }

        if msg_lower.contains("not found")
            || msg_lower.contains("no such")
            || msg_lower.contains("does not exist")
        {
            return Self::NotFound;
        }

        if msg_lower.contains("network")
            || msg_lower.contains("connection")
            || msg_lower.contains("dns")
            || msg_lower.contains("unreachable")
            || msg_lower.contains("engine api error")
        {
            return Self::Network;
        }

        if msg_lower.contains("corrupt") || msg_lower.contains("revoked") {
            return Self::Integrity;
        }

        if msg_lower.contains("invalid")
            || msg_lower.contains("reserved keyword")
            || msg_lower.contains("configuration error")
        {
            return Self::Usage;
        }

        Self::Internal
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A CLI error with a semantic category for exit code mapping.
#[derive(Debug)]
pub struct CliError {
    /// The semantic category of this error.
    pub category: ErrorCategory,
    /// The underlying error with full context.
    pub source: anyhow::Error,
}

impl CliError {
    /// Create a new CLI error with explicit category.
    pub fn new(category: ErrorCategory, source: impl Into<anyhow::Error>) -> Self {
        Self {
            category,
            source: source.into(),
        }
    }

    /// Create a CLI error from a core error, using its own category.
    pub fn from_core(err: CoreError) -> Self {
        Self::new(ErrorCategory::from_core(&err), err)
    }

    /// Create a usage error.
    pub fn usage(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorCategory::Usage, source)
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.category.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Extension trait for attaching a category to an error.
pub trait IntoCliError {
    /// Convert to a `CliError` with an explicit category.
    fn with_category(self, category: ErrorCategory) -> CliError;
}

impl<E: Into<anyhow::Error>> IntoCliError for E {
    fn with_category(self, category: ErrorCategory) -> CliError {
        CliError::new(category, self)
    }
}

/// Determine the exit code from an `anyhow::Error`.
///
/// Categorized errors keep their category; core errors use their own kind;
/// anything else is inferred from the message.
#[must_use]
pub fn exit_code_from_error(err: &anyhow::Error) -> u8 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    if let Some(core_err) = err.downcast_ref::<CoreError>() {
        return ErrorCategory::from_core(core_err).exit_code();
    }
    ErrorCategory::infer_from_message(&err.to_string()).exit_code()
}
