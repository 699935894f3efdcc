//! # trustadm-core
//!
//! Core functionality for trustadm: removing signers from content-trust
//! metadata across many repositories, without breaking a repository's ability
//! to serve signed tags by accident.
//!
//! ## Architecture
//!
//! - **Reference validation**: repository references are checked before any
//!   trust-store call is made
//! - **Trust client**: a narrow async trait over the trust-metadata store, with
//!   in-memory and file-backed implementations
//! - **Resolver**: finds a signer's delegation keys on a repository and decides
//!   whether removing them would leave released tags without a valid signature
//! - **Orchestrator**: processes a batch of repositories one at a time,
//!   confirming risky removals and collecting failures
//! - **Engine**: container engine API client used for volume removal
//! - **Configuration**: TOML settings with named contexts
//!
//! ## Quick Start
//!
//! ```rust
//! use trustadm_core::{
//!     FixedAnswer, MemoryTrustStore, Role, RoleWithSignatures, SignerRemoval, Signature,
//! };
//!
//! # tokio_test_block(async {
//! let store = MemoryTrustStore::new().with_repository(
//!     "library/app",
//!     vec![
//!         RoleWithSignatures::new(
//!             Role::new("targets/releases", vec!["k1".into(), "k2".into()], 1),
//!             vec![Signature::by("k2")],
//!         ),
//!         RoleWithSignatures::new(Role::new("targets/alice", vec!["k1".into()], 1), vec![]),
//!     ],
//! );
//!
//! let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
//! SignerRemoval::new(&store, FixedAnswer(false), &mut out, &mut err)
//!     .remove_signer("alice", &["library/app".to_string()], false)
//!     .await?;
//! assert!(String::from_utf8_lossy(&out).contains("Successfully removed alice from library/app"));
//! # Ok::<(), trustadm_core::Error>(())
//! # }).unwrap();
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Batch operations never stop at
//! the first failure; they report each cause as they go and return one
//! aggregate error at the end:
//!
//! ```rust
//! use trustadm_core::Error;
//!
//! let err = Error::RemovalFailed {
//!     repositories: vec!["a/app".into(), "b/app".into()],
//! };
//! assert_eq!(err.to_string(), "error removing signer from: a/app, b/app");
//! ```

/// Configuration file and named contexts
pub mod config;
/// Container engine client and volume removal
pub mod engine;
/// Error types and result aliases
pub mod error;
/// JSON-file trust store
pub mod file_store;
/// Batch signer removal
pub mod orchestrator;
/// Confirmation prompts
pub mod prompt;
/// Repository reference validation
pub mod reference;
/// Signer resolution and last-signer detection
pub mod resolver;
/// Trust-client trait and in-memory store
pub mod trust;
/// Trust metadata types
pub mod types;

// Re-export commonly used types
pub use config::{
    Config, ContextConfig, Endpoint, EngineConfig, TrustConfig, validate_context_name,
    validate_file_path,
};
pub use engine::{EngineClient, HttpEngineClient, remove_volumes};
pub use error::{Error, Result};
pub use file_store::{FileTrustStore, RepositoryDocument};
pub use orchestrator::{RemovalOutcome, RemovalReport, RepositoryOutcome, SignerRemoval};
pub use prompt::{Confirm, FixedAnswer, ReaderConfirm};
pub use reference::{RepositoryName, parse_repository};
pub use resolver::{ResolvedSigner, SignerResolver, is_last_signer_for_releases};
pub use trust::{MemoryTrustStore, TrustClient};
pub use types::*;
