//! Command implementations.

pub mod signer_remove;
pub mod volume_rm;
