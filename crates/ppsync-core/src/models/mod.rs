//! Data models for vault entities.
//!
//! This module contains the domain structures the reconciler and the read-only
//! views hand to callers:
//!
//! - `CredentialSpec`, `FolderSpec`: declared (desired) state
//! - `Credential`, `FolderResource`: tracked state of a single resource
//! - `Folder`: a node of a materialized folder tree
//! - `SearchResults` with `CredentialHit` and `FolderHit`
//!
//! Timestamps are kept as the vault formats them. `None` means the vault did
//! not report the value in the call that produced the object. The vault
//! stores a cleared text field as an empty string; it is read back as `None`.

pub mod credential;
pub mod folder;
pub mod search;

pub use credential::{Credential, CredentialSpec, Tag};
pub use folder::{Folder, FolderResource, FolderSpec};
pub use search::{CredentialHit, FolderHit, SearchResults};

/// `None` for a missing or empty text field.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
