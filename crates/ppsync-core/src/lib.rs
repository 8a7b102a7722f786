//! Reconciliation core for Pleasant Password Server vaults.
//!
//! This crate provides:
//! - `auth`: session establishment with the password grant
//! - `api`: the REST v6 wire client and an in-memory vault for tests
//! - `reconcile`: create/read/update/delete of folders and credentials with drift detection
//! - `tree`: recursive folder tree materialization
//! - `search`: vault search projected into hit lists
//!
//! Every operation awaits its calls one at a time; nothing is retried.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod search;
pub mod tree;
pub mod utils;

pub use api::{ApiClient, ApiError, MemoryVault, VaultApi};
pub use auth::{authenticate, Session};
pub use config::{ResolvedConfig, SessionConfig};
pub use error::{AuthError, ConfigError, Error, Result};
pub use models::{
    Credential, CredentialHit, CredentialSpec, Folder, FolderHit, FolderResource, FolderSpec,
    SearchResults, Tag,
};
pub use reconcile::{CredentialKind, FolderKind, ReadOutcome, Reconciler};
pub use search::SearchProjector;
pub use tree::TreeMaterializer;

/// Everything callers do against one vault, over any `VaultApi`.
pub struct Vault<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> Vault<'a, A>
where
    A: VaultApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub fn folders(&self) -> Reconciler<'a, FolderKind, A> {
        Reconciler::new(self.api)
    }

    pub fn credentials(&self) -> Reconciler<'a, CredentialKind, A> {
        Reconciler::new(self.api)
    }

    pub async fn root_id(&self) -> std::result::Result<String, ApiError> {
        TreeMaterializer::new(self.api).root_id().await
    }

    pub async fn folder_tree(&self, id: &str) -> std::result::Result<Folder, ApiError> {
        TreeMaterializer::new(self.api).materialize(id).await
    }

    pub async fn folder_tree_root(&self) -> std::result::Result<Folder, ApiError> {
        TreeMaterializer::new(self.api).materialize_root().await
    }

    pub async fn search(&self, query: &str) -> std::result::Result<SearchResults, ApiError> {
        SearchProjector::new(self.api).search(query).await
    }

    /// A credential with its secret. Unlike a reconciler read, a missing
    /// credential is an error.
    pub async fn credential(&self, id: &str) -> std::result::Result<Credential, ApiError> {
        self.credentials().get(id).await
    }
}
