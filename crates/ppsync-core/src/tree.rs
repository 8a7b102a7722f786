//! Recursive folder tree materialization.
//!
//! The folder endpoint embeds child folders only as shallow references, so
//! every child is fetched again by id. Fetches run one after another in the
//! order the vault lists the children.

use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use tracing::debug;

use crate::api::{ApiError, VaultApi};
use crate::models::Folder;
use crate::reconcile::folder::root_folder_id;

/// Builds fully populated `Folder` trees.
pub struct TreeMaterializer<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> TreeMaterializer<'a, A>
where
    A: VaultApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Id of the vault's root folder.
    pub async fn root_id(&self) -> Result<String, ApiError> {
        root_folder_id(self.api).await
    }

    /// The folder `id` with every descendant folder and credential.
    ///
    /// Makes one folder fetch per folder in the subtree and no credential
    /// fetches; embedded credentials carry no secret. The first failure
    /// aborts the whole call.
    pub async fn materialize(&self, id: &str) -> Result<Folder, ApiError> {
        let tree = self.fetch_subtree(id.to_string()).await?;
        debug!(
            id = %tree.id,
            folders = 1 + tree.descendant_count(),
            depth = tree.depth(),
            "Materialized folder tree"
        );
        Ok(tree)
    }

    /// The whole vault, starting at the root folder.
    pub async fn materialize_root(&self) -> Result<Folder, ApiError> {
        let root = self.root_id().await?;
        self.materialize(&root).await
    }

    fn fetch_subtree(&self, id: String) -> BoxFuture<'_, Result<Folder, ApiError>> {
        async move {
            let record = self
                .api
                .get_folder(&id)
                .await?
                .expect_status("GetFolder", StatusCode::OK)?;

            let child_ids: Vec<String> = record.children.iter().map(|c| c.id.clone()).collect();
            let mut folder = Folder::from_record_shallow(record);

            for child_id in child_ids {
                let child = self.fetch_subtree(child_id).await?;
                folder.children.push(child);
            }
            Ok(folder)
        }
        .boxed()
    }
}
