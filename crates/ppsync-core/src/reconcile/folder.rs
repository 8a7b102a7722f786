//! Folder resources.
//!
//! A folder without a declared parent is placed under the root folder. The
//! root id is looked up on every create and update, so the state returned to
//! the caller always names the concrete parent.

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::StatusCode;

use super::{Operations, ResourceKind};
use crate::api::{ApiError, ApiResult, FolderInput, FolderRecord, VaultApi};
use crate::models::{FolderResource, FolderSpec};
use crate::utils::unquote_or_raw;

pub struct FolderKind;

/// Resolve the well-known root folder id.
pub async fn root_folder_id<A>(api: &A) -> Result<String, ApiError>
where
    A: VaultApi + ?Sized,
{
    let raw = api
        .folder_root()
        .await?
        .expect_status("GetFolderRoot", StatusCode::OK)?;
    Ok(unquote_or_raw(&raw))
}

impl ResourceKind for FolderKind {
    const KIND: &'static str = "folder";
    const OPERATIONS: Operations = Operations {
        create: "CreateFolder",
        fetch: "GetFolder",
        update: "UpdateFolder",
        delete: "DeleteFolder",
    };

    type Declared = FolderSpec;
    type Input = FolderInput;
    type Record = FolderRecord;
    type State = FolderResource;

    fn prepare<'a, A>(api: &'a A, declared: &'a FolderSpec) -> BoxFuture<'a, Result<FolderInput, ApiError>>
    where
        A: VaultApi + ?Sized,
    {
        async move {
            let parent = match declared.parent_id {
                Some(ref parent) => parent.clone(),
                None => root_folder_id(api).await?,
            };
            Ok(declared.to_input(parent))
        }
        .boxed()
    }

    fn create<'a, A>(api: &'a A, input: &'a FolderInput) -> BoxFuture<'a, ApiResult<String>>
    where
        A: VaultApi + ?Sized,
    {
        api.create_folder(input)
    }

    fn fetch<'a, A>(api: &'a A, id: &'a str) -> BoxFuture<'a, ApiResult<FolderRecord>>
    where
        A: VaultApi + ?Sized,
    {
        api.get_folder(id)
    }

    fn update<'a, A>(api: &'a A, id: &'a str, input: &'a FolderInput) -> BoxFuture<'a, ApiResult<()>>
    where
        A: VaultApi + ?Sized,
    {
        api.update_folder(id, input)
    }

    fn delete<'a, A>(api: &'a A, id: &'a str) -> BoxFuture<'a, ApiResult<()>>
    where
        A: VaultApi + ?Sized,
    {
        api.delete_folder(id)
    }

    fn overwrite(input: &FolderInput) -> FolderInput {
        input.overwrite()
    }

    fn from_input(id: String, input: &FolderInput) -> FolderResource {
        FolderResource::from_input(id, input)
    }

    fn from_record(record: FolderRecord) -> FolderResource {
        FolderResource::from(record)
    }

    fn complete<'a, A>(_api: &'a A, _id: &'a str, _state: &'a mut FolderResource) -> BoxFuture<'a, Result<(), ApiError>>
    where
        A: VaultApi + ?Sized,
    {
        future::ready(Ok(())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::ROOT_FOLDER_ID;
    use crate::api::MemoryVault;
    use crate::reconcile::{ReadOutcome, Reconciler};

    fn spec(name: &str, parent: Option<&str>) -> FolderSpec {
        FolderSpec {
            name: name.to_string(),
            parent_id: parent.map(str::to_string),
            notes: Some("testnotes".to_string()),
        }
    }

    #[tokio::test]
    async fn test_root_folder_id_unquoted() {
        let vault = MemoryVault::new("u", "p").with_quoted_payloads();
        assert_eq!(root_folder_id(&vault).await.unwrap(), ROOT_FOLDER_ID);
    }

    #[tokio::test]
    async fn test_create_without_parent_defaults_to_root() {
        let vault = MemoryVault::new("u", "p");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);

        let created = folders.create(&spec("acctest_folder", None)).await.unwrap();
        assert_eq!(created.parent_id.as_deref(), Some(ROOT_FOLDER_ID));
        assert!(created.created.is_none());

        let read = folders.read(&created.id).await.unwrap().found().unwrap();
        assert_eq!(read.parent_id.as_deref(), Some(ROOT_FOLDER_ID));
        assert_eq!(read.name, "acctest_folder");
        assert_eq!(read.notes.as_deref(), Some("testnotes"));
    }

    #[tokio::test]
    async fn test_create_unquotes_id() {
        let vault = MemoryVault::new("u", "p").with_quoted_payloads();
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);

        let created = folders.create(&spec("quoted", None)).await.unwrap();
        assert!(!created.id.contains('"'));
        assert!(vault.contains_folder(&created.id));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let vault = MemoryVault::new("u", "p");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);

        let parent = folders.create(&spec("parent", None)).await.unwrap();
        let child = folders.create(&spec("child", Some(&parent.id))).await.unwrap();
        let grandchild = folders
            .create(&spec("grandchild", Some(&child.id)))
            .await
            .unwrap();

        folders.delete(&parent.id).await.unwrap();

        assert_eq!(folders.read(&child.id).await.unwrap(), ReadOutcome::NotFound);
        assert_eq!(folders.read(&grandchild.id).await.unwrap(), ReadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let vault = MemoryVault::new("u", "p");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);
        let created = folders.create(&spec("before", None)).await.unwrap();

        let declared = spec("after", None);
        let first = folders.update(&created.id, &declared).await.unwrap();
        let second = folders.update(&created.id, &declared).await.unwrap();
        assert_eq!(first, second);

        let read = folders.read(&created.id).await.unwrap().found().unwrap();
        assert_eq!(read.name, "after");
        assert_eq!(read.parent_id.as_deref(), Some(ROOT_FOLDER_ID));
    }

    #[tokio::test]
    async fn test_update_clears_notes() {
        let vault = MemoryVault::new("u", "p");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);
        let created = folders.create(&spec("noted", None)).await.unwrap();
        assert_eq!(created.notes.as_deref(), Some("testnotes"));

        let declared = FolderSpec {
            name: "noted".to_string(),
            parent_id: None,
            notes: None,
        };
        let updated = folders.update(&created.id, &declared).await.unwrap();
        let read = folders.get(&created.id).await.unwrap();

        assert_eq!(updated.notes, None);
        assert_eq!(read.notes, None);
    }

    #[tokio::test]
    async fn test_read_surfaces_non_drift_errors() {
        let vault = MemoryVault::new("u", "p");
        vault.fail("GetFolder", None, StatusCode::FORBIDDEN, "denied");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);

        let err = folders.read("anything").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_get_missing_is_error() {
        let vault = MemoryVault::new("u", "p");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);
        let err = folders.get("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_is_error() {
        let vault = MemoryVault::new("u", "p");
        let folders: Reconciler<'_, FolderKind, _> = Reconciler::new(&vault);
        let err = folders.delete("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
