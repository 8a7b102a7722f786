//! Credential resources.
//!
//! The fetch endpoint never returns the secret, so a read makes a second call
//! for the password. That second call is not part of drift detection: if the
//! credential itself was found, any failure fetching its secret is an error.

use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;

use super::{Operations, ResourceKind};
use crate::api::{ApiError, ApiResult, CredentialInput, CredentialRecord, VaultApi};
use crate::models::{Credential, CredentialSpec};
use crate::utils::unquote_or_raw;

pub struct CredentialKind;

impl ResourceKind for CredentialKind {
    const KIND: &'static str = "credential";
    const OPERATIONS: Operations = Operations {
        create: "CreateCredential",
        fetch: "GetCredential",
        update: "UpdateCredential",
        delete: "DeleteCredential",
    };

    type Declared = CredentialSpec;
    type Input = CredentialInput;
    type Record = CredentialRecord;
    type State = Credential;

    fn prepare<'a, A>(_api: &'a A, declared: &'a CredentialSpec) -> BoxFuture<'a, Result<CredentialInput, ApiError>>
    where
        A: VaultApi + ?Sized,
    {
        futures::future::ready(Ok(declared.to_input())).boxed()
    }

    fn create<'a, A>(api: &'a A, input: &'a CredentialInput) -> BoxFuture<'a, ApiResult<String>>
    where
        A: VaultApi + ?Sized,
    {
        api.create_credential(input)
    }

    fn fetch<'a, A>(api: &'a A, id: &'a str) -> BoxFuture<'a, ApiResult<CredentialRecord>>
    where
        A: VaultApi + ?Sized,
    {
        api.get_credential(id)
    }

    fn update<'a, A>(api: &'a A, id: &'a str, input: &'a CredentialInput) -> BoxFuture<'a, ApiResult<()>>
    where
        A: VaultApi + ?Sized,
    {
        api.update_credential(id, input)
    }

    fn delete<'a, A>(api: &'a A, id: &'a str) -> BoxFuture<'a, ApiResult<()>>
    where
        A: VaultApi + ?Sized,
    {
        api.delete_credential(id)
    }

    fn overwrite(input: &CredentialInput) -> CredentialInput {
        input.overwrite()
    }

    fn from_input(id: String, input: &CredentialInput) -> Credential {
        Credential::from_input(id, input)
    }

    fn from_record(record: CredentialRecord) -> Credential {
        Credential::from(record)
    }

    fn complete<'a, A>(api: &'a A, id: &'a str, state: &'a mut Credential) -> BoxFuture<'a, Result<(), ApiError>>
    where
        A: VaultApi + ?Sized,
    {
        async move {
            let raw = api
                .get_credential_password(id)
                .await?
                .expect_status("GetCredentialSecret", StatusCode::OK)?;
            let secret = unquote_or_raw(&raw);
            state.password = (!secret.is_empty()).then_some(secret);
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::ROOT_FOLDER_ID;
    use crate::api::MemoryVault;
    use crate::models::Tag;
    use crate::reconcile::{ReadOutcome, Reconciler};

    fn spec(name: &str) -> CredentialSpec {
        CredentialSpec {
            name: name.to_string(),
            folder_id: ROOT_FOLDER_ID.to_string(),
            username: Some("testuser".to_string()),
            password: Some("hunter2".to_string()),
            url: Some("https://example.com".to_string()),
            notes: Some("testnotes".to_string()),
            expires: None,
            tags: Vec::new(),
        }
    }

    // ========================================================================
    // Create / Read
    // ========================================================================

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let vault = MemoryVault::new("u", "p").with_quoted_payloads();
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let created = credentials.create(&spec("acctest_cred")).await.unwrap();
        assert!(!created.id.contains('"'));
        assert_eq!(created.password.as_deref(), Some("hunter2"));

        let read = credentials.read(&created.id).await.unwrap().found().unwrap();
        assert_eq!(read.name, "acctest_cred");
        assert_eq!(read.username.as_deref(), Some("testuser"));
        assert_eq!(read.password.as_deref(), Some("hunter2"));
        assert_eq!(read.url.as_deref(), Some("https://example.com"));
        assert_eq!(read.folder_id, ROOT_FOLDER_ID);
        assert!(read.created.is_some());
    }

    #[tokio::test]
    async fn test_create_sends_tags_and_expiry() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let mut declared = spec("tagged");
        declared.expires = Some("2030-01-01T00:00:00".to_string());
        declared.tags = vec![Tag::new("prod"), Tag::new("db")];
        let created = credentials.create(&declared).await.unwrap();

        let read = credentials.get(&created.id).await.unwrap();
        assert_eq!(read.tag_names(), vec!["db", "prod"]);
        assert_eq!(read.expires.as_deref(), Some("2030-01-01T00:00:00"));
    }

    #[tokio::test]
    async fn test_create_in_missing_folder_fails() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let mut declared = spec("orphan");
        declared.folder_id = "no-such-folder".to_string();
        let err = credentials.create(&declared).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    // ========================================================================
    // Drift detection
    // ========================================================================

    #[tokio::test]
    async fn test_read_after_delete_is_not_found() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let created = credentials.create(&spec("gone")).await.unwrap();
        credentials.delete(&created.id).await.unwrap();

        assert_eq!(
            credentials.read(&created.id).await.unwrap(),
            ReadOutcome::NotFound
        );
        assert_eq!(vault.calls("GetCredentialSecret"), 0);
    }

    #[tokio::test]
    async fn test_gone_status_is_not_found() {
        let vault = MemoryVault::new("u", "p");
        vault.fail("GetCredential", None, StatusCode::GONE, "");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        assert!(credentials.read("anything").await.unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_secret_failure_is_error_not_drift() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);
        let created = credentials.create(&spec("secret")).await.unwrap();

        vault.fail("GetCredentialSecret", Some(&created.id), StatusCode::NOT_FOUND, "");
        let err = credentials.read(&created.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_on_read_is_error() {
        let vault = MemoryVault::new("u", "p");
        vault.fail("GetCredential", None, StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let err = credentials.read("anything").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.body(), Some("boom"));
    }

    #[tokio::test]
    async fn test_get_missing_is_error() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let err = credentials.get("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    // ========================================================================
    // Update
    // ========================================================================

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);
        let created = credentials.create(&spec("before")).await.unwrap();

        let mut declared = spec("after");
        declared.username = None;
        declared.password = Some("rotated".to_string());
        let updated = credentials.update(&created.id, &declared).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.password.as_deref(), Some("rotated"));

        let read = credentials.get(&created.id).await.unwrap();
        assert_eq!(read.name, "after");
        assert_eq!(read.username, None);
        assert_eq!(read.password.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_update_clears_removed_fields() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let mut declared = spec("cleared");
        declared.tags = vec![Tag::new("prod")];
        declared.expires = Some("2030-01-01T00:00:00".to_string());
        let created = credentials.create(&declared).await.unwrap();

        let stripped = CredentialSpec {
            name: "cleared".to_string(),
            folder_id: ROOT_FOLDER_ID.to_string(),
            ..CredentialSpec::default()
        };
        let updated = credentials.update(&created.id, &stripped).await.unwrap();
        let read = credentials.get(&created.id).await.unwrap();

        assert_eq!(read.username, None);
        assert_eq!(read.url, None);
        assert_eq!(read.notes, None);
        assert_eq!(read.expires, None);
        assert_eq!(read.password, None);
        assert!(read.tags.is_empty());
        assert_eq!(read.name, updated.name);
        assert_eq!(read.username, updated.username);
        assert_eq!(read.notes, updated.notes);
        assert_eq!(read.tags, updated.tags);
    }

    #[tokio::test]
    async fn test_update_missing_is_error() {
        let vault = MemoryVault::new("u", "p");
        let credentials: Reconciler<'_, CredentialKind, _> = Reconciler::new(&vault);

        let err = credentials.update("missing", &spec("x")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
