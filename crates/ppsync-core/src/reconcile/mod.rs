//! Resource reconciliation.
//!
//! `Reconciler` drives the create/read/update/delete contract for one
//! resource kind. The control flow (status expectations, id unquoting, drift
//! detection, logging) lives here once; `ResourceKind` supplies the field
//! mapping and the endpoints for folders and credentials.
//!
//! Updates are full overwrites: the complete declared object is sent every
//! time, with unset fields sent as explicit empty values, so repeating an
//! update is harmless.

pub mod credential;
pub mod folder;

use std::marker::PhantomData;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiResult, VaultApi};
use crate::utils::unquote_or_raw;

pub use credential::CredentialKind;
pub use folder::FolderKind;

/// Endpoint names used in errors and logs.
#[derive(Debug, Clone, Copy)]
pub struct Operations {
    pub create: &'static str,
    pub fetch: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

/// Field mapping and endpoints of one resource kind.
pub trait ResourceKind: Send + Sync + 'static {
    /// Name used in logs.
    const KIND: &'static str;
    const OPERATIONS: Operations;

    /// Declared state supplied by the caller.
    type Declared: Send + Sync;
    /// Wire input sent on create and update.
    type Input: Send + Sync;
    /// Wire shape returned by the fetch endpoint.
    type Record: Send;
    /// Tracked state returned to the caller.
    type State: Send;

    /// Map declared state to the complete wire input.
    fn prepare<'a, A>(api: &'a A, declared: &'a Self::Declared) -> BoxFuture<'a, Result<Self::Input, ApiError>>
    where
        A: VaultApi + ?Sized;

    fn create<'a, A>(api: &'a A, input: &'a Self::Input) -> BoxFuture<'a, ApiResult<String>>
    where
        A: VaultApi + ?Sized;

    fn fetch<'a, A>(api: &'a A, id: &'a str) -> BoxFuture<'a, ApiResult<Self::Record>>
    where
        A: VaultApi + ?Sized;

    fn update<'a, A>(api: &'a A, id: &'a str, input: &'a Self::Input) -> BoxFuture<'a, ApiResult<()>>
    where
        A: VaultApi + ?Sized;

    fn delete<'a, A>(api: &'a A, id: &'a str) -> BoxFuture<'a, ApiResult<()>>
    where
        A: VaultApi + ?Sized;

    /// PATCH body replacing every field of the resource with `input`.
    fn overwrite(input: &Self::Input) -> Self::Input;

    /// Rebuild tracked state from the declared input.
    fn from_input(id: String, input: &Self::Input) -> Self::State;

    fn from_record(record: Self::Record) -> Self::State;

    /// Fill in state the fetch endpoint does not return. Failures here are
    /// plain API errors, never drift.
    fn complete<'a, A>(api: &'a A, id: &'a str, state: &'a mut Self::State) -> BoxFuture<'a, Result<(), ApiError>>
    where
        A: VaultApi + ?Sized;
}

/// Result of reading a tracked resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Found(T),
    /// The resource was deleted outside of reconciliation. The caller must
    /// drop it from tracked state.
    NotFound,
}

impl<T> ReadOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            ReadOutcome::Found(state) => Some(state),
            ReadOutcome::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadOutcome::NotFound)
    }
}

/// Generic CRUD driver for resource kind `K` over API `A`.
pub struct Reconciler<'a, K, A: ?Sized> {
    api: &'a A,
    kind: PhantomData<K>,
}

impl<'a, K, A> Reconciler<'a, K, A>
where
    K: ResourceKind,
    A: VaultApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            kind: PhantomData,
        }
    }

    /// Create the resource and return it as sent, under the vault-assigned id.
    pub async fn create(&self, declared: &K::Declared) -> Result<K::State, ApiError> {
        let input = K::prepare(self.api, declared).await?;
        let raw_id = K::create(self.api, &input)
            .await?
            .expect_status(K::OPERATIONS.create, StatusCode::OK)?;

        let id = unquote_or_raw(&raw_id);
        info!(kind = K::KIND, id = %id, "Created resource");
        Ok(K::from_input(id, &input))
    }

    /// Read the live state of a tracked resource.
    ///
    /// A not-found answer to the primary fetch yields `ReadOutcome::NotFound`
    /// instead of an error.
    pub async fn read(&self, id: &str) -> Result<ReadOutcome<K::State>, ApiError> {
        match self.fetch_state(id).await {
            Ok(state) => Ok(ReadOutcome::Found(state)),
            Err(Fetch::Primary(err)) if err.is_not_found() => {
                warn!(kind = K::KIND, id = %id, "Resource no longer exists in the vault");
                Ok(ReadOutcome::NotFound)
            }
            Err(Fetch::Primary(err)) | Err(Fetch::Secondary(err)) => Err(err),
        }
    }

    /// Look up a resource by id; absence is an error.
    pub async fn get(&self, id: &str) -> Result<K::State, ApiError> {
        self.fetch_state(id).await.map_err(Fetch::into_inner)
    }

    /// Overwrite the resource with the complete declared state.
    ///
    /// The vault answers with no content, so the returned state is rebuilt from
    /// the declared input.
    pub async fn update(&self, id: &str, declared: &K::Declared) -> Result<K::State, ApiError> {
        let input = K::prepare(self.api, declared).await?;
        let body = K::overwrite(&input);
        K::update(self.api, id, &body)
            .await?
            .expect_status(K::OPERATIONS.update, StatusCode::NO_CONTENT)?;

        info!(kind = K::KIND, id = %id, "Updated resource");
        Ok(K::from_input(id.to_string(), &input))
    }

    /// Delete the resource.
    ///
    /// Deleting a folder removes every descendant folder and credential on the
    /// server; children must not be deleted separately, and reads of them
    /// afterwards report `ReadOutcome::NotFound`.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        K::delete(self.api, id)
            .await?
            .expect_status(K::OPERATIONS.delete, StatusCode::NO_CONTENT)?;

        info!(kind = K::KIND, id = %id, "Deleted resource");
        Ok(())
    }

    async fn fetch_state(&self, id: &str) -> Result<K::State, Fetch> {
        let record = K::fetch(self.api, id)
            .await
            .and_then(|reply| reply.expect_status(K::OPERATIONS.fetch, StatusCode::OK))
            .map_err(Fetch::Primary)?;

        let mut state = K::from_record(record);
        K::complete(self.api, id, &mut state)
            .await
            .map_err(Fetch::Secondary)?;

        debug!(kind = K::KIND, id = %id, "Read resource");
        Ok(state)
    }
}

/// Which call of a read failed.
enum Fetch {
    Primary(ApiError),
    Secondary(ApiError),
}

impl Fetch {
    fn into_inner(self) -> ApiError {
        match self {
            Fetch::Primary(err) | Fetch::Secondary(err) => err,
        }
    }
}
