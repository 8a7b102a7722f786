//! In-memory vault for testing.
//!
//! `MemoryVault` implements `VaultApi` against plain maps, mirroring the
//! server behaviours the reconciler depends on: a well-known root folder,
//! vault-generated ids, 404 for unknown ids, cascading folder deletes and the
//! occasional JSON-quoted string payload. It also counts calls per endpoint.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;

use super::wire::{
    CredentialInput, CredentialRecord, CredentialSearchRecord, FolderInput, FolderRecord,
    FolderSearchRecord, PasswordGrant, SearchInput, SearchOutput, TagRecord, TokenResponse,
};
use super::{ApiError, ApiResult, Reply, VaultApi};

/// Id the server reports for the root folder.
pub const ROOT_FOLDER_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Name of the root folder, first element of every search path.
const ROOT_FOLDER_NAME: &str = "Root";

/// Separator the server uses in search paths.
const PATH_SEPARATOR: &str = "\\";

/// Lifetime reported for issued tokens, in seconds.
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct StoredFolder {
    seq: u64,
    name: Option<String>,
    parent_id: Option<String>,
    notes: Option<String>,
    tags: Vec<TagRecord>,
    created: String,
    modified: String,
}

#[derive(Debug, Clone)]
struct StoredCredential {
    seq: u64,
    input: CredentialInput,
    created: String,
    modified: String,
}

#[derive(Debug, Clone)]
struct Failure {
    operation: &'static str,
    id: Option<String>,
    status: StatusCode,
    body: String,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    folders: HashMap<String, StoredFolder>,
    credentials: HashMap<String, StoredCredential>,
    calls: HashMap<&'static str, usize>,
    failures: Vec<Failure>,
}

/// In-memory vault.
///
/// Useful for testing and dry runs. All data is lost on drop.
#[derive(Debug)]
pub struct MemoryVault {
    state: Mutex<State>,
    username: String,
    password: String,
    quote_payloads: bool,
}

fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

impl MemoryVault {
    /// Create a vault holding only the root folder, accepting `username`/`password`.
    pub fn new(username: &str, password: &str) -> Self {
        let mut state = State::default();
        let stamp = now();
        state.folders.insert(
            ROOT_FOLDER_ID.to_string(),
            StoredFolder {
                seq: 0,
                name: Some(ROOT_FOLDER_NAME.to_string()),
                parent_id: None,
                notes: None,
                tags: Vec::new(),
                created: stamp.clone(),
                modified: stamp,
            },
        );
        state.next_seq = 1;

        Self {
            state: Mutex::new(state),
            username: username.to_string(),
            password: password.to_string(),
            quote_payloads: false,
        }
    }

    /// Return ids and secrets wrapped in JSON quotes, as some server versions do.
    pub fn with_quoted_payloads(mut self) -> Self {
        self.quote_payloads = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of calls made to `operation` (e.g. `"GetFolder"`).
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Total number of calls made to any endpoint.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Make every call to `operation` fail with `status`, optionally only for one id.
    pub fn fail(&self, operation: &'static str, id: Option<&str>, status: StatusCode, body: &str) {
        self.lock().failures.push(Failure {
            operation,
            id: id.map(str::to_string),
            status,
            body: body.to_string(),
        });
    }

    /// Replace the tags of a folder. Folder tags are not writable through the
    /// folder endpoints.
    pub fn set_folder_tags(&self, id: &str, tags: &[&str]) -> bool {
        let mut state = self.lock();
        match state.folders.get_mut(id) {
            Some(folder) => {
                folder.tags = tags
                    .iter()
                    .map(|t| TagRecord {
                        name: Some((*t).to_string()),
                    })
                    .collect();
                true
            }
            None => false,
        }
    }

    pub fn contains_folder(&self, id: &str) -> bool {
        self.lock().folders.contains_key(id)
    }

    pub fn contains_credential(&self, id: &str) -> bool {
        self.lock().credentials.contains_key(id)
    }

    fn quote(&self, raw: String) -> String {
        if self.quote_payloads {
            serde_json::Value::String(raw).to_string()
        } else {
            raw
        }
    }

    /// Record the call and apply any injected failure.
    fn enter(&self, operation: &'static str, id: Option<&str>) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;

        let injected = state.failures.iter().find(|f| {
            f.operation == operation && (f.id.is_none() || f.id.as_deref() == id)
        });
        if let Some(failure) = injected {
            return Err(ApiError::from_status(operation, failure.status, &failure.body));
        }
        Ok(state)
    }
}

fn merge(stored: &mut Option<String>, sent: &Option<String>) {
    if let Some(value) = sent {
        *stored = Some(value.clone());
    }
}

fn not_found(operation: &'static str, id: &str) -> ApiError {
    ApiError::from_status(
        operation,
        StatusCode::NOT_FOUND,
        &format!("{{\"Message\":\"No object found with id {}\"}}", id),
    )
}

fn bad_request(operation: &'static str, message: &str) -> ApiError {
    ApiError::from_status(
        operation,
        StatusCode::BAD_REQUEST,
        &format!("{{\"Message\":\"{}\"}}", message),
    )
}

impl State {
    fn next_id(&mut self) -> (String, u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        (format!("00000000-0000-0000-0000-{:012x}", seq), seq)
    }

    fn child_ids(&self, parent: &str) -> Vec<String> {
        let mut children: Vec<(&String, &StoredFolder)> = self
            .folders
            .iter()
            .filter(|(_, f)| f.parent_id.as_deref() == Some(parent))
            .collect();
        children.sort_by_key(|(_, f)| f.seq);
        children.into_iter().map(|(id, _)| id.clone()).collect()
    }

    fn credential_ids(&self, folder: &str) -> Vec<String> {
        let mut creds: Vec<(&String, &StoredCredential)> = self
            .credentials
            .iter()
            .filter(|(_, c)| c.input.group_id.as_deref() == Some(folder))
            .collect();
        creds.sort_by_key(|(_, c)| c.seq);
        creds.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// `id` itself or any folder below it.
    fn is_within(&self, id: &str, ancestor: &str) -> bool {
        let mut current = Some(id.to_string());
        while let Some(folder_id) = current {
            if folder_id == ancestor {
                return true;
            }
            current = self.folders.get(&folder_id).and_then(|f| f.parent_id.clone());
        }
        false
    }

    fn path_of(&self, id: &str) -> String {
        let mut names = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(folder_id) = current {
            match self.folders.get(&folder_id) {
                Some(folder) => {
                    names.push(folder.name.clone().unwrap_or_default());
                    current = folder.parent_id.clone();
                }
                None => break,
            }
        }
        names.reverse();
        names.join(PATH_SEPARATOR)
    }

    fn credential_record(&self, id: &str) -> Option<CredentialRecord> {
        self.credentials.get(id).map(|c| CredentialRecord {
            id: id.to_string(),
            name: c.input.name.clone(),
            username: c.input.username.clone(),
            url: c.input.url.clone(),
            notes: c.input.notes.clone(),
            group_id: c.input.group_id.clone(),
            created: Some(c.created.clone()),
            modified: Some(c.modified.clone()),
            expires: c.input.expires.clone(),
            tags: c.input.tags.clone(),
        })
    }

    /// Folder with its credentials and, when `depth > 0`, its children.
    fn folder_record(&self, id: &str, depth: usize) -> Option<FolderRecord> {
        let folder = self.folders.get(id)?;
        let children = if depth == 0 {
            Vec::new()
        } else {
            self.child_ids(id)
                .iter()
                .filter_map(|child| self.folder_record(child, depth - 1))
                .collect()
        };
        Some(FolderRecord {
            id: id.to_string(),
            name: folder.name.clone(),
            parent_id: folder.parent_id.clone(),
            notes: folder.notes.clone(),
            created: Some(folder.created.clone()),
            modified: Some(folder.modified.clone()),
            expires: None,
            tags: folder.tags.clone(),
            credentials: self
                .credential_ids(id)
                .iter()
                .filter_map(|c| self.credential_record(c))
                .collect(),
            children,
        })
    }

    fn require_folder(&self, operation: &'static str, id: &str) -> Result<(), ApiError> {
        if self.folders.contains_key(id) {
            Ok(())
        } else {
            Err(bad_request(operation, &format!("Folder {} does not exist", id)))
        }
    }
}

#[async_trait]
impl VaultApi for MemoryVault {
    async fn request_token(&self, grant: &PasswordGrant) -> ApiResult<TokenResponse> {
        let _state = self.enter("Authenticate", None)?;
        if grant.username != self.username || grant.password != self.password {
            return Err(bad_request(
                "Authenticate",
                "The user name or password is incorrect.",
            ));
        }
        Ok(Reply::new(
            StatusCode::OK,
            TokenResponse {
                access_token: format!("memory-token-{}", grant.username),
                token_type: Some("bearer".to_string()),
                expires_in: Some(TOKEN_LIFETIME_SECS),
            },
        ))
    }

    async fn folder_root(&self) -> ApiResult<String> {
        let _state = self.enter("GetFolderRoot", None)?;
        Ok(Reply::new(StatusCode::OK, self.quote(ROOT_FOLDER_ID.to_string())))
    }

    async fn get_folder(&self, id: &str) -> ApiResult<FolderRecord> {
        let state = self.enter("GetFolder", Some(id))?;
        state
            .folder_record(id, 1)
            .map(|record| Reply::new(StatusCode::OK, record))
            .ok_or_else(|| not_found("GetFolder", id))
    }

    async fn create_folder(&self, input: &FolderInput) -> ApiResult<String> {
        let operation = "CreateFolder";
        let mut state = self.enter(operation, None)?;
        let parent = input
            .parent_id
            .clone()
            .unwrap_or_else(|| ROOT_FOLDER_ID.to_string());
        state.require_folder(operation, &parent)?;

        let (id, seq) = state.next_id();
        let stamp = now();
        state.folders.insert(
            id.clone(),
            StoredFolder {
                seq,
                name: input.name.clone(),
                parent_id: Some(parent),
                notes: input.notes.clone(),
                tags: Vec::new(),
                created: stamp.clone(),
                modified: stamp,
            },
        );
        Ok(Reply::new(StatusCode::OK, self.quote(id)))
    }

    /// PATCH semantics: fields missing from `input` keep their stored value.
    async fn update_folder(&self, id: &str, input: &FolderInput) -> ApiResult<()> {
        let operation = "UpdateFolder";
        let mut state = self.enter(operation, Some(id))?;
        if !state.folders.contains_key(id) {
            return Err(not_found(operation, id));
        }
        if let Some(ref parent) = input.parent_id {
            state.require_folder(operation, parent)?;
            if id == ROOT_FOLDER_ID || state.is_within(parent, id) {
                return Err(bad_request(operation, "A folder cannot be moved below itself"));
            }
        }

        if let Some(folder) = state.folders.get_mut(id) {
            merge(&mut folder.name, &input.name);
            merge(&mut folder.notes, &input.notes);
            merge(&mut folder.parent_id, &input.parent_id);
            folder.modified = now();
        }
        Ok(Reply::new(StatusCode::NO_CONTENT, ()))
    }

    async fn delete_folder(&self, id: &str) -> ApiResult<()> {
        let operation = "DeleteFolder";
        let mut state = self.enter(operation, Some(id))?;
        if id == ROOT_FOLDER_ID {
            return Err(bad_request(operation, "The root folder cannot be deleted"));
        }
        if !state.folders.contains_key(id) {
            return Err(not_found(operation, id));
        }

        let doomed: Vec<String> = state
            .folders
            .keys()
            .filter(|candidate| state.is_within(candidate, id))
            .cloned()
            .collect();
        state.credentials.retain(|_, c| {
            !c.input
                .group_id
                .as_ref()
                .is_some_and(|group| doomed.contains(group))
        });
        for folder in &doomed {
            state.folders.remove(folder);
        }
        Ok(Reply::new(StatusCode::NO_CONTENT, ()))
    }

    async fn get_credential(&self, id: &str) -> ApiResult<CredentialRecord> {
        let state = self.enter("GetCredential", Some(id))?;
        state
            .credential_record(id)
            .map(|record| Reply::new(StatusCode::OK, record))
            .ok_or_else(|| not_found("GetCredential", id))
    }

    async fn get_credential_password(&self, id: &str) -> ApiResult<String> {
        let state = self.enter("GetCredentialSecret", Some(id))?;
        let password = state
            .credentials
            .get(id)
            .map(|c| c.input.password.clone().unwrap_or_default())
            .ok_or_else(|| not_found("GetCredentialSecret", id))?;
        drop(state);
        Ok(Reply::new(StatusCode::OK, self.quote(password)))
    }

    async fn create_credential(&self, input: &CredentialInput) -> ApiResult<String> {
        let operation = "CreateCredential";
        let mut state = self.enter(operation, None)?;
        let group = input
            .group_id
            .clone()
            .ok_or_else(|| bad_request(operation, "GroupId is required"))?;
        state.require_folder(operation, &group)?;

        let (id, seq) = state.next_id();
        let stamp = now();
        state.credentials.insert(
            id.clone(),
            StoredCredential {
                seq,
                input: input.clone(),
                created: stamp.clone(),
                modified: stamp,
            },
        );
        Ok(Reply::new(StatusCode::OK, self.quote(id)))
    }

    /// PATCH semantics: fields missing from `input` keep their stored value.
    /// `Expires` and `Tags` are always part of the body and always replaced.
    async fn update_credential(&self, id: &str, input: &CredentialInput) -> ApiResult<()> {
        let operation = "UpdateCredential";
        let mut state = self.enter(operation, Some(id))?;
        if !state.credentials.contains_key(id) {
            return Err(not_found(operation, id));
        }
        if let Some(ref group) = input.group_id {
            state.require_folder(operation, group)?;
        }

        if let Some(credential) = state.credentials.get_mut(id) {
            let stored = &mut credential.input;
            merge(&mut stored.name, &input.name);
            merge(&mut stored.username, &input.username);
            merge(&mut stored.password, &input.password);
            merge(&mut stored.url, &input.url);
            merge(&mut stored.notes, &input.notes);
            merge(&mut stored.group_id, &input.group_id);
            stored.expires = input.expires.clone();
            stored.tags = input.tags.clone();
            credential.modified = now();
        }
        Ok(Reply::new(StatusCode::NO_CONTENT, ()))
    }

    async fn delete_credential(&self, id: &str) -> ApiResult<()> {
        let operation = "DeleteCredential";
        let mut state = self.enter(operation, Some(id))?;
        match state.credentials.remove(id) {
            Some(_) => Ok(Reply::new(StatusCode::NO_CONTENT, ())),
            None => Err(not_found(operation, id)),
        }
    }

    async fn search(&self, input: &SearchInput) -> ApiResult<SearchOutput> {
        let state = self.enter("Search", None)?;
        let needle = input.search.to_lowercase();
        let matches = |value: &Option<String>| {
            value
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };

        let mut folder_ids: Vec<(&String, &StoredFolder)> = state
            .folders
            .iter()
            .filter(|(id, f)| id.as_str() != ROOT_FOLDER_ID && matches(&f.name))
            .collect();
        folder_ids.sort_by_key(|(_, f)| f.seq);
        let groups = folder_ids
            .into_iter()
            .map(|(id, f)| FolderSearchRecord {
                id: id.clone(),
                name: f.name.clone(),
                full_path: Some(state.path_of(id)),
            })
            .collect();

        let mut credential_ids: Vec<(&String, &StoredCredential)> = state
            .credentials
            .iter()
            .filter(|(_, c)| {
                matches(&c.input.name) || matches(&c.input.username) || matches(&c.input.url)
            })
            .collect();
        credential_ids.sort_by_key(|(_, c)| c.seq);
        let credentials = credential_ids
            .into_iter()
            .map(|(id, c)| CredentialSearchRecord {
                id: id.clone(),
                name: c.input.name.clone(),
                username: c.input.username.clone(),
                url: c.input.url.clone(),
                notes: c.input.notes.clone(),
                group_id: c.input.group_id.clone(),
                path: c.input.group_id.as_deref().map(|g| state.path_of(g)),
            })
            .collect();

        Ok(Reply::new(StatusCode::OK, SearchOutput { credentials, groups }))
    }
}
