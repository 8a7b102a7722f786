use serde::{Deserialize, Serialize};

use crate::api::{CredentialSearchRecord, FolderSearchRecord, SearchOutput};

/// Credential matching a search, with the vault-computed folder path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHit {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub folder_id: String,
    pub path: String,
}

/// Folder matching a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderHit {
    pub id: String,
    pub name: String,
    pub full_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub credentials: Vec<CredentialHit>,
    pub folders: Vec<FolderHit>,
}

impl From<CredentialSearchRecord> for CredentialHit {
    fn from(record: CredentialSearchRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            username: record.username,
            url: record.url,
            notes: record.notes,
            folder_id: record.group_id.unwrap_or_default(),
            path: record.path.unwrap_or_default(),
        }
    }
}

impl From<FolderSearchRecord> for FolderHit {
    fn from(record: FolderSearchRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            full_path: record.full_path.unwrap_or_default(),
        }
    }
}

impl From<SearchOutput> for SearchResults {
    fn from(output: SearchOutput) -> Self {
        Self {
            credentials: output.credentials.into_iter().map(CredentialHit::from).collect(),
            folders: output.groups.into_iter().map(FolderHit::from).collect(),
        }
    }
}
