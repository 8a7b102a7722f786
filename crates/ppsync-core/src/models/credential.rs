use serde::{Deserialize, Serialize};

use super::non_empty;
use crate::api::{CredentialInput, CredentialRecord, TagRecord};

/// A name-only label attached to a credential or folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<TagRecord> for Tag {
    fn from(record: TagRecord) -> Self {
        Self {
            name: record.name.unwrap_or_default(),
        }
    }
}

impl From<&Tag> for TagRecord {
    fn from(tag: &Tag) -> Self {
        Self {
            name: Some(tag.name.clone()),
        }
    }
}

/// Declared state of a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    pub name: String,
    /// Owning folder.
    pub folder_id: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Write-only on the vault side; read back through a separate call.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl CredentialSpec {
    /// Full wire input; every update sends all of it.
    pub fn to_input(&self) -> CredentialInput {
        CredentialInput {
            name: Some(self.name.clone()),
            username: self.username.clone(),
            password: self.password.clone(),
            url: self.url.clone(),
            notes: self.notes.clone(),
            group_id: Some(self.folder_id.clone()),
            expires: self.expires.clone(),
            tags: self.tags.iter().map(TagRecord::from).collect(),
        }
    }
}

/// Credential as known to the vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    /// Only populated when the secret was fetched explicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub folder_id: String,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub expires: Option<String>,
    pub tags: Vec<Tag>,
}

impl Credential {
    /// Rebuild the resource from what was sent, for endpoints that do not echo it.
    pub fn from_input(id: String, input: &CredentialInput) -> Self {
        Self {
            id,
            name: input.name.clone().unwrap_or_default(),
            username: input.username.clone(),
            password: input.password.clone(),
            url: input.url.clone(),
            notes: input.notes.clone(),
            folder_id: input.group_id.clone().unwrap_or_default(),
            created: None,
            modified: None,
            expires: input.expires.clone(),
            tags: input.tags.iter().cloned().map(Tag::from).collect(),
        }
    }

    /// Tag names sorted, for order-insensitive comparison.
    pub fn tag_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl From<CredentialRecord> for Credential {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            username: non_empty(record.username),
            password: None,
            url: non_empty(record.url),
            notes: non_empty(record.notes),
            folder_id: record.group_id.unwrap_or_default(),
            created: record.created,
            modified: record.modified,
            expires: non_empty(record.expires),
            tags: record.tags.into_iter().map(Tag::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_to_input_carries_every_field() {
        let spec = CredentialSpec {
            name: "db".to_string(),
            folder_id: "f1".to_string(),
            username: Some("svc".to_string()),
            password: Some("hunter2".to_string()),
            url: Some("https://db.internal".to_string()),
            notes: Some("primary".to_string()),
            expires: Some("2030-01-01T00:00:00".to_string()),
            tags: vec![Tag::new("prod")],
        };
        let input = spec.to_input();
        let back = Credential::from_input("c1".to_string(), &input);

        assert_eq!(back.id, "c1");
        assert_eq!(back.name, spec.name);
        assert_eq!(back.folder_id, spec.folder_id);
        assert_eq!(back.password, spec.password);
        assert_eq!(back.tags, spec.tags);
        assert!(back.created.is_none());
        assert!(back.modified.is_none());
    }

    #[test]
    fn test_from_record_leaves_password_unset() {
        let record = CredentialRecord {
            id: "c1".to_string(),
            name: Some("db".to_string()),
            group_id: Some("f1".to_string()),
            created: Some("2024-01-01T00:00:00".to_string()),
            tags: vec![TagRecord { name: Some("b".to_string()) }, TagRecord { name: Some("a".to_string()) }],
            ..Default::default()
        };
        let credential = Credential::from(record);
        assert!(credential.password.is_none());
        assert_eq!(credential.created.as_deref(), Some("2024-01-01T00:00:00"));
        assert_eq!(credential.tag_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_record_reads_cleared_fields_as_unset() {
        let record = CredentialRecord {
            id: "c1".to_string(),
            username: Some(String::new()),
            url: Some(String::new()),
            notes: Some(String::new()),
            expires: Some(String::new()),
            ..Default::default()
        };
        let credential = Credential::from(record);
        assert!(credential.username.is_none());
        assert!(credential.url.is_none());
        assert!(credential.notes.is_none());
        assert!(credential.expires.is_none());
    }
}
