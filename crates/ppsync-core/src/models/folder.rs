use serde::{Deserialize, Serialize};

use super::{non_empty, Credential, Tag};
use crate::api::{FolderInput, FolderRecord};

/// Declared state of a folder. An unset parent means the root folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSpec {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FolderSpec {
    /// Wire input with the parent already resolved.
    pub fn to_input(&self, parent_id: String) -> FolderInput {
        FolderInput {
            name: Some(self.name.clone()),
            parent_id: Some(parent_id),
            notes: self.notes.clone(),
        }
    }
}

/// Tracked state of a single folder resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderResource {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub notes: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub expires: Option<String>,
}

impl FolderResource {
    pub fn from_input(id: String, input: &FolderInput) -> Self {
        Self {
            id,
            name: input.name.clone().unwrap_or_default(),
            parent_id: input.parent_id.clone(),
            notes: input.notes.clone(),
            created: None,
            modified: None,
            expires: None,
        }
    }
}

impl From<FolderRecord> for FolderResource {
    fn from(record: FolderRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            parent_id: record.parent_id,
            notes: non_empty(record.notes),
            created: record.created,
            modified: record.modified,
            expires: non_empty(record.expires),
        }
    }
}

/// A folder with its whole subtree.
///
/// Children are owned values; the vault guarantees the hierarchy is a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub notes: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub expires: Option<String>,
    pub tags: Vec<Tag>,
    pub credentials: Vec<Credential>,
    pub children: Vec<Folder>,
}

impl Folder {
    /// Map one folder record without its children.
    pub fn from_record_shallow(record: FolderRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            parent_id: record.parent_id,
            notes: non_empty(record.notes),
            created: record.created,
            modified: record.modified,
            expires: non_empty(record.expires),
            tags: record.tags.into_iter().map(Tag::from).collect(),
            credentials: record.credentials.into_iter().map(Credential::from).collect(),
            children: Vec::new(),
        }
    }

    /// Number of levels in the tree; a folder without children has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Folder::depth).max().unwrap_or(0)
    }

    /// Number of folders below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Number of credentials in this folder and all descendants.
    pub fn credential_count(&self) -> usize {
        self.credentials.len()
            + self
                .children
                .iter()
                .map(Folder::credential_count)
                .sum::<usize>()
    }

    /// Find a folder by id in this subtree.
    pub fn find(&self, id: &str) -> Option<&Folder> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}
