//! JSON payloads exchanged with the Pleasant Password Server REST API (v6).
//!
//! Field names follow the server's PascalCase convention. These types are the
//! wire shape only; the domain types live in `crate::models`.

use serde::{Deserialize, Serialize};

// ============================================================================
// Authentication
// ============================================================================

/// Password grant sent to `/OAuth2/Token`.
#[derive(Clone)]
pub struct PasswordGrant {
    pub username: String,
    pub password: String,
    pub otp: Option<OtpChallenge>,
}

impl std::fmt::Debug for PasswordGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrant")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("otp", &self.otp.as_ref().map(|o| o.provider.as_deref()))
            .finish()
    }
}

/// Second factor attached to a password grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub code: String,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagRecord {
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// Folders (credential groups)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FolderInput {
    /// Body for a PATCH that replaces the whole folder.
    ///
    /// The server keeps any field missing from a PATCH, so unset text fields
    /// are sent as empty strings.
    pub fn overwrite(&self) -> Self {
        Self {
            notes: Some(self.notes.clone().unwrap_or_default()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<TagRecord>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub credentials: Vec<CredentialRecord>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<FolderRecord>,
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Always sent; `null` means no expiry.
    #[serde(default)]
    pub expires: Option<String>,
    /// Always sent; an empty list removes every tag.
    #[serde(default)]
    pub tags: Vec<TagRecord>,
}

impl CredentialInput {
    /// Body for a PATCH that replaces the whole credential.
    ///
    /// The server keeps any field missing from a PATCH, so unset text fields
    /// are sent as empty strings.
    pub fn overwrite(&self) -> Self {
        let text = |value: &Option<String>| Some(value.clone().unwrap_or_default());
        Self {
            username: text(&self.username),
            password: text(&self.password),
            url: text(&self.url),
            notes: text(&self.notes),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<TagRecord>,
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchInput {
    pub search: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchOutput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub credentials: Vec<CredentialSearchRecord>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<FolderSearchRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialSearchRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderSearchRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_path: Option<String>,
}

/// The server sends `null` instead of `[]` for empty collections.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
