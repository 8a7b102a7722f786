//! Vault-wide search.

use reqwest::StatusCode;
use tracing::debug;

use crate::api::{ApiError, SearchInput, VaultApi};
use crate::models::SearchResults;

/// Runs a vault search and projects the result into hit lists.
pub struct SearchProjector<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> SearchProjector<'a, A>
where
    A: VaultApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// One search call; paths are passed through as the vault formats them.
    pub async fn search(&self, query: &str) -> Result<SearchResults, ApiError> {
        let input = SearchInput {
            search: query.to_string(),
        };
        let output = self
            .api
            .search(&input)
            .await?
            .expect_status("Search", StatusCode::OK)?;

        let results = SearchResults::from(output);
        debug!(
            credentials = results.credentials.len(),
            folders = results.folders.len(),
            "Search completed"
        );
        Ok(results)
    }
}
