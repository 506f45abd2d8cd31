// Metadata fetcher collaborator: page heads, project ids, session user.
//
// HTTP acquisition stays outside the core; production impls wrap the REST
// endpoints, tests supply fixtures.

use async_trait::async_trait;
use thiserror::Error;

use pagesync_common::types::PageSnapshot;

use crate::error::Error;

/// Why a metadata lookup failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Guest session.
    #[error("not logged in")]
    NotLoggedIn,
    /// The page exists but the caller may not edit it.
    #[error("page is not editable")]
    NotEditable,
    /// Network or server failure.
    #[error("fetch failed: {0}")]
    Transport(String),
}

/// Resolves page heads, project ids, and the session user.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the head of `title` in `project`.
    async fn page(&self, project: &str, title: &str) -> Result<PageSnapshot, FetchError>;

    /// Resolves a project name to its id.
    async fn project_id(&self, project: &str) -> Result<String, FetchError>;

    /// The logged-in user's id.
    async fn user_id(&self) -> Result<String, FetchError>;
}

/// Fetches the page head, converting a non-editable page into
/// [`Error::Forbidden`].
pub async fn ensure_editable_page(
    fetcher: &dyn PageFetcher,
    project: &str,
    title: &str,
) -> Result<PageSnapshot, Error> {
    fetcher.page(project, title).await.map_err(|error| match error {
        FetchError::NotEditable => {
            Error::Forbidden { project: project.to_string(), title: title.to_string() }
        }
        other => other.into(),
    })
}
