// Error kinds surfaced to callers of the page-editing core.

use thiserror::Error;

use pagesync_common::apply::MissingAnchor;
use pagesync_common::diff::BadAnchor;

use crate::fetch::FetchError;

/// Everything a room or stream call can fail with.
///
/// [`Error::Transport`] on a commit is caught by the push retry loop; every
/// other kind propagates to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Guest session: there is no user to attribute commits to.
    #[error("not logged in")]
    NotLoggedIn,

    /// The caller has no edit privilege on the page.
    #[error("no edit privilege on /{project}/{title}")]
    Forbidden { project: String, title: String },

    /// A change-op named a line id absent from the current state.
    #[error(transparent)]
    MissingAnchor(#[from] MissingAnchor),

    /// A whole-document diff ran past end-of-page on a non-append.
    #[error(transparent)]
    BadAnchor(#[from] BadAnchor),

    /// Conflict retries were exhausted without a successful push.
    #[error("push gave up after {attempts} conflict retries")]
    PushExhausted { attempts: u32 },

    /// The room was cleaned up; join again to keep editing.
    #[error("room is closed")]
    RoomClosed,

    /// The socket layer lost the connection or rejected a request.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<FetchError> for Error {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NotLoggedIn => Error::NotLoggedIn,
            // `ensure_editable_page` maps this with page context; a bare
            // conversion only happens on unexpected paths.
            FetchError::NotEditable => Error::Transport("page is not editable".to_string()),
            FetchError::Transport(message) => Error::Transport(message),
        }
    }
}
