// Wire envelopes for the page-room socket protocol.
//
// Requests ride the `socket.io-request` RPC channel as `{method, data}`
// objects; commit notifications and project-stream events arrive on named
// event channels.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::change::Change;

/// RPC channel every request envelope is written to.
pub const REQUEST_CHANNEL: &str = "socket.io-request";
/// Event channel carrying commit notifications for a joined page room.
pub const PAGE_COMMIT_EVENT: &str = "commit";
/// Project-wide stream channel for non-commit events.
pub const PROJECT_EVENT_STREAM: &str = "projectUpdatesStream:event";
/// Project-wide stream channel for commits.
pub const PROJECT_COMMIT_STREAM: &str = "projectUpdatesStream:commit";

/// Commit kind discriminator; pages are the only kind this client commits.
pub const PAGE_COMMIT_KIND: &str = "page";

/// A request written to [`REQUEST_CHANNEL`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", content = "data")]
pub enum RequestEnvelope {
    #[serde(rename = "room:join")]
    RoomJoin(RoomJoinData),
    #[serde(rename = "commit")]
    Commit(CommitData),
}

/// `room:join` payload.
///
/// `page_id: None` with `project_updates_stream: true` joins the
/// project-wide stream instead of a single page room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinData {
    pub project_id: String,
    pub page_id: Option<String>,
    pub project_updates_stream: bool,
}

/// `commit` payload: an ordered change batch against `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitData {
    pub kind: String,
    pub project_id: String,
    pub parent_id: String,
    pub page_id: String,
    pub user_id: String,
    pub changes: Vec<Change>,
    pub cursor: Option<Value>,
    pub freeze: bool,
}

impl CommitData {
    /// A page commit with the fixed `kind`/`cursor`/`freeze` plumbing.
    pub fn page(
        project_id: impl Into<String>,
        parent_id: impl Into<String>,
        page_id: impl Into<String>,
        user_id: impl Into<String>,
        changes: Vec<Change>,
    ) -> Self {
        Self {
            kind: PAGE_COMMIT_KIND.to_string(),
            project_id: project_id.into(),
            parent_id: parent_id.into(),
            page_id: page_id.into(),
            user_id: user_id.into(),
            changes,
            cursor: None,
            freeze: true,
        }
    }
}

/// Server acknowledgement of an accepted commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitAck {
    pub commit_id: String,
}

/// A commit observed in a joined room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitNotification {
    /// The new head commit id.
    pub id: String,
    pub changes: Vec<Change>,
    /// Author of the commit.
    pub user_id: String,
}
