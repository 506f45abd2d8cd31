// Core domain types shared across all pagesync crates.

use serde::{Deserialize, Serialize};

/// Anchor sentinel meaning "after the last line" in insert ops.
///
/// Never a stored line id; only valid inside a change-op anchor.
pub const END_ANCHOR: &str = "_end";

/// One identified line of a page.
///
/// `id` is a 24-hex-char token whose first 8 digits encode the unix second
/// of creation (see [`crate::id`]). The first line of a page is its title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: String,
    pub text: String,
    /// Id of the user whose commit created the line.
    pub user_id: String,
    /// Unix seconds at creation.
    pub created: i64,
    /// Unix seconds at the last text update.
    pub updated: i64,
}

/// A page head as reported by the metadata fetcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub id: String,
    /// Latest commit id of the page's history head.
    pub commit_id: String,
    pub lines: Vec<Line>,
    /// False while the page has never been materialized server-side.
    pub persistent: bool,
}
