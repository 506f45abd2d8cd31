// Change-ops exchanged inside a commit batch.
//
// Ops apply left-to-right; an op's anchor must exist in the state produced
// by all prior ops in the same batch. Wire forms:
//
//   {"_insert": "<id>"|"_end", "lines": {"id": "...", "text": "..."}}
//   {"_update": "<id>", "lines": {"text": "..."}}
//   {"_delete": "<id>", "lines": -1}
//   {"title": "..."}
//   {"descriptions": ["...", ...]}
//   {"deleted": true}

use serde::{Deserialize, Serialize};

/// Payload of an `_insert` op: the new line's identity and text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsertLines {
    pub id: String,
    pub text: String,
}

/// Payload of an `_update` op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateLines {
    pub text: String,
}

/// One ordered record inside a commit batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Change {
    /// Insert a new line before the anchor, or append when the anchor is
    /// [`crate::types::END_ANCHOR`].
    Insert {
        #[serde(rename = "_insert")]
        anchor: String,
        lines: InsertLines,
    },
    /// Replace the text of the anchored line.
    Update {
        #[serde(rename = "_update")]
        id: String,
        lines: UpdateLines,
    },
    /// Delete the anchored line. The payload is the literal `-1`.
    Delete {
        #[serde(rename = "_delete")]
        id: String,
        lines: i64,
    },
    /// Set the page title (server-side metadata).
    Title { title: String },
    /// Set the line-2..line-6 description snapshot.
    Descriptions { descriptions: Vec<String> },
    /// Delete the whole page. The only form permitted alone in a batch.
    Deleted { deleted: bool },
}

impl Change {
    pub fn insert(
        anchor: impl Into<String>,
        id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::Insert {
            anchor: anchor.into(),
            lines: InsertLines { id: id.into(), text: text.into() },
        }
    }

    pub fn update(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Update { id: id.into(), lines: UpdateLines { text: text.into() } }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into(), lines: -1 }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self::Title { title: title.into() }
    }

    pub fn descriptions(descriptions: Vec<String>) -> Self {
        Self::Descriptions { descriptions }
    }

    pub fn deleted() -> Self {
        Self::Deleted { deleted: true }
    }
}
