// Applies a commit's change-ops to a mirrored line list.

use thiserror::Error;

use crate::change::Change;
use crate::id::time_of;
use crate::types::{Line, END_ANCHOR};

/// A structural op named a line id absent from the current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("anchor line `{id}` not found in the page")]
pub struct MissingAnchor {
    pub id: String,
}

/// Applies `changes` left-to-right to a copy of `lines` and returns the
/// post-image; the pre-image stays untouched.
///
/// `updated` stamps `_update`d lines. Inserted lines take their `created`
/// and `updated` stamps from the timestamp embedded in their minted id and
/// their owner from `user_id`. Metadata ops (`title`, `descriptions`,
/// `deleted`) are server-side and pass through untouched.
pub fn apply_commit(
    lines: &[Line],
    changes: &[Change],
    updated: i64,
    user_id: &str,
) -> Result<Vec<Line>, MissingAnchor> {
    let mut next: Vec<Line> = lines.to_vec();

    for change in changes {
        match change {
            Change::Insert { anchor, lines: payload } => {
                let created = time_of(&payload.id).unwrap_or(updated);
                let line = Line {
                    id: payload.id.clone(),
                    text: payload.text.clone(),
                    user_id: user_id.to_string(),
                    created,
                    updated: created,
                };
                if anchor == END_ANCHOR {
                    next.push(line);
                } else {
                    let at = position_of(&next, anchor)?;
                    next.insert(at, line);
                }
            }
            Change::Update { id, lines: payload } => {
                let at = position_of(&next, id)?;
                next[at].text = payload.text.clone();
                next[at].updated = updated;
            }
            Change::Delete { id, .. } => {
                let at = position_of(&next, id)?;
                next.remove(at);
            }
            Change::Title { .. } | Change::Descriptions { .. } | Change::Deleted { .. } => {}
        }
    }

    Ok(next)
}

fn position_of(lines: &[Line], id: &str) -> Result<usize, MissingAnchor> {
    lines
        .iter()
        .position(|line| line.id == id)
        .ok_or_else(|| MissingAnchor { id: id.to_string() })
}
