// Translates a whole-document diff into anchored change-ops.

use thiserror::Error;

use crate::change::Change;
use crate::id::new_line_id;
use crate::types::{Line, END_ANCHOR};

use super::{diff, fold_replaced, ExtEdit};

/// The edit cursor ran past the end of the pre-image on a non-append.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("edit ran past the end of the page on a non-append")]
pub struct BadAnchor;

/// Computes the change-ops that turn `left` into the texts of `right`.
///
/// Ops are anchored to pre-image line ids and apply left-to-right; inserted
/// lines get fresh ids minted for `user_id`.
pub fn diff_to_changes(
    left: &[Line],
    right: &[String],
    user_id: &str,
) -> Result<Vec<Change>, BadAnchor> {
    let left_texts: Vec<&str> = left.iter().map(|line| line.text.as_str()).collect();
    let right_texts: Vec<&str> = right.iter().map(String::as_str).collect();

    let mut changes = Vec::new();
    let mut line_no = 0usize;
    let mut line_id = left.first().map(|line| line.id.as_str()).unwrap_or(END_ANCHOR);

    for edit in fold_replaced(diff(&left_texts, &right_texts)) {
        match edit {
            ExtEdit::Added(text) => {
                // Appends anchor to "_end"; the pre-image cursor stays put.
                changes.push(Change::insert(line_id, new_line_id(user_id), *text));
                continue;
            }
            ExtEdit::Deleted(_) => {
                if line_id == END_ANCHOR {
                    return Err(BadAnchor);
                }
                changes.push(Change::delete(line_id));
            }
            ExtEdit::Replaced { new, .. } => {
                if line_id == END_ANCHOR {
                    return Err(BadAnchor);
                }
                changes.push(Change::update(line_id, *new));
            }
            ExtEdit::Common(_) => {
                if line_id == END_ANCHOR {
                    return Err(BadAnchor);
                }
            }
        }
        line_no += 1;
        line_id = left.get(line_no).map(|line| line.id.as_str()).unwrap_or(END_ANCHOR);
    }

    Ok(changes)
}
