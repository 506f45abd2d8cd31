// Line diff engine: shortest edit script, replaced-pair folding, and the
// translation of a whole-document diff into anchored change-ops.

mod fold;
mod ops;
mod ses;

pub use fold::{fold_replaced, ExtEdit, FoldReplaced};
pub use ops::{diff_to_changes, BadAnchor};
pub use ses::{diff, Diff, Edit};
