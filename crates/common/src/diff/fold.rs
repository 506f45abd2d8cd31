// Folds adjacent add/delete runs of an edit script into `Replaced` pairs.
//
// A human rewriting line L into L' shows up in the raw script as a delete
// plus an add; fusing the pair lets the change-op translator anchor a
// single update to the surviving line id instead of a delete/insert churn.

use std::collections::VecDeque;

use super::Edit;

/// An edit-script element after replaced-pair folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtEdit<T> {
    Common(T),
    Added(T),
    Deleted(T),
    /// A fused adjacent add/delete pair: `new` replaces `old`.
    Replaced { new: T, old: T },
}

/// Adapts an edit-script iterator, fusing adjacent add/delete pairs.
pub fn fold_replaced<T, I>(inner: I) -> FoldReplaced<T, I>
where
    I: Iterator<Item = Edit<T>>,
{
    FoldReplaced {
        inner,
        staged: Vec::new(),
        opposite: Vec::new(),
        ready: VecDeque::new(),
        done: false,
    }
}

/// Iterator state for [`fold_replaced`].
///
/// `staged` holds a run of one kind; `opposite` holds the opposite-kind run
/// that follows it. Commons, a third same-kind run, or end-of-input flush
/// both buffers, pairing them positionally into `Replaced`.
pub struct FoldReplaced<T, I> {
    inner: I,
    staged: Vec<Edit<T>>,
    opposite: Vec<Edit<T>>,
    ready: VecDeque<ExtEdit<T>>,
    done: bool,
}

impl<T, I> Iterator for FoldReplaced<T, I>
where
    I: Iterator<Item = Edit<T>>,
{
    type Item = ExtEdit<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(out) = self.ready.pop_front() {
                return Some(out);
            }
            if self.done {
                return None;
            }
            match self.inner.next() {
                None => {
                    self.done = true;
                    self.flush();
                }
                Some(Edit::Common(value)) => {
                    self.flush();
                    self.ready.push_back(ExtEdit::Common(value));
                }
                Some(edit) => self.stage(edit),
            }
        }
    }
}

impl<T, I> FoldReplaced<T, I> {
    fn stage(&mut self, edit: Edit<T>) {
        let Some(last) = self.staged.last() else {
            self.staged.push(edit);
            return;
        };
        if same_kind(last, &edit) {
            if !self.opposite.is_empty() {
                self.flush();
            }
            self.staged.push(edit);
        } else {
            self.opposite.push(edit);
        }
    }

    /// Drains both buffers: the longer run's excess passes through as-is,
    /// the overlap pairs up into `Replaced`.
    fn flush(&mut self) {
        let n0 = self.staged.len();
        let n1 = self.opposite.len();
        if n0 == 0 && n1 == 0 {
            return;
        }

        let staged = std::mem::take(&mut self.staged);
        let opposite = std::mem::take(&mut self.opposite);
        if n0 > n1 {
            let mut staged = staged.into_iter();
            for _ in 0..n0 - n1 {
                let edit = staged.next().expect("staged run is longer than its excess");
                self.ready.push_back(passthrough(edit));
            }
            for (first, second) in staged.zip(opposite) {
                self.ready.push_back(pair(first, second));
            }
        } else {
            let mut opposite = opposite.into_iter();
            for (first, second) in staged.into_iter().zip(opposite.by_ref()) {
                self.ready.push_back(pair(first, second));
            }
            for edit in opposite {
                self.ready.push_back(passthrough(edit));
            }
        }
    }
}

fn same_kind<T>(lhs: &Edit<T>, rhs: &Edit<T>) -> bool {
    matches!(
        (lhs, rhs),
        (Edit::Added(_), Edit::Added(_)) | (Edit::Deleted(_), Edit::Deleted(_))
    )
}

fn passthrough<T>(edit: Edit<T>) -> ExtEdit<T> {
    match edit {
        Edit::Added(value) => ExtEdit::Added(value),
        Edit::Deleted(value) => ExtEdit::Deleted(value),
        Edit::Common(value) => ExtEdit::Common(value),
    }
}

/// `new` is always the added side, whichever buffer held it.
fn pair<T>(first: Edit<T>, second: Edit<T>) -> ExtEdit<T> {
    match (first, second) {
        (Edit::Added(new), Edit::Deleted(old)) | (Edit::Deleted(old), Edit::Added(new)) => {
            ExtEdit::Replaced { new, old }
        }
        _ => unreachable!("staging buffers hold opposite kinds when both are non-empty"),
    }
}
