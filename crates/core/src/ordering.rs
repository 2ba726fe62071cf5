//! Dense ordered-sequence algorithms backing playlist membership.
//!
//! A sequence's positions are its vector indices, so after every operation
//! positions are `0..len` with no gaps. The store layer persists only the
//! slots reported by [`rewrite_plan`].

use std::ops::Range;

/// Append `items`, returning the positions they now occupy (`[len, len+n)`).
pub fn append<T>(seq: &mut Vec<T>, items: impl IntoIterator<Item = T>) -> Range<usize> {
    let start = seq.len();
    seq.extend(items);
    start..seq.len()
}

/// Remove every element matching `pred`, closing the gaps (stable splice).
///
/// Returns the number of elements removed.
pub fn remove_where<T>(seq: &mut Vec<T>, mut pred: impl FnMut(&T) -> bool) -> usize {
    let before = seq.len();
    seq.retain(|item| !pred(item));
    before - seq.len()
}

/// Move the first element matching `pred` to `new_position`.
///
/// The target is taken out first; `new_position` is then clamped to
/// `[0, len-1]` of the remaining sequence (i.e. to the last slot of the full
/// sequence). Other elements keep their relative order. Returns the final
/// position of the target, or `None` (sequence untouched) when nothing
/// matches.
pub fn reorder<T>(
    seq: &mut Vec<T>,
    mut pred: impl FnMut(&T) -> bool,
    new_position: usize,
) -> Option<usize> {
    let current = seq.iter().position(|item| pred(item))?;
    let item = seq.remove(current);
    let target = new_position.min(seq.len());
    seq.insert(target, item);
    Some(target)
}

/// Which stored slots must change to go from `before` to `after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    /// Positions whose occupant must be (re)written from `after`.
    pub write: Range<usize>,
    /// Trailing positions that no longer exist and must be deleted.
    pub delete: Range<usize>,
}

impl RewritePlan {
    pub fn is_empty(&self) -> bool {
        self.write.is_empty() && self.delete.is_empty()
    }
}

/// Compute the minimal suffix rewrite that turns `before` into `after`.
///
/// Everything before the first differing slot is untouched.
pub fn rewrite_plan<T: PartialEq>(before: &[T], after: &[T]) -> RewritePlan {
    let first_diff = before
        .iter()
        .zip(after.iter())
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| before.len().min(after.len()));

    RewritePlan {
        write: first_diff..after.len(),
        delete: after.len().max(first_diff)..before.len().max(after.len()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seq() -> Vec<&'static str> {
        vec!["T1", "T2", "T3"]
    }

    #[test]
    fn append_assigns_trailing_positions() {
        let mut s = seq();
        assert_eq!(append(&mut s, ["T4", "T5"]), 3..5);
        assert_eq!(s, ["T1", "T2", "T3", "T4", "T5"]);
    }

    #[test]
    fn append_to_empty_starts_at_zero() {
        let mut s: Vec<&str> = Vec::new();
        assert_eq!(append(&mut s, ["A"]), 0..1);
    }

    #[test]
    fn remove_closes_gaps() {
        let mut s = seq();
        assert_eq!(remove_where(&mut s, |t| *t == "T2"), 1);
        assert_eq!(s, ["T1", "T3"]);
    }

    #[test]
    fn reorder_last_to_front() {
        let mut s = seq();
        assert_eq!(reorder(&mut s, |t| *t == "T3", 0), Some(0));
        assert_eq!(s, ["T3", "T1", "T2"]);
    }

    #[test]
    fn reorder_clamps_past_end() {
        let mut s = seq();
        assert_eq!(reorder(&mut s, |t| *t == "T1", 99), Some(2));
        assert_eq!(s, ["T2", "T3", "T1"]);
    }

    #[test]
    fn reorder_to_same_slot_is_noop() {
        let mut s = seq();
        reorder(&mut s, |t| *t == "T2", 1).unwrap();
        assert_eq!(s, seq());
    }

    #[test]
    fn reorder_non_member_leaves_sequence() {
        let mut s = seq();
        assert_eq!(reorder(&mut s, |t| *t == "T9", 0), None);
        assert_eq!(s, seq());
    }

    #[test]
    fn rewrite_plan_after_removal() {
        let plan = rewrite_plan(&["a", "b", "c", "d"], &["a", "c", "d"]);
        assert_eq!(plan.write, 1..3);
        assert_eq!(plan.delete, 3..4);
    }

    #[test]
    fn rewrite_plan_after_append() {
        let plan = rewrite_plan(&["a", "b"], &["a", "b", "c"]);
        assert_eq!(plan.write, 2..3);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn rewrite_plan_for_identical_is_empty() {
        assert!(rewrite_plan(&["a", "b"], &["a", "b"]).is_empty());
    }

    #[test]
    fn rewrite_plan_after_clearing() {
        let plan = rewrite_plan(&["a", "b"], &[]);
        assert!(plan.write.is_empty());
        assert_eq!(plan.delete, 0..2);
    }
}
