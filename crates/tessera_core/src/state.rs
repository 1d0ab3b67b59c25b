//! State cell and redraw slot
//!
//! A [`StateCell`] owns one component's state behind an `Rc`. State is only
//! ever replaced wholesale: committing the very same `Rc` is a no-op, which
//! lets handlers signal "nothing changed" by handing the current state back.
//!
//! A [`RedrawSlot`] is the single-slot pending flag that coalesces every
//! commit made before the deferred redraw runs.

use std::fmt;
use std::rc::Rc;

/// A committed state change
pub struct Transition<S> {
    pub old: Rc<S>,
    pub new: Rc<S>,
}

impl<S: fmt::Debug> fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("old", &self.old)
            .field("new", &self.new)
            .finish()
    }
}

/// Holds the current state of one component instance
pub struct StateCell<S> {
    current: Rc<S>,
    commits: u64,
}

impl<S> StateCell<S> {
    pub fn new(initial: S) -> Self {
        Self::from_rc(Rc::new(initial))
    }

    /// Seed the cell with an existing shared value
    pub fn from_rc(initial: Rc<S>) -> Self {
        Self {
            current: initial,
            commits: 0,
        }
    }

    /// Borrow the current state
    pub fn get(&self) -> &Rc<S> {
        &self.current
    }

    /// Clone the current state handle
    pub fn snapshot(&self) -> Rc<S> {
        Rc::clone(&self.current)
    }

    /// Replace the current state
    ///
    /// Returns `None` without touching anything when `next` is the same
    /// allocation as the current state.
    pub fn commit(&mut self, next: Rc<S>) -> Option<Transition<S>> {
        if Rc::ptr_eq(&self.current, &next) {
            return None;
        }
        let old = std::mem::replace(&mut self.current, next);
        self.commits += 1;
        Some(Transition {
            old,
            new: Rc::clone(&self.current),
        })
    }

    /// Number of effective commits
    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl<S: fmt::Debug> fmt::Debug for StateCell<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("current", &self.current)
            .field("commits", &self.commits)
            .finish()
    }
}

/// Single-slot pending redraw flag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedrawSlot {
    pending: bool,
    scheduled: u64,
}

impl RedrawSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a redraw as pending
    ///
    /// Returns true only when the slot was empty, i.e. the caller must
    /// enqueue the deferred redraw task.
    pub fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        self.scheduled += 1;
        true
    }

    /// Clear the slot when the deferred task starts, returning whether a
    /// redraw was pending
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Number of deferred redraw tasks scheduled so far
    pub fn scheduled(&self) -> u64 {
        self.scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_commit_is_noop() {
        let mut cell = StateCell::new(String::from("a"));
        let same = cell.snapshot();
        assert!(cell.commit(same).is_none());
        assert_eq!(cell.commits(), 0);
    }

    #[test]
    fn test_equal_but_distinct_value_commits() {
        let mut cell = StateCell::new(5);
        let transition = cell.commit(Rc::new(5)).expect("distinct allocation commits");
        assert_eq!(*transition.old, 5);
        assert!(Rc::ptr_eq(&transition.new, cell.get()));
        assert_eq!(cell.commits(), 1);
    }

    #[test]
    fn test_redraw_slot_coalesces() {
        let mut slot = RedrawSlot::new();
        assert!(slot.request());
        assert!(!slot.request());
        assert!(!slot.request());
        assert_eq!(slot.scheduled(), 1);

        assert!(slot.take());
        assert!(!slot.is_pending());
        assert!(!slot.take());

        assert!(slot.request());
        assert_eq!(slot.scheduled(), 2);
    }
}
