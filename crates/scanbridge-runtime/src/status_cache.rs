//! [`StatusCache`] – latest-value slot for the planner's goal status.
//!
//! Holds at most one [`GoalStatus`].  Every observation overwrites the
//! previous one; nothing is queued.  The orchestrator owns the cache and
//! clears it between poses so a result for one pose can never be read while
//! evaluating the next.

use scanbridge_types::GoalStatus;

/// Single-slot cache of the most recently observed goal status.
///
/// `None` is the unset state, distinct from [`GoalStatus::Pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCache {
    current: Option<GoalStatus>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cached value with `status`.
    pub fn observe(&mut self, status: GoalStatus) {
        self.current = Some(status);
    }

    /// The current value, or `None` if nothing was observed since the last
    /// [`reset`][Self::reset].
    pub fn current(&self) -> Option<GoalStatus> {
        self.current
    }

    /// Return the cache to the unset state.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
