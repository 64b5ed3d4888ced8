use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// A shared boolean flag observed by cooperative searches.
///
/// Cloning shares the underlying atomic; setters and observers may live on
/// different threads.
#[derive(Debug, Clone, Default)]
pub struct SharedFlag(Arc<AtomicBool>);

impl SharedFlag {
    /// Creates a new unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears the flag.
    #[inline]
    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Reads the flag.
    #[must_use]
    #[inline]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cooperative budget carried by every recursive search.
///
/// [`SearchAbortControl::step`] is called at every recursion frame. It
/// increments the node counter, enforces the node cap immediately, and every
/// 512 calls additionally checks the shared cancel/pause/force flags and the
/// deadline. A `false` return requests cooperative unwind: the search returns
/// `false` through its frames and rolls back partial state on the way out.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use omnidoku_core::SearchAbortControl;
///
/// let mut budget = SearchAbortControl::new().with_node_limit(100);
/// for _ in 0..100 {
///     assert!(budget.step());
/// }
/// assert!(!budget.step());
/// assert!(budget.aborted_by_nodes());
/// ```
#[derive(Debug, Default)]
pub struct SearchAbortControl {
    deadline: Option<Instant>,
    node_limit: Option<u64>,
    nodes: u64,
    cancel: Option<SharedFlag>,
    pause: Option<SharedFlag>,
    force_abort: Option<SharedFlag>,
    aborted_by_time: bool,
    aborted_by_nodes: bool,
    aborted_by_force: bool,
    aborted_by_pause: bool,
}

impl SearchAbortControl {
    /// Creates an unbounded budget: `step` always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_time_budget(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Caps the number of `step` calls.
    #[must_use]
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// Attaches a cancellation flag.
    #[must_use]
    pub fn with_cancel(mut self, flag: SharedFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Attaches a pause flag. A paused search aborts; the caller decides
    /// whether to retry after the pause clears.
    #[must_use]
    pub fn with_pause(mut self, flag: SharedFlag) -> Self {
        self.pause = Some(flag);
        self
    }

    /// Attaches a force-abort flag.
    #[must_use]
    pub fn with_force_abort(mut self, flag: SharedFlag) -> Self {
        self.force_abort = Some(flag);
        self
    }

    /// Accounts one recursion frame.
    ///
    /// Returns `false` when the search must unwind. The node cap is enforced
    /// on every call; flags and the deadline are polled every 512 calls.
    #[inline]
    pub fn step(&mut self) -> bool {
        self.nodes += 1;
        if let Some(limit) = self.node_limit
            && self.nodes > limit
        {
            self.aborted_by_nodes = true;
            return false;
        }
        if self.nodes & 511 != 0 {
            return true;
        }
        self.check_flags_and_deadline()
    }

    #[cold]
    fn check_flags_and_deadline(&mut self) -> bool {
        if let Some(cancel) = &self.cancel
            && cancel.get()
        {
            self.aborted_by_force = true;
            return false;
        }
        if let Some(pause) = &self.pause
            && pause.get()
        {
            self.aborted_by_pause = true;
            return false;
        }
        if let Some(force) = &self.force_abort
            && force.get()
        {
            self.aborted_by_force = true;
            return false;
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            self.aborted_by_time = true;
            return false;
        }
        true
    }

    /// Returns `true` if any abort condition has fired.
    #[must_use]
    #[inline]
    pub fn aborted(&self) -> bool {
        self.aborted_by_time || self.aborted_by_nodes || self.aborted_by_force || self.aborted_by_pause
    }

    /// Number of `step` calls so far.
    #[must_use]
    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// `true` if the deadline fired.
    #[must_use]
    pub fn aborted_by_time(&self) -> bool {
        self.aborted_by_time
    }

    /// `true` if the node cap fired.
    #[must_use]
    pub fn aborted_by_nodes(&self) -> bool {
        self.aborted_by_nodes
    }

    /// `true` if a cancel or force-abort flag fired.
    #[must_use]
    pub fn aborted_by_force(&self) -> bool {
        self.aborted_by_force
    }

    /// `true` if the pause flag fired.
    #[must_use]
    pub fn aborted_by_pause(&self) -> bool {
        self.aborted_by_pause
    }
}
