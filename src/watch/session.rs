use std::path::Path;
use std::time::{Duration, Instant};

/// Default quiet period before a burst of changes triggers one rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// State of the watch session's debounce machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No rebuild pending; waiting for a change event.
    Idle,
    /// A change arrived; the debounce deadline is armed. Further changes
    /// reset the deadline instead of stacking new ones.
    Pending,
    /// A rebuild cycle is executing. A deadline firing in this state is
    /// skipped entirely; this is the re-entrancy guard.
    Rebuilding,
}

/// One long-lived watch session: the debounce state machine plus the
/// file-pattern filter.
///
/// The session owns a single resettable deadline rather than a timer per
/// event, so bursts of changes coalesce into exactly one rebuild cycle.
/// Transitions are driven externally (by the orchestrator's event loop or by
/// tests), which keeps the machine free of timer callbacks and captured
/// mutable state.
#[derive(Debug)]
pub struct WatchSession {
    patterns: Vec<String>,
    debounce: Duration,
    state: WatchState,
    deadline: Option<Instant>,
}

impl WatchSession {
    /// Creates an idle session with the given filename patterns and quiet
    /// period.
    pub fn new(patterns: Vec<String>, debounce: Duration) -> Self {
        Self {
            patterns,
            debounce,
            state: WatchState::Idle,
            deadline: None,
        }
    }

    /// Current machine state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// The armed debounce deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a changed path is one the session reacts to.
    ///
    /// Patterns of the form `*.ext` match on filename suffix; any other
    /// pattern matches the filename exactly.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|pattern| {
            match pattern.strip_prefix('*') {
                Some(suffix) => name.ends_with(suffix),
                None => name == pattern,
            }
        })
    }

    /// Records a relevant change event at `now`.
    ///
    /// From `Idle` or `Pending` this (re)arms the deadline at
    /// `now + debounce`; the previous deadline, if any, is cancelled
    /// outright. Ignored while `Rebuilding`; events arriving then are
    /// handled by the event loop once the cycle finishes.
    pub fn note_change(&mut self, now: Instant) {
        if self.state == WatchState::Rebuilding {
            return;
        }
        self.state = WatchState::Pending;
        self.deadline = Some(now + self.debounce);
    }

    /// Whether the armed deadline has expired at `now`.
    pub fn expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Attempts to enter `Rebuilding` when the deadline fires.
    ///
    /// Returns `false` when a cycle is already in progress: the fired cycle
    /// must be skipped entirely, never queued. The deadline is disarmed
    /// either way.
    pub fn begin_rebuild(&mut self) -> bool {
        self.deadline = None;
        if self.state == WatchState::Rebuilding {
            return false;
        }
        self.state = WatchState::Rebuilding;
        true
    }

    /// Returns to `Idle` after a cycle completes, successfully or not.
    pub fn finish_rebuild(&mut self) {
        self.state = WatchState::Idle;
        self.deadline = None;
    }
}
