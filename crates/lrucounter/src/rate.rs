//! Per-key counting window
//!
//! Each tracked key carries a counter and the instant its current window
//! began. The counter always advances; it is only pulled back to 1 when it
//! is over the limit and the window has run out.

use std::time::{Duration, Instant};

/// Result of recording one occurrence of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Counter value after this occurrence was recorded
    pub count: u64,
    /// Whether the occurrence is within policy
    pub allowed: bool,
}

impl Decision {
    /// Whether the occurrence was rejected
    pub fn is_blocked(&self) -> bool {
        !self.allowed
    }
}

/// Which way an increment moved the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// At or under the limit
    Fresh,
    /// Over the limit inside the window, or with no window at all
    Blocked,
    /// Over the limit after the window ran out; counter restarted
    Reset,
}

impl Transition {
    pub fn allowed(self) -> bool {
        !matches!(self, Transition::Blocked)
    }
}

/// Counter state stored in the recency index
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    pub count: u64,
    pub window_start: Instant,
}

impl Entry {
    /// First occurrence of a key
    pub fn new(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    /// Record one more occurrence and decide whether it is allowed.
    ///
    /// `window` of `None` means an entry over the limit stays blocked until
    /// it is removed. A `now` earlier than `window_start` counts as no time
    /// elapsed.
    pub fn record(&mut self, max_value: u64, window: Option<Duration>, now: Instant) -> Transition {
        self.count = self.count.saturating_add(1);
        if self.count <= max_value {
            return Transition::Fresh;
        }

        match window {
            Some(window) if now.saturating_duration_since(self.window_start) > window => {
                self.count = 1;
                self.window_start = now;
                Transition::Reset
            }
            _ => Transition::Blocked,
        }
    }

    pub fn decision(&self, transition: Transition) -> Decision {
        Decision {
            count: self.count,
            allowed: transition.allowed(),
        }
    }
}
