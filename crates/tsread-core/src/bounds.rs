//! Half-open time bounds shared by every row and table of one read.

use serde::{Deserialize, Serialize};

/// Timestamps are nanoseconds since the Unix epoch.
pub type Time = i64;

/// The `[start, stop)` window a read is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub start: Time,
    pub stop: Time,
}

impl Bounds {
    pub const fn new(start: Time, stop: Time) -> Self {
        Self { start, stop }
    }

    /// True when `t` falls inside the window (`stop` excluded).
    pub fn contains(&self, t: Time) -> bool {
        t >= self.start && t < self.stop
    }

    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }
}
