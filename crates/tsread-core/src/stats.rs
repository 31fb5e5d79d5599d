//! Scan statistics accumulated across the tables of one read.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Counters reported by cursors and summed by the read coordinators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub scanned_values: u64,
    pub scanned_bytes: u64,
}

impl ScanStatistics {
    pub const fn new(scanned_values: u64, scanned_bytes: u64) -> Self {
        Self {
            scanned_values,
            scanned_bytes,
        }
    }
}

impl AddAssign for ScanStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.scanned_values = self.scanned_values.saturating_add(rhs.scanned_values);
        self.scanned_bytes = self.scanned_bytes.saturating_add(rhs.scanned_bytes);
    }
}

impl Add for ScanStatistics {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}
