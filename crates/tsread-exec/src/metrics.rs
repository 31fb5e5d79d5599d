//! Scan statistics reporting.
//!
//! Only emits `tracing` events; wire a subscriber in the binary layer to
//! export them.

use tsread_core::stats::ScanStatistics;

pub fn record_scan(operation: &'static str, stats: ScanStatistics) {
    let span = tracing::trace_span!("tsread", operation);
    let _enter = span.enter();
    tracing::debug!(
        scanned_values = stats.scanned_values,
        scanned_bytes = stats.scanned_bytes,
        "scan statistics"
    );
}
