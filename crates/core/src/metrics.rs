//! Metrics definitions for the indexer.
//!
//! This module defines all metrics used throughout the indexer.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "chunks_indexed_total",
        "Total number of block chunks fully indexed and checkpointed"
    );
    describe_counter!(
        "transfers_inserted_total",
        "Total number of transfer records newly written"
    );
    describe_counter!(
        "transfers_duplicate_total",
        "Total number of transfer records absorbed as duplicates"
    );
    describe_histogram!(
        "scan_duration_seconds",
        "Time taken by one scan from checkpoint to head in seconds"
    );
    describe_counter!(
        "scans_skipped_total",
        "Total number of scans skipped because another scan was running"
    );
    describe_counter!(
        "scan_errors_total",
        "Total number of scans aborted by an error"
    );
    describe_counter!(
        "decode_errors_total",
        "Total number of logs that could not be decoded as transfers"
    );
    describe_counter!(
        "range_shrinks_total",
        "Total number of times the chunk width was halved after a provider rejection"
    );
    describe_gauge!("last_indexed_block", "Highest checkpointed block number");
}

/// Record a fully indexed chunk.
///
/// # Arguments
/// * `inserted` - Records newly written for the chunk
/// * `duplicates` - Records already present
/// * `to_block` - Last block of the chunk (new checkpoint)
pub fn record_chunk_indexed(inserted: u64, duplicates: u64, to_block: u64) {
    counter!("chunks_indexed_total").increment(1);
    counter!("transfers_inserted_total").increment(inserted);
    counter!("transfers_duplicate_total").increment(duplicates);
    gauge!("last_indexed_block").set(to_block as f64);
}

/// Record scan duration.
pub fn record_scan_duration(duration_secs: f64) {
    histogram!("scan_duration_seconds").record(duration_secs);
}

/// Record a scan skipped because the scan slot was taken.
pub fn record_scan_skipped() {
    counter!("scans_skipped_total").increment(1);
}

/// Record an aborted scan.
///
/// # Arguments
/// * `kind` - Error family ("chain", "storage", ...)
pub fn record_scan_error(kind: &str) {
    counter!("scan_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record a log that did not decode as a transfer.
pub fn record_decode_error() {
    counter!("decode_errors_total").increment(1);
}

/// Record a chunk width reduction.
pub fn record_range_shrink() {
    counter!("range_shrinks_total").increment(1);
}

/// A timer that automatically records scan duration when dropped.
pub struct ScanTimer {
    start: Instant,
}

impl ScanTimer {
    /// Start a new scan timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ScanTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_scan_duration(duration);
    }
}
