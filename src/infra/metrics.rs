//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counters are cumulative since process start; reporting reads a
//! consistent-enough snapshot without stopping the pipeline.
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Tracker metrics, shared across tasks via `Arc`
#[derive(Default)]
pub struct Metrics {
    /// Readings parsed from MQTT and forwarded
    readings_received: AtomicU64,
    /// Payloads that failed to parse
    readings_invalid: AtomicU64,
    /// Readings dropped because the tracker channel was full
    readings_dropped: AtomicU64,
    /// Readings for nodes absent from the sensor registry
    readings_unknown_node: AtomicU64,
    /// Entries evicted by the TTL sweep
    sweep_evictions: AtomicU64,
    /// Position updates emitted
    updates_emitted: AtomicU64,
    /// Estimates produced by the single-sensor fallback
    estimates_single: AtomicU64,
    /// Estimates produced by the multi-sensor solve
    estimates_multi: AtomicU64,
    /// Floor solves discarded for non-finite coordinates
    solves_discarded: AtomicU64,
    /// Per-reading processing latency accumulators (microseconds)
    process_latency_total_us: AtomicU64,
    process_latency_count: AtomicU64,
    process_latency_max_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_reading_received(&self) {
        self.readings_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reading_invalid(&self) {
        self.readings_invalid.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reading_dropped(&self) {
        self.readings_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unknown_node(&self) {
        self.readings_unknown_node.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sweep_evictions(&self, count: u64) {
        if count > 0 {
            self.sweep_evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_update_emitted(&self) {
        self.updates_emitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_estimate_single(&self) {
        self.estimates_single.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_estimate_multi(&self) {
        self.estimates_multi.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_solve_discarded(&self) {
        self.solves_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reading_processed(&self, latency_us: u64) {
        self.process_latency_total_us.fetch_add(latency_us, Ordering::Relaxed);
        self.process_latency_count.fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.process_latency_max_us, latency_us);
    }

    /// Snapshot the current counter values
    pub fn report(&self) -> MetricsSummary {
        let count = self.process_latency_count.load(Ordering::Relaxed);
        let total = self.process_latency_total_us.load(Ordering::Relaxed);
        MetricsSummary {
            readings_received: self.readings_received.load(Ordering::Relaxed),
            readings_invalid: self.readings_invalid.load(Ordering::Relaxed),
            readings_dropped: self.readings_dropped.load(Ordering::Relaxed),
            readings_unknown_node: self.readings_unknown_node.load(Ordering::Relaxed),
            sweep_evictions: self.sweep_evictions.load(Ordering::Relaxed),
            updates_emitted: self.updates_emitted.load(Ordering::Relaxed),
            estimates_single: self.estimates_single.load(Ordering::Relaxed),
            estimates_multi: self.estimates_multi.load(Ordering::Relaxed),
            solves_discarded: self.solves_discarded.load(Ordering::Relaxed),
            avg_process_latency_us: if count > 0 { total / count } else { 0 },
            max_process_latency_us: self.process_latency_max_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of all counters
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSummary {
    pub readings_received: u64,
    pub readings_invalid: u64,
    pub readings_dropped: u64,
    pub readings_unknown_node: u64,
    pub sweep_evictions: u64,
    pub updates_emitted: u64,
    pub estimates_single: u64,
    pub estimates_multi: u64,
    pub solves_discarded: u64,
    pub avg_process_latency_us: u64,
    pub max_process_latency_us: u64,
}

impl MetricsSummary {
    /// Log the summary as a structured event
    pub fn log(&self) {
        info!(
            readings = %self.readings_received,
            invalid = %self.readings_invalid,
            dropped = %self.readings_dropped,
            unknown_node = %self.readings_unknown_node,
            evictions = %self.sweep_evictions,
            updates = %self.updates_emitted,
            single = %self.estimates_single,
            multi = %self.estimates_multi,
            discarded = %self.solves_discarded,
            avg_us = %self.avg_process_latency_us,
            max_us = %self.max_process_latency_us,
            "metrics_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_reading_received();
        metrics.record_reading_received();
        metrics.record_unknown_node();
        metrics.record_sweep_evictions(3);
        metrics.record_sweep_evictions(0);

        let summary = metrics.report();
        assert_eq!(summary.readings_received, 2);
        assert_eq!(summary.readings_unknown_node, 1);
        assert_eq!(summary.sweep_evictions, 3);
    }

    #[test]
    fn test_latency_avg_and_max() {
        let metrics = Metrics::new();
        metrics.record_reading_processed(100);
        metrics.record_reading_processed(300);

        let summary = metrics.report();
        assert_eq!(summary.avg_process_latency_us, 200);
        assert_eq!(summary.max_process_latency_us, 300);
    }

    #[test]
    fn test_empty_report_no_division() {
        let summary = Metrics::new().report();
        assert_eq!(summary.avg_process_latency_us, 0);
        assert_eq!(summary.max_process_latency_us, 0);
    }
}
