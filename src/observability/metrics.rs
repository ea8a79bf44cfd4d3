//! Binding metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one engine
///
/// Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct BindingMetrics {
    binds_executed: AtomicU64,
    binds_rejected: AtomicU64,
    field_errors: AtomicU64,
    configuration_failures: AtomicU64,
    resolutions: AtomicU64,
    cache_hits: AtomicU64,
}

impl BindingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binding call produced an instance
    pub fn increment_binds_executed(&self) {
        self.binds_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// A binding call produced field errors
    pub fn increment_binds_rejected(&self) {
        self.binds_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_field_errors(&self, count: u64) {
        self.field_errors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_configuration_failures(&self) {
        self.configuration_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A class was resolved without the cache
    pub fn increment_resolutions(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            binds_executed: self.binds_executed.load(Ordering::Relaxed),
            binds_rejected: self.binds_rejected.load(Ordering::Relaxed),
            field_errors: self.field_errors.load(Ordering::Relaxed),
            configuration_failures: self.configuration_failures.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub binds_executed: u64,
    pub binds_rejected: u64,
    pub field_errors: u64,
    pub configuration_failures: u64,
    pub resolutions: u64,
    pub cache_hits: u64,
}

impl MetricsSnapshot {
    /// Total binding calls that reached a result
    pub fn binds_total(&self) -> u64 {
        self.binds_executed + self.binds_rejected
    }
}
