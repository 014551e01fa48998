// =====================================================================================
// BOOKING SAGA METRICS
// =====================================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AppointmentError, BookingOutcome};

/// Counters shared by the coordinator and the cached store. Constructed by
/// the application and handed to each component.
#[derive(Debug, Default)]
pub struct BookingMetrics {
    bookings_created: AtomicU64,
    bookings_cancelled: AtomicU64,
    slot_conflicts: AtomicU64,
    remote_failures: AtomicU64,
    store_failures: AtomicU64,
    compensations_succeeded: AtomicU64,
    reconciliation_required: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingMetricsSnapshot {
    pub bookings_created: u64,
    pub bookings_cancelled: u64,
    pub slot_conflicts: u64,
    pub remote_failures: u64,
    pub store_failures: u64,
    pub compensations_succeeded: u64,
    pub reconciliation_required: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
}

impl BookingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self) {
        self.bookings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.bookings_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compensation(&self) {
        self.compensations_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Buckets a failed saga by outcome. Validation and not-found are not counted.
    pub fn record_failure(&self, error: &AppointmentError) {
        if error.requires_reconciliation() {
            self.reconciliation_required.fetch_add(1, Ordering::Relaxed);
            return;
        }
        match error.outcome() {
            BookingOutcome::Conflict => {
                self.slot_conflicts.fetch_add(1, Ordering::Relaxed);
            }
            BookingOutcome::RemoteUnavailable => {
                self.remote_failures.fetch_add(1, Ordering::Relaxed);
            }
            BookingOutcome::Internal => {
                self.store_failures.fetch_add(1, Ordering::Relaxed);
            }
            BookingOutcome::Validation | BookingOutcome::NotFound => {}
        }
    }

    pub fn snapshot(&self) -> BookingMetricsSnapshot {
        BookingMetricsSnapshot {
            bookings_created: self.bookings_created.load(Ordering::Relaxed),
            bookings_cancelled: self.bookings_cancelled.load(Ordering::Relaxed),
            slot_conflicts: self.slot_conflicts.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            compensations_succeeded: self.compensations_succeeded.load(Ordering::Relaxed),
            reconciliation_required: self.reconciliation_required.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
        }
    }
}
