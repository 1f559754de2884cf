//! Observability and Metrics
//!
//! Counters describing registry churn and connection lifecycle, for
//! monitoring how extensions and connections use the channel layer.
//!
//! Uses atomic counters for thread-safe metrics collection. A collector is
//! owned explicitly and shared by handle; there is no process-wide instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for channel registries and their addons
#[derive(Debug)]
pub struct RegistryMetrics {
    /// Successful global registrations
    pub registrations: AtomicU64,
    /// Registrations refused because the name was already taken
    pub duplicate_registrations: AtomicU64,
    /// Successful global unregistrations
    pub unregistrations: AtomicU64,
    /// Individual addon updates pushed by registries
    pub propagations: AtomicU64,
    /// Tracked addons dropped by their owner without detaching
    pub pruned_addons: AtomicU64,
    /// Addons attached to a registry
    pub attaches: AtomicU64,
    /// Addons detached from a registry
    pub detaches: AtomicU64,
    /// Disconnect notifications fired
    pub disconnects: AtomicU64,
    /// Inbound payloads routed to a handler
    pub inbound_dispatched: AtomicU64,
    /// Inbound payloads on a channel with no handler
    pub inbound_unknown: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl RegistryMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            duplicate_registrations: AtomicU64::new(0),
            unregistrations: AtomicU64::new(0),
            propagations: AtomicU64::new(0),
            pruned_addons: AtomicU64::new(0),
            attaches: AtomicU64::new(0),
            detaches: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            inbound_dispatched: AtomicU64::new(0),
            inbound_unknown: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_registration(&self) {
        self.duplicate_registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unregistration(&self) {
        self.unregistrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` addon updates from one registry mutation
    pub fn propagated(&self, count: u64) {
        self.propagations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn pruned(&self, count: u64) {
        self.pruned_addons.fetch_add(count, Ordering::Relaxed);
    }

    pub fn attached(&self) {
        self.attaches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detached(&self) {
        self.detaches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inbound_dispatched(&self) {
        self.inbound_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inbound_unknown(&self) {
        self.inbound_unknown.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            duplicate_registrations: self.duplicate_registrations.load(Ordering::Relaxed),
            unregistrations: self.unregistrations.load(Ordering::Relaxed),
            propagations: self.propagations.load(Ordering::Relaxed),
            pruned_addons: self.pruned_addons.load(Ordering::Relaxed),
            attaches: self.attaches.load(Ordering::Relaxed),
            detaches: self.detaches.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            inbound_dispatched: self.inbound_dispatched.load(Ordering::Relaxed),
            inbound_unknown: self.inbound_unknown.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            registrations = snapshot.registrations,
            duplicate_registrations = snapshot.duplicate_registrations,
            unregistrations = snapshot.unregistrations,
            propagations = snapshot.propagations,
            pruned_addons = snapshot.pruned_addons,
            attaches = snapshot.attaches,
            detaches = snapshot.detaches,
            disconnects = snapshot.disconnects,
            inbound_dispatched = snapshot.inbound_dispatched,
            inbound_unknown = snapshot.inbound_unknown,
            uptime_seconds = snapshot.uptime_seconds,
            "Channel registry metrics snapshot"
        );
    }
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub registrations: u64,
    pub duplicate_registrations: u64,
    pub unregistrations: u64,
    pub propagations: u64,
    pub pruned_addons: u64,
    pub attaches: u64,
    pub detaches: u64,
    pub disconnects: u64,
    pub inbound_dispatched: u64,
    pub inbound_unknown: u64,
    pub uptime_seconds: u64,
}
