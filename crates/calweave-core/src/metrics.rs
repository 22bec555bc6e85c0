//! Atomic counters for calweave observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event (e.g. at the end of a pipeline run). Each registry owns its own
//! instance; there is no process-wide counter state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters — no allocations, no locking.
#[derive(Debug)]
pub struct Metrics {
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    validations: AtomicU64,
    evolutions: AtomicU64,
    gate_evaluations: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            fetches: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            validations: AtomicU64::new(0),
            evolutions: AtomicU64::new(0),
            gate_evaluations: AtomicU64::new(0),
        }
    }

    pub fn inc_fetches(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetches", "counter incremented");
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetch_failures", "counter incremented");
    }

    pub fn inc_validations(&self) {
        self.validations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validations", "counter incremented");
    }

    pub fn inc_evolutions(&self) {
        self.evolutions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evolutions", "counter incremented");
    }

    pub fn add_gate_evaluations(&self, n: u64) {
        self.gate_evaluations.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "gate_evaluations", n, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            fetches = self.fetches(),
            fetch_failures = self.fetch_failures(),
            validations = self.validations(),
            evolutions = self.evolutions(),
            gate_evaluations = self.gate_evaluations(),
        );
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn validations(&self) -> u64 {
        self.validations.load(Ordering::Relaxed)
    }

    pub fn evolutions(&self) -> u64 {
        self.evolutions.load(Ordering::Relaxed)
    }

    pub fn gate_evaluations(&self) -> u64 {
        self.gate_evaluations.load(Ordering::Relaxed)
    }
}
