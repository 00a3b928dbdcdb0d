//! Metrics collection for the Face.
//!
//! Counters are plain atomics so the engine can bump them without
//! synchronization and front-ends can read a consistent-enough snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

/* ---------------------------------------------------------------- *
 * Simple Counter
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        let c = Counter::new();
        c.value.store(self.value.load(Ordering::Relaxed), Ordering::Relaxed);
        c
    }
}

/* ---------------------------------------------------------------- *
 * Gauge
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Clone for Gauge {
    fn clone(&self) -> Self {
        let g = Gauge::new();
        g.value.store(self.value.load(Ordering::Relaxed), Ordering::Relaxed);
        g
    }
}

/* ---------------------------------------------------------------- *
 * Aggregate metrics for a Face
 * ---------------------------------------------------------------- */

#[derive(Debug, Default, Clone)]
pub struct FaceMetrics {
    // Interest lifecycle
    pub interests_sent: Counter,
    pub interests_satisfied: Counter,
    pub interests_timed_out: Counter,
    pub interests_reexpressed: Counter,
    pub interests_received: Counter,

    // Data path
    pub data_received: Counter,
    pub data_sent: Counter,
    pub elements_discarded: Counter,

    // Verification
    pub verify_ok: Counter,
    pub verify_failed: Counter,
    pub key_fetches: Counter,
    pub key_cache_hits: Counter,

    // Table sizes
    pub pit_size: Gauge,
    pub cst_size: Gauge,
    pub key_cache_size: Gauge,
}

impl FaceMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}
