//! Metrics registry
//!
//! Counters only. Monotonic, reset on process start. Relaxed atomics: a
//! snapshot taken mid-request may be off by one block, which is fine here.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the engine and serving layer
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_started: AtomicU64,
    queries_rejected: AtomicU64,
    blocks_fetched: AtomicU64,
    rows_merged: AtomicU64,
    source_failures: AtomicU64,
    refine_noops: AtomicU64,
    sessions_evicted: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_started(&self) {
        self.queries_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one merged block of `rows` rows
    pub fn record_block(&self, rows: u64) {
        self.blocks_fetched.fetch_add(1, Ordering::Relaxed);
        self.rows_merged.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_source_failures(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_refine_noops(&self) {
        self.refine_noops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_evicted(&self) {
        self.sessions_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_started: self.queries_started.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            blocks_fetched: self.blocks_fetched.load(Ordering::Relaxed),
            rows_merged: self.rows_merged.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            refine_noops: self.refine_noops.load(Ordering::Relaxed),
            sessions_evicted: self.sessions_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_started: u64,
    pub queries_rejected: u64,
    pub blocks_fetched: u64,
    pub rows_merged: u64,
    pub source_failures: u64,
    pub refine_noops: u64,
    pub sessions_evicted: u64,
}
