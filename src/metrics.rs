// SPDX-License-Identifier: Apache-2.0

//! Lightweight in-memory metrics for outbound API calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Default)]
struct CallMetrics {
    total: AtomicU64,
    failed: AtomicU64,
    empty: AtomicU64,
    items: AtomicU64,
    closed_early: AtomicU64,
    duration_total_ms: AtomicU64,
    duration_max_ms: AtomicU64,
}

static CALL_METRICS: OnceLock<CallMetrics> = OnceLock::new();

fn metrics() -> &'static CallMetrics {
    CALL_METRICS.get_or_init(CallMetrics::default)
}

/// Records one dispatched call. `items` is ignored for failed calls.
pub fn record_call(duration_ms: f64, items: usize, success: bool) {
    let duration_ms = duration_ms.max(0.0) as u64;
    let metrics = metrics();
    metrics.total.fetch_add(1, Ordering::Relaxed);
    if success {
        metrics.items.fetch_add(items as u64, Ordering::Relaxed);
        if items == 0 {
            metrics.empty.fetch_add(1, Ordering::Relaxed);
        }
    } else {
        metrics.failed.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .duration_total_ms
        .fetch_add(duration_ms, Ordering::Relaxed);

    let mut current = metrics.duration_max_ms.load(Ordering::Relaxed);
    while duration_ms > current {
        match metrics.duration_max_ms.compare_exchange(
            current,
            duration_ms,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(next) => current = next,
        }
    }
}

/// Records an executor closed by its consumer before it was exhausted.
pub fn record_close() {
    metrics().closed_early.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Serialize)]
pub struct CallMetricsSnapshot {
    pub total: u64,
    pub failed: u64,
    pub empty: u64,
    pub items: u64,
    pub closed_early: u64,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<u64>,
}

pub fn snapshot() -> CallMetricsSnapshot {
    let metrics = metrics();
    let total = metrics.total.load(Ordering::Relaxed);
    let duration_total = metrics.duration_total_ms.load(Ordering::Relaxed);
    let max_ms = metrics.duration_max_ms.load(Ordering::Relaxed);

    let avg_ms = if total > 0 {
        Some(duration_total as f64 / total as f64)
    } else {
        None
    };

    CallMetricsSnapshot {
        total,
        failed: metrics.failed.load(Ordering::Relaxed),
        empty: metrics.empty.load(Ordering::Relaxed),
        items: metrics.items.load(Ordering::Relaxed),
        closed_early: metrics.closed_early.load(Ordering::Relaxed),
        avg_ms,
        max_ms: if max_ms > 0 { Some(max_ms) } else { None },
    }
}
