//! Fetch metrics per query kind
//!
//! Tracks latency percentiles and success rates of the fetches issued by the
//! query cache, so a slow or failing endpoint shows up without a debugger.

use crate::types::QueryKind;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep per kind
const MAX_SAMPLES: usize = 100;

/// Metrics for one query kind
#[derive(Debug, Clone, PartialEq)]
pub struct FetchStats {
    /// Kind of query these numbers describe
    pub kind: QueryKind,
    /// 50th percentile latency of successful fetches in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful fetches in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of fetches
    pub total_fetches: u64,
    /// Number of fetches that gave up with an error
    pub failed_fetches: u64,
}

impl FetchStats {
    pub fn empty(kind: QueryKind) -> Self {
        Self {
            kind,
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_fetches: 0,
            failed_fetches: 0,
        }
    }
}

#[derive(Debug, Default)]
struct KindSamples {
    samples: VecDeque<(f64, bool)>,
    total: u64,
    failed: u64,
}

/// Collects fetch outcomes for every query kind
#[derive(Debug, Default)]
pub struct FetchMetrics {
    kinds: RwLock<HashMap<QueryKind, KindSamples>>,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one fetch with its duration and outcome
    pub async fn record(&self, kind: QueryKind, duration: Duration, success: bool) {
        let mut kinds = self.kinds.write().await;
        let entry = kinds.entry(kind).or_default();

        entry.total += 1;
        if !success {
            entry.failed += 1;
        }

        if entry.samples.len() >= MAX_SAMPLES {
            entry.samples.pop_front();
        }
        entry
            .samples
            .push_back((duration.as_secs_f64() * 1000.0, success));
    }

    /// Computes the current stats for a kind
    pub async fn stats(&self, kind: QueryKind) -> FetchStats {
        let kinds = self.kinds.read().await;
        let Some(entry) = kinds.get(&kind) else {
            return FetchStats::empty(kind);
        };

        let mut latencies: Vec<f64> = entry
            .samples
            .iter()
            .filter(|(_, success)| *success)
            .map(|(ms, _)| *ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if entry.total > 0 {
            (entry.total - entry.failed) as f64 / entry.total as f64
        } else {
            1.0
        };

        FetchStats {
            kind,
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_fetches: entry.total,
            failed_fetches: entry.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    // Nearest rank
    let rank = (p / 100.0 * sorted_values.len() as f64).ceil() as usize;
    sorted_values[rank.saturating_sub(1).min(sorted_values.len() - 1)]
}
