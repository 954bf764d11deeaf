//! Percentile helpers for latency samples.

/// Nearest-rank percentile of `samples`. Returns 0.0 for an empty slice.
/// `pct` is in `[0, 100]`.
#[must_use]
pub fn percentile(samples: &[f64], pct: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Median (p50) of `samples`.
#[must_use]
pub fn median(samples: &[f64]) -> f64 {
    percentile(samples, 50.0)
}

// ─── Tests ─────────────────────────────────────────────────────────────────
