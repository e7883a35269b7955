//! Batch size estimation
//!
//! Picks a work-chunk size from a fixed duration profile so that
//! per-batch latency stays bounded. The profile was measured against a
//! reference roster; for each candidate size the model extrapolates the
//! total scan time for the actual roster and the cheapest candidate
//! wins. Static table, recomputed per call, no feedback loop.

/// Smallest permitted batch (also the within-batch concurrency floor)
pub const MIN_BATCH_SIZE: usize = 5;

/// Largest permitted batch (also the within-batch concurrency ceiling)
pub const MAX_BATCH_SIZE: usize = 100;

/// Roster size the duration profile was measured against
const REFERENCE_ROSTER_SIZE: usize = 1_000;

/// `(candidate batch size, average full-scan seconds at the reference
/// roster size)`
const DURATION_PROFILE: &[(usize, f64)] = &[
    (MIN_BATCH_SIZE, 14.2),
    (10, 9.8),
    (20, 7.6),
    (50, 6.4),
    (MAX_BATCH_SIZE, 6.1),
];

/// Estimate the batch size for a roster of `dataset_size` entities
///
/// Tolerates `dataset_size == 0` by returning a valid candidate; the
/// caller skips scanning in that case.
pub fn estimate(dataset_size: usize) -> usize {
    let mut best = DURATION_PROFILE[0].0;
    let mut best_total = f64::INFINITY;
    for &(candidate, avg_duration) in DURATION_PROFILE {
        let batches_at_reference = REFERENCE_ROSTER_SIZE.div_ceil(candidate);
        let time_per_batch = avg_duration / batches_at_reference as f64;
        let total = time_per_batch * dataset_size.div_ceil(candidate) as f64;
        if total < best_total {
            best_total = total;
            best = candidate;
        }
    }
    best
}
