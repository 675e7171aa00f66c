//! Best-so-far trace points.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracePoint {
    pub iteration: usize,
    /// Cumulative objective evaluations after this iteration.
    pub evaluations: usize,
    pub best: f64,
}

/// Evaluations consumed once iteration `iteration` (0-based) has finished.
pub fn evaluations_at(iteration: usize, batch_size: usize) -> usize {
    (iteration + 1) * batch_size
}

/// Pair each best-so-far value with its cumulative evaluation count.
pub fn trace_points(best_so_far: &[f64], batch_size: usize) -> Vec<TracePoint> {
    best_so_far
        .iter()
        .enumerate()
        .map(|(iteration, &best)| TracePoint {
            iteration,
            evaluations: evaluations_at(iteration, batch_size),
            best,
        })
        .collect()
}
