//! Noisy pairwise ranking.
//!
//! - `comparator`: the noisy rater and its flip policies
//! - `sort`: a comparison sort that survives inconsistent answers
//! - `run`: the ask → evaluate → noisy sort → tell loop
//! - `trace`: best-so-far reporting

pub mod comparator;
pub mod run;
pub mod sort;
pub mod trace;

pub use comparator::{
    label_to_ordering, noisy_compare, true_label, CompareKey, ComparisonSession, NoiseLevel,
    NoiseLevelError, NoisePolicy, NoisyComparator, ScoredCandidate, SortStats,
};
pub use run::{
    iteration_budget, run_cmaes, run_noisy_ranking, run_noisy_ranking_with_rng, RunError,
    RunOutcome, RunSettings, DEFAULT_MAX_EVAL, DEFAULT_SEED, DEFAULT_SIGMA0,
};
pub use sort::comparison_sort;
pub use trace::{evaluations_at, trace_points, TracePoint};
