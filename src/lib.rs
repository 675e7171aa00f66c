#![forbid(unsafe_code)]

//! # pairwise-robustness
//!
//! How much does a noisy rater hurt a black-box optimizer?
//!
//! CMA-ES is driven purely by rank feedback: every batch it proposes is
//! sorted by a pairwise comparator that answers wrongly with probability
//! `p_err`, and only the resulting rank order is handed back. The true
//! objective values are used for one thing only: recording the best-so-far
//! value the noisy rater would pick, so convergence can be plotted against
//! the evaluation budget for each noise level.

pub mod benchmarks;
pub mod config;
pub mod experiment;
pub mod optimizer;
pub mod plot;
pub mod ranking;

pub use benchmarks::{get_problem, Benchmark, BenchmarkError, BenchmarkProblem, Objective};
pub use config::{ConfigError, ExperimentConfig};
pub use experiment::{run_experiment, ExperimentError, ExperimentReport, RunSummary};
pub use optimizer::{AskTellOptimizer, CmaEs, OptimizerError};
pub use plot::{Figure, MemoryPlotSink, NoiseCurve, NoopPlotSink, PlotError, PlotSink, SvgPlotSink};
pub use ranking::{
    noisy_compare, run_cmaes, run_noisy_ranking, CompareKey, NoiseLevel, NoisePolicy,
    NoisyComparator, RunError, RunOutcome, RunSettings, ScoredCandidate, TracePoint,
};
