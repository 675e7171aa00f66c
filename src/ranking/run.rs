//! The noisy ranking loop.
//!
//! Drives an ask/tell optimizer with rank feedback produced by a noisy
//! pairwise comparator, and tracks the best true objective value that the
//! noisy rater would report after each iteration.
//!
//! One run is `INIT → (ASK → EVALUATE → NOISY_SORT → TELL → RECORD_BEST)* → DONE`
//! over a fixed iteration budget. There is no early stopping.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::benchmarks::{BenchmarkError, Objective};
use crate::optimizer::{AskTellOptimizer, CmaEs, OptimizerError};

use super::comparator::{CompareKey, NoiseLevel, NoisePolicy, NoisyComparator, ScoredCandidate};
use super::trace::{evaluations_at, trace_points, TracePoint};

/// Evaluation cap per run.
pub const DEFAULT_MAX_EVAL: usize = 2000;
/// Initial CMA-ES step size.
pub const DEFAULT_SIGMA0: f64 = 0.5;
pub const DEFAULT_SEED: u64 = 4563;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),
    #[error("objective error: {0}")]
    Objective(#[from] BenchmarkError),
    #[error("optimizer reports a batch size of zero")]
    ZeroBatchSize,
    #[error("optimizer proposed an empty batch at iteration {iteration}")]
    EmptyBatch { iteration: usize },
    #[error("compare key selects component {component} but candidates have {n_var} components")]
    ComponentOutOfRange { component: usize, n_var: usize },
}

/// Per-run knobs. The objective fixes the dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub noise: NoiseLevel,
    pub max_eval: usize,
    pub sigma0: f64,
    pub seed: u64,
    pub policy: NoisePolicy,
    pub key: CompareKey,
}

impl RunSettings {
    pub fn new(noise: NoiseLevel) -> Self {
        Self {
            noise,
            max_eval: DEFAULT_MAX_EVAL,
            sigma0: DEFAULT_SIGMA0,
            seed: DEFAULT_SEED,
            policy: NoisePolicy::default(),
            key: CompareKey::default(),
        }
    }

    pub fn with_max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = max_eval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sigma0(mut self, sigma0: f64) -> Self {
        self.sigma0 = sigma0;
        self
    }

    pub fn with_policy(mut self, policy: NoisePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_key(mut self, key: CompareKey) -> Self {
        self.key = key;
        self
    }

    pub fn comparator(&self) -> NoisyComparator {
        NoisyComparator::new(self.noise, self.key, self.policy)
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub batch_size: usize,
    pub iterations: usize,
    pub initial_guess: Vec<f64>,
    /// True value of the noisily top-ranked candidate of each iteration.
    pub champion_values: Vec<f64>,
    /// True value of the noisily top-ranked champion so far, per iteration.
    pub best_so_far: Vec<f64>,
    /// Pairwise questions asked over the whole run, batch and champion sorts.
    pub comparisons: usize,
}

impl RunOutcome {
    pub fn final_best(&self) -> Option<f64> {
        self.best_so_far.last().copied()
    }

    pub fn trace_points(&self) -> Vec<TracePoint> {
        trace_points(&self.best_so_far, self.batch_size)
    }
}

/// `round(max_eval / batch_size)`, ties to even.
pub fn iteration_budget(max_eval: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    (max_eval as f64 / batch_size as f64).round_ties_even() as usize
}

/// Run the loop with a fresh random source seeded from `settings.seed`.
pub fn run_noisy_ranking<O, B>(
    objective: &dyn Objective,
    settings: &RunSettings,
    build: B,
) -> Result<RunOutcome, RunError>
where
    O: AskTellOptimizer,
    B: FnOnce(&[f64], f64) -> Result<O, OptimizerError>,
{
    let mut rng = StdRng::seed_from_u64(settings.seed);
    run_noisy_ranking_with_rng(objective, settings, &mut rng, build)
}

/// CMA-ES with its default population size.
pub fn run_cmaes(objective: &dyn Objective, settings: &RunSettings) -> Result<RunOutcome, RunError> {
    run_noisy_ranking(objective, settings, CmaEs::new)
}

/// Run the loop on a caller-owned random source.
///
/// The same source feeds the initial guess, the optimizer's sampling and the
/// comparator's flips, so two runs from the same state agree until the first
/// flip that differs.
pub fn run_noisy_ranking_with_rng<O, B>(
    objective: &dyn Objective,
    settings: &RunSettings,
    rng: &mut StdRng,
    build: B,
) -> Result<RunOutcome, RunError>
where
    O: AskTellOptimizer,
    B: FnOnce(&[f64], f64) -> Result<O, OptimizerError>,
{
    let n_var = objective.n_var();
    if let CompareKey::Component(component) = settings.key {
        if component >= n_var {
            return Err(RunError::ComponentOutOfRange { component, n_var });
        }
    }

    // INIT
    let initial_guess: Vec<f64> = (0..n_var).map(|_| rng.gen::<f64>()).collect();
    let mut optimizer = build(&initial_guess, settings.sigma0)?;
    let batch_size = optimizer.batch_size();
    if batch_size == 0 {
        return Err(RunError::ZeroBatchSize);
    }
    let iterations = iteration_budget(settings.max_eval, batch_size);
    let comparator = settings.comparator();

    info!(
        function = objective.name(),
        n_var,
        p_err = settings.noise.value(),
        batch_size,
        iterations,
        "starting noisy ranking run"
    );

    let mut champions: Vec<ScoredCandidate> = Vec::with_capacity(iterations);
    let mut champion_values = Vec::with_capacity(iterations);
    let mut best_so_far = Vec::with_capacity(iterations);
    let mut comparisons = 0usize;

    for iteration in 0..iterations {
        // ASK
        let batch = optimizer.ask(&mut *rng);

        // EVALUATE
        let scored = batch
            .into_iter()
            .map(|x| objective.evaluate(&x).map(|value| ScoredCandidate::new(value, x)))
            .collect::<Result<Vec<_>, BenchmarkError>>()?;

        // NOISY_SORT
        let (ranked, batch_stats) = comparator.sort_with_stats(scored, &mut *rng);
        let Some(champion) = ranked.first().cloned() else {
            return Err(RunError::EmptyBatch { iteration });
        };

        // TELL
        let ranks: Vec<f64> = (0..ranked.len()).map(|r| r as f64).collect();
        let solutions: Vec<Vec<f64>> = ranked.into_iter().map(|c| c.x).collect();
        optimizer.tell(&solutions, &ranks)?;

        // RECORD_BEST
        champion_values.push(champion.value);
        champions.push(champion);
        let (order, champion_stats) = comparator.rank_order_with_stats(&champions, &mut *rng);
        let best = champions[order[0]].value;
        best_so_far.push(best);
        comparisons += batch_stats.comparisons + champion_stats.comparisons;

        debug!(
            iteration,
            evaluations = evaluations_at(iteration, batch_size),
            champion = champion_values[iteration],
            best,
            batch_comparisons = batch_stats.comparisons,
            batch_pairs = batch_stats.distinct_pairs,
            champion_comparisons = champion_stats.comparisons,
            "iteration complete"
        );
    }

    let outcome = RunOutcome {
        batch_size,
        iterations,
        initial_guess,
        champion_values,
        best_so_far,
        comparisons,
    };

    info!(
        function = objective.name(),
        n_var,
        p_err = settings.noise.value(),
        final_best = outcome.final_best().unwrap_or(f64::NAN),
        comparisons,
        "finished noisy ranking run"
    );

    Ok(outcome)
}
