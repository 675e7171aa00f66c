//! Sweep runner: every (function, n_var, p_err) combination of a config.
//!
//! Runs are sequential. Each run reseeds from the config's seed, so all
//! noise levels of one (function, n_var) start from the same initial guess.

use serde::Serialize;
use tracing::info;

use crate::benchmarks::{BenchmarkError, BenchmarkProblem};
use crate::config::{ConfigError, ExperimentConfig};
use crate::plot::{Figure, NoiseCurve, PlotError, PlotSink};
use crate::ranking::{run_cmaes, NoiseLevel, RunError, RunOutcome, TracePoint};

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),
    #[error("{function} n_var={n_var} p_err={p_err}: {source}")]
    Run {
        function: String,
        n_var: usize,
        p_err: f64,
        #[source]
        source: RunError,
    },
    #[error("plot error: {0}")]
    Plot(#[from] PlotError),
}

/// One run's record, as written to the JSONL output.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub function: String,
    pub n_var: usize,
    pub p_err: f64,
    pub seed: u64,
    pub batch_size: usize,
    pub iterations: usize,
    pub initial_guess: Vec<f64>,
    pub final_best: Option<f64>,
    /// Pairwise questions asked during the run.
    pub comparisons: usize,
    pub trace: Vec<TracePoint>,
}

impl RunSummary {
    pub fn from_outcome(
        function: &str,
        n_var: usize,
        noise: NoiseLevel,
        seed: u64,
        outcome: &RunOutcome,
    ) -> Self {
        Self {
            function: function.to_string(),
            n_var,
            p_err: noise.value(),
            seed,
            batch_size: outcome.batch_size,
            iterations: outcome.iterations,
            initial_guess: outcome.initial_guess.clone(),
            final_best: outcome.final_best(),
            comparisons: outcome.comparisons,
            trace: outcome.trace_points(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub runs: Vec<RunSummary>,
    pub figures: usize,
}

/// Run the full sweep, handing one figure per (function, n_var) to `sink`.
pub fn run_experiment(
    config: &ExperimentConfig,
    sink: &mut dyn PlotSink,
) -> Result<ExperimentReport, ExperimentError> {
    config.validate()?;
    let functions = config.benchmarks()?;
    let noise_levels = config.noise_levels().map_err(ConfigError::from)?;

    let mut runs = Vec::new();
    let mut figures = 0usize;

    for function in functions {
        for &n_var in &config.n_var_list {
            let problem = BenchmarkProblem::new(function, n_var)?;
            let mut figure = Figure::new(function.as_str(), n_var, config.max_eval);

            for &noise in &noise_levels {
                let settings = config.run_settings(noise);
                let outcome =
                    run_cmaes(&problem, &settings).map_err(|source| ExperimentError::Run {
                        function: function.to_string(),
                        n_var,
                        p_err: noise.value(),
                        source,
                    })?;

                let summary =
                    RunSummary::from_outcome(function.as_str(), n_var, noise, config.seed, &outcome);
                figure.curves.push(NoiseCurve {
                    noise,
                    points: summary.trace.clone(),
                });
                runs.push(summary);
            }

            sink.render(&figure)?;
            figures += 1;
            info!(function = %function, n_var, curves = figure.curves.len(), "configuration done");
        }
    }

    Ok(ExperimentReport { runs, figures })
}
