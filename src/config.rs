//! Experiment configuration.
//!
//! Every field has a default matching the reference sweep, so an empty JSON
//! object (or no file at all) reproduces it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::benchmarks::{Benchmark, BenchmarkError};
use crate::ranking::{
    CompareKey, NoiseLevel, NoiseLevelError, NoisePolicy, RunSettings, DEFAULT_MAX_EVAL,
    DEFAULT_SEED, DEFAULT_SIGMA0,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),
    #[error(transparent)]
    Noise(#[from] NoiseLevelError),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("n_var must be >= 1")]
    ZeroDimension,
    #[error("max_eval must be >= 1")]
    ZeroBudget,
    #[error("sigma0 must be positive and finite, got {0}")]
    InvalidSigma(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Benchmark function names.
    #[serde(default = "default_functions")]
    pub functions: Vec<String>,

    /// Dimensionalities to sweep.
    #[serde(default = "default_n_var_list")]
    pub n_var_list: Vec<usize>,

    /// Noise probabilities to sweep; one curve each.
    #[serde(default = "default_p_err_list")]
    pub p_err_list: Vec<f64>,

    /// Objective evaluation cap per run.
    #[serde(default = "default_max_eval")]
    pub max_eval: usize,

    /// Seed applied at the start of every run.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Initial optimizer step size.
    #[serde(default = "default_sigma0")]
    pub sigma0: f64,

    #[serde(default)]
    pub noise_policy: NoisePolicy,

    #[serde(default)]
    pub compare_key: CompareKey,
}

fn default_functions() -> Vec<String> {
    vec!["ackley".to_string()]
}

/// logspace(2, 5, 4, base = 2)
fn default_n_var_list() -> Vec<usize> {
    vec![4, 8, 16, 32]
}

fn default_p_err_list() -> Vec<f64> {
    vec![0.0, 0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35]
}

fn default_max_eval() -> usize {
    DEFAULT_MAX_EVAL
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_sigma0() -> f64 {
    DEFAULT_SIGMA0
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            functions: default_functions(),
            n_var_list: default_n_var_list(),
            p_err_list: default_p_err_list(),
            max_eval: default_max_eval(),
            seed: default_seed(),
            sigma0: default_sigma0(),
            noise_policy: NoisePolicy::default(),
            compare_key: CompareKey::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.functions.is_empty() {
            return Err(ConfigError::Empty("functions"));
        }
        if self.n_var_list.is_empty() {
            return Err(ConfigError::Empty("n_var_list"));
        }
        if self.p_err_list.is_empty() {
            return Err(ConfigError::Empty("p_err_list"));
        }
        if self.n_var_list.contains(&0) {
            return Err(ConfigError::ZeroDimension);
        }
        if self.max_eval == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if !(self.sigma0.is_finite() && self.sigma0 > 0.0) {
            return Err(ConfigError::InvalidSigma(self.sigma0));
        }
        self.benchmarks()?;
        self.noise_levels()?;
        Ok(())
    }

    pub fn benchmarks(&self) -> Result<Vec<Benchmark>, BenchmarkError> {
        self.functions.iter().map(|name| name.parse()).collect()
    }

    pub fn noise_levels(&self) -> Result<Vec<NoiseLevel>, NoiseLevelError> {
        self.p_err_list.iter().map(|&p| NoiseLevel::new(p)).collect()
    }

    /// Settings for one run at `noise`.
    pub fn run_settings(&self, noise: NoiseLevel) -> RunSettings {
        RunSettings::new(noise)
            .with_max_eval(self.max_eval)
            .with_seed(self.seed)
            .with_sigma0(self.sigma0)
            .with_policy(self.noise_policy)
            .with_key(self.compare_key)
    }
}
