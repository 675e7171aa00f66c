//! CMA-ES (Covariance Matrix Adaptation Evolution Strategy).
//!
//! Full-covariance implementation on nalgebra, exposed through the ask/tell
//! protocol. Minimizes in unbounded ℝⁿ. Sampling draws from a caller-owned
//! random source so an experiment can replay the exact same trajectory.
//!
//! Reference: Hansen (2016) "The CMA Evolution Strategy: A Tutorial".

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use tracing::warn;

use super::{AskTellOptimizer, OptimizerError};

const SIGMA_MIN: f64 = 1e-20;
const SIGMA_MAX: f64 = 1e10;

/// Default population size for dimension `n`: `4 + floor(3 ln n)`.
pub fn default_population_size(n: usize) -> usize {
    4 + (3.0 * (n.max(1) as f64).ln()).floor() as usize
}

/// CMA-ES optimizer state.
#[derive(Debug, Clone)]
pub struct CmaEs {
    /// Number of parameters being optimized.
    dimension: usize,
    /// Candidates sampled each generation (lambda).
    population_size: usize,
    /// Parents used for recombination (mu).
    mu: usize,
    /// Distribution mean.
    mean: DVector<f64>,
    /// Global step size.
    sigma: f64,
    /// Step size the run started with, used after a NaN reset.
    initial_sigma: f64,
    /// Mean the run started with, used after a NaN reset.
    initial_mean: DVector<f64>,
    covariance: DMatrix<f64>,
    /// Evolution path for covariance adaptation.
    p_c: DVector<f64>,
    /// Evolution path for step-size adaptation.
    p_sigma: DVector<f64>,
    /// Recombination weights for the top-mu individuals (sum to 1.0).
    weights: DVector<f64>,
    /// Variance-effective selection mass: `1 / sum(w_i^2)`.
    mu_eff: f64,
    c_c: f64,
    c_sigma: f64,
    c_1: f64,
    c_mu: f64,
    d_sigma: f64,
    /// `E[||N(0, I)||]`.
    expected_norm: f64,
    generation: u64,
}

impl CmaEs {
    /// New optimizer centred on `initial_mean` with step size `sigma0`.
    pub fn new(initial_mean: &[f64], sigma0: f64) -> Result<Self, OptimizerError> {
        let population_size = default_population_size(initial_mean.len());
        Self::with_population_size(initial_mean, sigma0, population_size)
    }

    pub fn with_population_size(
        initial_mean: &[f64],
        sigma0: f64,
        population_size: usize,
    ) -> Result<Self, OptimizerError> {
        if initial_mean.is_empty() {
            return Err(OptimizerError::EmptyInitialMean);
        }
        if !(sigma0.is_finite() && sigma0 > 0.0) {
            return Err(OptimizerError::InvalidStepSize(sigma0));
        }
        if let Some(idx) = initial_mean.iter().position(|v| !v.is_finite()) {
            return Err(OptimizerError::NonFiniteMean(idx));
        }

        let dimension = initial_mean.len();
        let n = dimension as f64;
        let population_size = population_size.max(2);
        let mu = population_size / 2;

        // w_i = ln(mu + 0.5) - ln(i + 1), normalized
        let raw_weights: Vec<f64> = (0..mu)
            .map(|i| (mu as f64 + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();
        let w_sum: f64 = raw_weights.iter().sum();
        let weights = DVector::from_iterator(mu, raw_weights.iter().map(|w| w / w_sum));
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let c_sigma = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        let d_sigma = 1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + c_sigma;
        let c_c = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);
        let c_1 = 2.0 / ((n + 1.3).powi(2) + mu_eff);
        let c_mu =
            (2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((n + 2.0).powi(2) + mu_eff)).min(1.0 - c_1);
        let expected_norm = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n.powi(2)));

        let mean = DVector::from_column_slice(initial_mean);

        Ok(Self {
            dimension,
            population_size,
            mu,
            initial_mean: mean.clone(),
            mean,
            sigma: sigma0,
            initial_sigma: sigma0,
            covariance: DMatrix::identity(dimension, dimension),
            p_c: DVector::zeros(dimension),
            p_sigma: DVector::zeros(dimension),
            weights,
            mu_eff,
            c_c,
            c_sigma,
            c_1,
            c_mu,
            d_sigma,
            expected_norm,
            generation: 0,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn mean_vec(&self) -> Vec<f64> {
        self.mean.iter().copied().collect()
    }

    fn reset_distribution(&mut self) {
        self.mean = self.initial_mean.clone();
        self.sigma = self.initial_sigma;
        self.covariance = DMatrix::identity(self.dimension, self.dimension);
        self.p_c = DVector::zeros(self.dimension);
        self.p_sigma = DVector::zeros(self.dimension);
    }
}

impl AskTellOptimizer for CmaEs {
    fn batch_size(&self) -> usize {
        self.population_size
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn ask(&mut self, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        // C = B * D^2 * B^T
        let eigen = SymmetricEigen::new(self.covariance.clone());
        let sqrt_d = DMatrix::from_diagonal(&eigen.eigenvalues.map(|v| v.max(1e-20).sqrt()));
        let bd = &eigen.eigenvectors * &sqrt_d;

        (0..self.population_size)
            .map(|_| {
                let z: DVector<f64> = DVector::from_iterator(
                    self.dimension,
                    (0..self.dimension).map(|_| StandardNormal.sample(&mut *rng)),
                );
                let x = &self.mean + self.sigma * &bd * &z;
                x.iter().copied().collect()
            })
            .collect()
    }

    fn tell(&mut self, solutions: &[Vec<f64>], fitness: &[f64]) -> Result<(), OptimizerError> {
        if solutions.len() != self.population_size {
            return Err(OptimizerError::BatchSizeMismatch {
                expected: self.population_size,
                actual: solutions.len(),
            });
        }
        if fitness.len() != solutions.len() {
            return Err(OptimizerError::FitnessLengthMismatch {
                solutions: solutions.len(),
                fitness: fitness.len(),
            });
        }
        if let Some((index, x)) = solutions
            .iter()
            .enumerate()
            .find(|(_, x)| x.len() != self.dimension)
        {
            return Err(OptimizerError::DimensionMismatch {
                index,
                expected: self.dimension,
                actual: x.len(),
            });
        }

        let population: Vec<DVector<f64>> = solutions
            .iter()
            .map(|x| DVector::from_column_slice(x))
            .collect();

        // 1. Ascending fitness; ties keep submission order.
        let mut indices: Vec<usize> = (0..self.population_size).collect();
        indices.sort_by(|&a, &b| fitness[a].total_cmp(&fitness[b]));

        // 2. Weighted mean of the top-mu individuals
        let old_mean = self.mean.clone();
        let mut new_mean = DVector::zeros(self.dimension);
        for (w_idx, &pop_idx) in indices.iter().take(self.mu).enumerate() {
            new_mean += self.weights[w_idx] * &population[pop_idx];
        }

        // 3. C^{-1/2}
        let eigen = SymmetricEigen::new(self.covariance.clone());
        let inv_sqrt_d =
            DMatrix::from_diagonal(&eigen.eigenvalues.map(|v| 1.0 / v.max(1e-20).sqrt()));
        let c_inv_sqrt = &eigen.eigenvectors * &inv_sqrt_d * eigen.eigenvectors.transpose();

        let mean_diff = (&new_mean - &old_mean) / self.sigma;

        // 4. Step-size evolution path
        self.p_sigma = (1.0 - self.c_sigma) * &self.p_sigma
            + (self.c_sigma * (2.0 - self.c_sigma) * self.mu_eff).sqrt() * &c_inv_sqrt * &mean_diff;

        // 5. Stall indicator
        let gen_factor = 1.0 - (1.0 - self.c_sigma).powi(2 * (self.generation as i32 + 1));
        let p_sigma_norm = self.p_sigma.norm();
        let h_sigma_threshold =
            (1.4 + 2.0 / (self.dimension as f64 + 1.0)) * self.expected_norm * gen_factor.sqrt();
        let h_sigma = if p_sigma_norm < h_sigma_threshold {
            1.0
        } else {
            0.0
        };

        // 6. Covariance evolution path
        self.p_c = (1.0 - self.c_c) * &self.p_c
            + h_sigma * (self.c_c * (2.0 - self.c_c) * self.mu_eff).sqrt() * &mean_diff;

        // 7. Rank-mu component
        let mut rank_mu_update = DMatrix::zeros(self.dimension, self.dimension);
        for (w_idx, &pop_idx) in indices.iter().take(self.mu).enumerate() {
            let y_i = (&population[pop_idx] - &old_mean) / self.sigma;
            rank_mu_update += self.weights[w_idx] * &y_i * y_i.transpose();
        }

        // 8. Covariance update
        let delta_h_sigma = (1.0 - h_sigma) * self.c_c * (2.0 - self.c_c);
        let base_weight = 1.0 - self.c_1 - self.c_mu + self.c_1 * delta_h_sigma;
        self.covariance = base_weight * &self.covariance
            + self.c_1 * &self.p_c * self.p_c.transpose()
            + self.c_mu * &rank_mu_update;
        self.covariance = (&self.covariance + self.covariance.transpose()) * 0.5;

        // 9. Step-size update
        self.sigma *=
            ((self.c_sigma / self.d_sigma) * (p_sigma_norm / self.expected_norm - 1.0)).exp();
        self.sigma = self.sigma.clamp(SIGMA_MIN, SIGMA_MAX);

        self.mean = new_mean;

        if self.mean.iter().any(|v| !v.is_finite())
            || !self.sigma.is_finite()
            || self.covariance.iter().any(|v| !v.is_finite())
        {
            warn!(
                generation = self.generation,
                "CMA-ES state became non-finite, resetting distribution"
            );
            self.reset_distribution();
        }

        self.generation += 1;
        Ok(())
    }
}
