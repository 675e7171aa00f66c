//! Ask/tell optimizer interface.
//!
//! The ranking loop only needs two things from an optimizer: a batch of
//! candidates to score, and a way to hand back a ranked batch. Anything that
//! speaks this protocol can be driven by noisy feedback.

pub mod cmaes;

use rand::RngCore;

pub use cmaes::CmaEs;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizerError {
    #[error("initial mean must have at least one dimension")]
    EmptyInitialMean,
    #[error("initial step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),
    #[error("initial mean contains a non-finite value at index {0}")]
    NonFiniteMean(usize),
    #[error("expected {expected} ranked candidates, got {actual}")]
    BatchSizeMismatch { expected: usize, actual: usize },
    #[error("got {solutions} candidates but {fitness} fitness values")]
    FitnessLengthMismatch { solutions: usize, fitness: usize },
    #[error("candidate {index} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// A population-based optimizer driven through `ask` / `tell`.
///
/// Fitness values passed to `tell` are minimized; the ranking loop passes
/// rank positions (0 = best) rather than objective values.
pub trait AskTellOptimizer {
    /// Candidates proposed per `ask`.
    fn batch_size(&self) -> usize;

    /// Dimensionality of every candidate.
    fn dimension(&self) -> usize;

    /// Propose a batch of `batch_size()` candidates.
    fn ask(&mut self, rng: &mut dyn RngCore) -> Vec<Vec<f64>>;

    /// Update from a batch and its fitness values (lower is better).
    fn tell(&mut self, solutions: &[Vec<f64>], fitness: &[f64]) -> Result<(), OptimizerError>;
}
