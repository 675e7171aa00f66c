//! Benchmark objective functions.
//!
//! Standard single-objective test problems, each with a known global minimum
//! of 0. Definitions follow the usual pymoo conventions (sphere is centred
//! at 0.5, the rest at the origin or at 1 for rosenbrock).

use std::f64::consts::{E, PI};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BenchmarkError {
    #[error("unknown benchmark function '{0}' (expected one of: {list})", list = Benchmark::names().join(", "))]
    UnknownFunction(String),
    #[error("{function} requires n_var >= {min}, got {n_var}")]
    InvalidDimension {
        function: Benchmark,
        n_var: usize,
        min: usize,
    },
    #[error("{function} was built for n_var = {expected}, got a vector of length {actual}")]
    DimensionMismatch {
        function: Benchmark,
        expected: usize,
        actual: usize,
    },
}

/// A scalar objective to be minimized.
pub trait Objective {
    fn name(&self) -> &str;
    fn n_var(&self) -> usize;
    fn evaluate(&self, x: &[f64]) -> Result<f64, BenchmarkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    Ackley,
    Rosenbrock,
    Sphere,
    Zakharov,
    Rastrigin,
    Griewank,
}

impl Benchmark {
    pub const ALL: [Benchmark; 6] = [
        Benchmark::Ackley,
        Benchmark::Rosenbrock,
        Benchmark::Sphere,
        Benchmark::Zakharov,
        Benchmark::Rastrigin,
        Benchmark::Griewank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Benchmark::Ackley => "ackley",
            Benchmark::Rosenbrock => "rosenbrock",
            Benchmark::Sphere => "sphere",
            Benchmark::Zakharov => "zakharov",
            Benchmark::Rastrigin => "rastrigin",
            Benchmark::Griewank => "griewank",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|b| b.as_str()).collect()
    }

    /// Smallest dimensionality the function is defined for.
    pub fn min_n_var(self) -> usize {
        match self {
            Benchmark::Rosenbrock => 2,
            _ => 1,
        }
    }

    /// Location of the global minimum in `n_var` dimensions.
    pub fn optimum(self, n_var: usize) -> Vec<f64> {
        match self {
            Benchmark::Sphere => vec![0.5; n_var],
            Benchmark::Rosenbrock => vec![1.0; n_var],
            _ => vec![0.0; n_var],
        }
    }

    fn eval_unchecked(self, x: &[f64]) -> f64 {
        match self {
            Benchmark::Ackley => ackley(x),
            Benchmark::Rosenbrock => rosenbrock(x),
            Benchmark::Sphere => sphere(x),
            Benchmark::Zakharov => zakharov(x),
            Benchmark::Rastrigin => rastrigin(x),
            Benchmark::Griewank => griewank(x),
        }
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Benchmark {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == wanted)
            .ok_or_else(|| BenchmarkError::UnknownFunction(s.to_string()))
    }
}

/// A benchmark function fixed to one dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkProblem {
    function: Benchmark,
    n_var: usize,
}

impl BenchmarkProblem {
    pub fn new(function: Benchmark, n_var: usize) -> Result<Self, BenchmarkError> {
        let min = function.min_n_var();
        if n_var < min {
            return Err(BenchmarkError::InvalidDimension {
                function,
                n_var,
                min,
            });
        }
        Ok(Self { function, n_var })
    }

    pub fn function(&self) -> Benchmark {
        self.function
    }
}

impl Objective for BenchmarkProblem {
    fn name(&self) -> &str {
        self.function.as_str()
    }

    fn n_var(&self) -> usize {
        self.n_var
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64, BenchmarkError> {
        if x.len() != self.n_var {
            return Err(BenchmarkError::DimensionMismatch {
                function: self.function,
                expected: self.n_var,
                actual: x.len(),
            });
        }
        Ok(self.function.eval_unchecked(x))
    }
}

/// Look up a benchmark by name and fix its dimensionality.
pub fn get_problem(name: &str, n_var: usize) -> Result<BenchmarkProblem, BenchmarkError> {
    BenchmarkProblem::new(name.parse()?, n_var)
}

// ---------------------------------------------------------------------
//  Function definitions
// ---------------------------------------------------------------------

/// Ackley (a = 20, b = 0.2, c = 2π). Multimodal; minimum 0 at the origin.
pub fn ackley(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let sum_sq: f64 = x.iter().map(|xi| xi * xi).sum();
    let sum_cos: f64 = x.iter().map(|xi| (2.0 * PI * xi).cos()).sum();
    -20.0 * (-0.2 * (sum_sq / n).sqrt()).exp() - (sum_cos / n).exp() + 20.0 + E
}

/// Rosenbrock. Minimum 0 at (1, …, 1).
pub fn rosenbrock(x: &[f64]) -> f64 {
    x.windows(2)
        .map(|w| {
            let a = w[1] - w[0] * w[0];
            let b = w[0] - 1.0;
            100.0 * a * a + b * b
        })
        .sum()
}

/// Sphere centred at 0.5.
pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|xi| (xi - 0.5) * (xi - 0.5)).sum()
}

/// Zakharov. Unimodal; minimum 0 at the origin.
pub fn zakharov(x: &[f64]) -> f64 {
    let sum_sq: f64 = x.iter().map(|xi| xi * xi).sum();
    let weighted: f64 = x
        .iter()
        .enumerate()
        .map(|(i, xi)| 0.5 * (i + 1) as f64 * xi)
        .sum();
    sum_sq + weighted.powi(2) + weighted.powi(4)
}

/// Rastrigin (A = 10). Minimum 0 at the origin.
pub fn rastrigin(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    10.0 * n
        + x.iter()
            .map(|xi| xi * xi - 10.0 * (2.0 * PI * xi).cos())
            .sum::<f64>()
}

/// Griewank. Minimum 0 at the origin.
pub fn griewank(x: &[f64]) -> f64 {
    let sum: f64 = x.iter().map(|xi| xi * xi).sum::<f64>() / 4000.0;
    let prod: f64 = x
        .iter()
        .enumerate()
        .map(|(i, xi)| (xi / ((i + 1) as f64).sqrt()).cos())
        .product();
    1.0 + sum - prod
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_function_is_zero_at_its_optimum() {
        for function in Benchmark::ALL {
            for n_var in [2usize, 4, 8] {
                let problem = BenchmarkProblem::new(function, n_var).unwrap();
                let value = problem.evaluate(&function.optimum(n_var)).unwrap();
                assert!(value.abs() < 1e-10, "{function} n_var={n_var}: {value}");
            }
        }
    }

    #[test]
    fn functions_are_positive_away_from_optimum() {
        let x = [0.3, -1.2, 2.0, 0.7];
        for function in Benchmark::ALL {
            let problem = BenchmarkProblem::new(function, x.len()).unwrap();
            assert!(problem.evaluate(&x).unwrap() > 0.0, "{function}");
        }
    }

    #[test]
    fn zakharov_matches_hand_computation() {
        // sum_sq = 1 + 4 = 5; weighted = 0.5*1 + 1.0*2 = 2.5
        let expected = 5.0 + 2.5f64.powi(2) + 2.5f64.powi(4);
        assert!((zakharov(&[1.0, 2.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn lookup_is_case_insensitive_and_validates() {
        assert_eq!(get_problem("Ackley", 4).unwrap().function(), Benchmark::Ackley);
        assert!(matches!(
            get_problem("himmelblau", 2),
            Err(BenchmarkError::UnknownFunction(_))
        ));
        assert!(matches!(
            get_problem("rosenbrock", 1),
            Err(BenchmarkError::InvalidDimension { min: 2, .. })
        ));
        assert!(matches!(
            get_problem("sphere", 0),
            Err(BenchmarkError::InvalidDimension { min: 1, .. })
        ));
    }

    #[test]
    fn evaluate_rejects_wrong_length() {
        let problem = get_problem("sphere", 3).unwrap();
        assert!(matches!(
            problem.evaluate(&[0.0, 0.0]),
            Err(BenchmarkError::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
    }
}
