use pairwise_robustness::benchmarks::{get_problem, BenchmarkError, Objective};
use pairwise_robustness::optimizer::{AskTellOptimizer, OptimizerError};
use pairwise_robustness::ranking::{
    iteration_budget, run_cmaes, run_noisy_ranking, CompareKey, NoiseLevel, NoisePolicy,
    RunError, RunSettings,
};
use rand::{Rng, RngCore};
use std::cell::RefCell;
use std::rc::Rc;

/// Random search around a fixed centre; records every fitness vector it is told.
struct RecordingSearch {
    centre: Vec<f64>,
    batch: usize,
    told: Rc<RefCell<Vec<Vec<f64>>>>,
}

impl AskTellOptimizer for RecordingSearch {
    fn batch_size(&self) -> usize {
        self.batch
    }

    fn dimension(&self) -> usize {
        self.centre.len()
    }

    fn ask(&mut self, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        (0..self.batch)
            .map(|_| {
                self.centre
                    .iter()
                    .map(|c| c + rng.gen_range(-0.5..0.5))
                    .collect()
            })
            .collect()
    }

    fn tell(&mut self, solutions: &[Vec<f64>], fitness: &[f64]) -> Result<(), OptimizerError> {
        assert_eq!(solutions.len(), self.batch);
        self.told.borrow_mut().push(fitness.to_vec());
        Ok(())
    }
}

fn run_recording(
    problem: &dyn Objective,
    settings: &RunSettings,
    batch: usize,
) -> (usize, Vec<Vec<f64>>) {
    let told = Rc::new(RefCell::new(Vec::new()));
    let handle = Rc::clone(&told);
    let outcome = run_noisy_ranking(problem, settings, move |guess, _sigma0| {
        Ok(RecordingSearch {
            centre: guess.to_vec(),
            batch,
            told: handle,
        })
    })
    .unwrap();
    let told = told.borrow().clone();
    (outcome.iterations, told)
}

struct BrokenObjective;

impl Objective for BrokenObjective {
    fn name(&self) -> &str {
        "broken"
    }

    fn n_var(&self) -> usize {
        2
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64, BenchmarkError> {
        Err(BenchmarkError::DimensionMismatch {
            function: pairwise_robustness::Benchmark::Sphere,
            expected: 3,
            actual: x.len(),
        })
    }
}

fn noise(p: f64) -> NoiseLevel {
    NoiseLevel::new(p).unwrap()
}

#[test]
fn performs_rounded_budget_of_iterations() {
    let sphere4 = get_problem("sphere", 4).unwrap();
    let outcome = run_cmaes(&sphere4, &RunSettings::new(noise(0.1))).unwrap();
    assert_eq!(outcome.batch_size, 8);
    assert_eq!(outcome.iterations, 250);
    assert_eq!(outcome.best_so_far.len(), 250);
    assert_eq!(outcome.champion_values.len(), 250);

    let ackley16 = get_problem("ackley", 16).unwrap();
    let outcome = run_cmaes(&ackley16, &RunSettings::new(noise(0.0))).unwrap();
    assert_eq!(outcome.batch_size, 12);
    assert_eq!(outcome.iterations, iteration_budget(2000, 12));
    assert_eq!(outcome.iterations, 167);
    assert_eq!(outcome.best_so_far.len(), 167);
}

#[test]
fn custom_optimizer_gets_one_tell_per_iteration() {
    let problem = get_problem("sphere", 3).unwrap();
    let settings = RunSettings::new(noise(0.25)).with_max_eval(100);
    let (iterations, told) = run_recording(&problem, &settings, 7);

    // round(100 / 7) = round(14.28) = 14
    assert_eq!(iterations, 14);
    assert_eq!(told.len(), 14);
}

#[test]
fn optimizer_only_sees_rank_positions() {
    let problem = get_problem("zakharov", 2).unwrap();
    let settings = RunSettings::new(noise(0.3)).with_max_eval(50);
    let (iterations, told) = run_recording(&problem, &settings, 5);

    assert_eq!(iterations, 10);
    for fitness in &told {
        assert_eq!(fitness, &vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}

#[test]
fn noiseless_trace_is_non_increasing_and_tracks_true_minimum() {
    for (name, n_var) in [("sphere", 4usize), ("ackley", 8), ("rosenbrock", 4)] {
        let problem = get_problem(name, n_var).unwrap();
        let outcome = run_cmaes(&problem, &RunSettings::new(NoiseLevel::NONE)).unwrap();
        for w in outcome.best_so_far.windows(2) {
            assert!(w[1] <= w[0], "{name}: {} then {}", w[0], w[1]);
        }
        let mut running_min = f64::INFINITY;
        for (k, &champion) in outcome.champion_values.iter().enumerate() {
            running_min = running_min.min(champion);
            assert_eq!(outcome.best_so_far[k], running_min, "{name} iteration {k}");
        }
    }
}

#[test]
fn noiseless_sphere_converges_toward_zero() {
    let problem = get_problem("sphere", 4).unwrap();
    let outcome = run_cmaes(&problem, &RunSettings::new(NoiseLevel::NONE)).unwrap();
    let trace = &outcome.best_so_far;

    assert!(trace[0] > trace[5]);
    assert!(trace[5] > trace[10]);
    assert!(trace[10] > trace[20]);
    assert!(trace[20] > trace[40]);
    let final_best = outcome.final_best().unwrap();
    assert!(final_best < 1e-8, "final best {final_best:e}");
    assert!(final_best >= 0.0);
}

#[test]
fn same_seed_shares_initial_guess_but_noise_diverges() {
    let problem = get_problem("sphere", 4).unwrap();
    let clean = run_cmaes(&problem, &RunSettings::new(NoiseLevel::NONE)).unwrap();
    let noisy = run_cmaes(&problem, &RunSettings::new(noise(0.35))).unwrap();

    assert_eq!(clean.initial_guess, noisy.initial_guess);
    assert!(clean.initial_guess.iter().all(|v| (0.0..1.0).contains(v)));
    assert_eq!(clean.iterations, noisy.iterations);
    assert_ne!(clean.best_so_far, noisy.best_so_far);
}

#[test]
fn runs_are_reproducible() {
    let problem = get_problem("ackley", 4).unwrap();
    for policy in [NoisePolicy::PerPair, NoisePolicy::PerComparison] {
        let settings = RunSettings::new(noise(0.2))
            .with_max_eval(400)
            .with_policy(policy);
        let a = run_cmaes(&problem, &settings).unwrap();
        let b = run_cmaes(&problem, &settings).unwrap();
        assert_eq!(a.best_so_far, b.best_so_far, "{policy:?}");
        assert_eq!(a.champion_values, b.champion_values, "{policy:?}");

        let other_seed = run_cmaes(&problem, &settings.clone().with_seed(1)).unwrap();
        assert_ne!(a.initial_guess, other_seed.initial_guess);
    }
}

#[test]
fn trace_points_count_cumulative_evaluations() {
    let problem = get_problem("zakharov", 8).unwrap();
    let outcome = run_cmaes(&problem, &RunSettings::new(noise(0.05)).with_max_eval(300)).unwrap();
    let points = outcome.trace_points();
    assert_eq!(points.len(), outcome.iterations);
    for (k, point) in points.iter().enumerate() {
        assert_eq!(point.iteration, k);
        assert_eq!(point.evaluations, (k + 1) * outcome.batch_size);
        assert_eq!(point.best, outcome.best_so_far[k]);
    }
}

#[test]
fn component_key_out_of_range_is_rejected() {
    let problem = get_problem("sphere", 3).unwrap();
    let settings = RunSettings::new(NoiseLevel::NONE).with_key(CompareKey::Component(3));
    match run_cmaes(&problem, &settings) {
        Err(RunError::ComponentOutOfRange { component, n_var }) => {
            assert_eq!((component, n_var), (3, 3));
        }
        other => panic!("expected ComponentOutOfRange, got {other:?}"),
    }

    let settings = RunSettings::new(NoiseLevel::NONE)
        .with_key(CompareKey::Component(0))
        .with_max_eval(200);
    let outcome = run_cmaes(&problem, &settings).unwrap();
    assert!(outcome.best_so_far.iter().all(|v| v.is_finite()));
}

#[test]
fn objective_errors_propagate() {
    let settings = RunSettings::new(NoiseLevel::NONE).with_max_eval(50);
    let err = run_cmaes(&BrokenObjective, &settings).unwrap_err();
    assert!(matches!(err, RunError::Objective(_)), "{err:?}");
}

#[test]
fn optimizer_construction_errors_propagate() {
    let problem = get_problem("sphere", 2).unwrap();
    let settings = RunSettings::new(NoiseLevel::NONE).with_sigma0(-1.0);
    let err = run_cmaes(&problem, &settings).unwrap_err();
    assert!(matches!(
        err,
        RunError::Optimizer(OptimizerError::InvalidStepSize(_))
    ));
}

#[test]
fn outcome_counts_every_comparison() {
    let problem = get_problem("sphere", 4).unwrap();
    let settings = RunSettings::new(noise(0.1)).with_max_eval(160);
    let outcome = run_cmaes(&problem, &settings).unwrap();

    // Each batch sort asks at least batch - 1 questions; each champion re-rank
    // asks at least k - 1 for k champions.
    let batch_floor = outcome.iterations * (outcome.batch_size - 1);
    let champion_floor: usize = (0..outcome.iterations).sum();
    assert!(outcome.comparisons >= batch_floor + champion_floor);

    let again = run_cmaes(&problem, &settings).unwrap();
    assert_eq!(outcome.comparisons, again.comparisons);
}
