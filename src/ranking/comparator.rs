//! Noisy pairwise comparator.
//!
//! Models a rater who is asked "which of these two is better?" and answers
//! wrongly with a fixed probability. The comparator only ever sees two scored
//! candidates at a time; the ranking it induces is whatever a comparison sort
//! makes of those answers.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// Noise level
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NoiseLevelError {
    #[error("noise probability must be in [0, 1], got {0}")]
    OutOfRange(f64),
    #[error("noise probability is NaN")]
    NotANumber,
}

/// Probability that a single pairwise answer is inverted.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct NoiseLevel(f64);

impl NoiseLevel {
    /// A comparator that never lies.
    pub const NONE: NoiseLevel = NoiseLevel(0.0);

    pub fn new(p_err: f64) -> Result<Self, NoiseLevelError> {
        if p_err.is_nan() {
            return Err(NoiseLevelError::NotANumber);
        }
        if !(0.0..=1.0).contains(&p_err) {
            return Err(NoiseLevelError::OutOfRange(p_err));
        }
        Ok(Self(p_err))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Curve label used in plots, e.g. `"35%"`.
    pub fn percent_label(self) -> String {
        format!("{:.0}%", 100.0 * self.0)
    }

    /// One Bernoulli(p_err) draw. Always consumes exactly one uniform sample.
    fn draw_flip(self, rng: &mut impl Rng) -> bool {
        rng.gen::<f64>() < self.0
    }
}

impl TryFrom<f64> for NoiseLevel {
    type Error = NoiseLevelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Scored candidates and comparison keys
// =============================================================================

/// A candidate vector paired with its true objective value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub value: f64,
    pub x: Vec<f64>,
}

impl ScoredCandidate {
    pub fn new(value: f64, x: Vec<f64>) -> Self {
        Self { value, x }
    }

    /// The quantity a comparison looks at.
    ///
    /// A component index past the end of the vector yields NaN, which is
    /// never "greater" than anything.
    pub fn key_value(&self, key: CompareKey) -> f64 {
        match key {
            CompareKey::Objective => self.value,
            CompareKey::Component(d) => self.x.get(d).copied().unwrap_or(f64::NAN),
        }
    }
}

/// Which element of a scored candidate the comparator inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareKey {
    /// The true objective value (lower is better).
    #[default]
    Objective,
    /// A single coordinate of the candidate vector.
    Component(usize),
}

/// When the comparator draws its random flips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoisePolicy {
    /// One flip per unordered pair per sort; repeated questions about the
    /// same pair get the same answer, so the comparator stays antisymmetric.
    #[default]
    PerPair,
    /// A fresh flip on every call. Asking twice about the same pair can give
    /// contradictory answers within a single sort.
    PerComparison,
}

// =============================================================================
// Comparator
// =============================================================================

/// Noiseless label: `2·(first > second) − 1`.
pub fn true_label(first: f64, second: f64) -> i32 {
    2 * i32::from(first > second) - 1
}

/// Compare two scored candidates, inverting the answer with probability
/// `noise`. Returns -1 (first is better) or +1 (second is better).
pub fn noisy_compare(
    first: &ScoredCandidate,
    second: &ScoredCandidate,
    key: CompareKey,
    noise: NoiseLevel,
    rng: &mut impl Rng,
) -> i32 {
    let label = true_label(first.key_value(key), second.key_value(key));
    if noise.draw_flip(rng) {
        -label
    } else {
        label
    }
}

pub fn label_to_ordering(label: i32) -> Ordering {
    if label < 0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// A noisy rater bound to one noise level, key and flip policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoisyComparator {
    pub noise: NoiseLevel,
    pub key: CompareKey,
    pub policy: NoisePolicy,
}

impl NoisyComparator {
    pub fn new(noise: NoiseLevel, key: CompareKey, policy: NoisePolicy) -> Self {
        Self { noise, key, policy }
    }

    /// Start a sort-scoped session. `PerPair` memoizes flips for the lifetime
    /// of the session only.
    pub fn session(&self) -> ComparisonSession {
        ComparisonSession {
            comparator: *self,
            pair_flips: HashMap::new(),
            comparisons: 0,
        }
    }

    /// Indices of `items` in noisy ascending order (best first).
    pub fn rank_order(&self, items: &[ScoredCandidate], rng: &mut impl Rng) -> Vec<usize> {
        self.rank_order_with_stats(items, rng).0
    }

    /// Like [`rank_order`](Self::rank_order), also reporting how many
    /// questions the sort asked.
    pub fn rank_order_with_stats(
        &self,
        items: &[ScoredCandidate],
        rng: &mut impl Rng,
    ) -> (Vec<usize>, SortStats) {
        let mut session = self.session();
        let order = super::sort::comparison_sort(items.len(), |i, j| {
            label_to_ordering(session.compare(items, i, j, &mut *rng))
        });
        (order, session.stats())
    }

    /// Consume `items` and return them in noisy ascending order.
    pub fn sort(&self, items: Vec<ScoredCandidate>, rng: &mut impl Rng) -> Vec<ScoredCandidate> {
        self.sort_with_stats(items, rng).0
    }

    pub fn sort_with_stats(
        &self,
        items: Vec<ScoredCandidate>,
        rng: &mut impl Rng,
    ) -> (Vec<ScoredCandidate>, SortStats) {
        let (order, stats) = self.rank_order_with_stats(&items, rng);
        let mut slots: Vec<Option<ScoredCandidate>> = items.into_iter().map(Some).collect();
        let sorted = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();
        (sorted, stats)
    }
}

/// Question counts from one sort call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SortStats {
    /// Pairwise questions asked.
    pub comparisons: usize,
    /// Distinct unordered pairs with a memoized flip. Zero under `PerComparison`.
    pub distinct_pairs: usize,
}

/// Comparator state for the duration of one sort call.
#[derive(Debug)]
pub struct ComparisonSession {
    comparator: NoisyComparator,
    pair_flips: HashMap<(usize, usize), bool>,
    comparisons: usize,
}

impl ComparisonSession {
    /// Noisy label for `items[i]` vs `items[j]`.
    pub fn compare(
        &mut self,
        items: &[ScoredCandidate],
        i: usize,
        j: usize,
        rng: &mut impl Rng,
    ) -> i32 {
        self.comparisons += 1;
        let NoisyComparator { noise, key, policy } = self.comparator;
        match policy {
            NoisePolicy::PerComparison => noisy_compare(&items[i], &items[j], key, noise, rng),
            NoisePolicy::PerPair => {
                let label = true_label(items[i].key_value(key), items[j].key_value(key));
                let pair = (i.min(j), i.max(j));
                let flip = *self
                    .pair_flips
                    .entry(pair)
                    .or_insert_with(|| noise.draw_flip(rng));
                if flip {
                    -label
                } else {
                    label
                }
            }
        }
    }

    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    /// Distinct pairs that have been asked about (only tracked for `PerPair`).
    pub fn pairs_seen(&self) -> usize {
        self.pair_flips.len()
    }

    pub fn stats(&self) -> SortStats {
        SortStats {
            comparisons: self.comparisons,
            distinct_pairs: self.pairs_seen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn true_label_matches_sign_convention() {
        assert_eq!(true_label(1.0, 2.0), -1);
        assert_eq!(true_label(2.0, 1.0), 1);
        // Ties are "not greater".
        assert_eq!(true_label(3.0, 3.0), -1);
        assert_eq!(true_label(f64::NAN, 0.0), -1);
    }

    #[test]
    fn percent_label_rounds_to_whole_percent() {
        assert_eq!(NoiseLevel::new(0.35).unwrap().percent_label(), "35%");
        assert_eq!(NoiseLevel::NONE.percent_label(), "0%");
        assert_eq!(NoiseLevel::new(0.05).unwrap().percent_label(), "5%");
    }

    #[test]
    fn per_pair_session_reuses_flip_for_repeated_pair() {
        let items = vec![
            ScoredCandidate::new(1.0, vec![0.0]),
            ScoredCandidate::new(2.0, vec![0.0]),
        ];
        let cmp = NoisyComparator::new(
            NoiseLevel::new(0.5).unwrap(),
            CompareKey::Objective,
            NoisePolicy::PerPair,
        );
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let mut session = cmp.session();
            let ab = session.compare(&items, 0, 1, &mut rng);
            let ba = session.compare(&items, 1, 0, &mut rng);
            let ab_again = session.compare(&items, 0, 1, &mut rng);
            assert_eq!(ab, -ba);
            assert_eq!(ab, ab_again);
            assert_eq!(session.pairs_seen(), 1);
            assert_eq!(session.comparisons(), 3);
        }
    }
}
