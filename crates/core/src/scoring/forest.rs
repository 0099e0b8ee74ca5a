//! CART regression trees and a bagged forest of them.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Columns in a feature row: category code, unit price, discount, region code, season code.
pub const FEATURE_COUNT: usize = 5;

pub type FeatureRow = [f64; FEATURE_COUNT];

const MIN_SAMPLES_SPLIT: usize = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Clone, Copy, Debug)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// A fully grown regression tree minimising squared error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fits a tree on the rows selected by `samples` (duplicates allowed).
    pub fn fit(features: &[FeatureRow], targets: &[f64], samples: Vec<usize>) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        if !samples.is_empty() {
            tree.grow(features, targets, samples);
        }
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split { feature, threshold, left, right }) => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    fn grow(&mut self, features: &[FeatureRow], targets: &[f64], samples: Vec<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean(targets, &samples) });

        if samples.len() < MIN_SAMPLES_SPLIT {
            return index;
        }
        let Some(split) = best_split(features, targets, &samples) else {
            return index;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) =
            samples.into_iter().partition(|&sample| features[sample][split.feature] <= split.threshold);
        if left_samples.is_empty() || right_samples.is_empty() {
            return index;
        }

        let left = self.grow(features, targets, left_samples);
        let right = self.grow(features, targets, right_samples);
        self.nodes[index] =
            Node::Split { feature: split.feature, threshold: split.threshold, left, right };
        index
    }
}

fn mean(targets: &[f64], samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&sample| targets[sample]).sum::<f64>() / samples.len() as f64
}

fn best_split(features: &[FeatureRow], targets: &[f64], samples: &[usize]) -> Option<Split> {
    let first = targets[samples[0]];
    if samples.iter().all(|&sample| targets[sample] == first) {
        return None;
    }

    let count = samples.len() as f64;
    let total_sum: f64 = samples.iter().map(|&sample| targets[sample]).sum();
    let total_squares: f64 = samples.iter().map(|&sample| targets[sample].powi(2)).sum();

    let mut best: Option<Split> = None;
    let mut order = samples.to_vec();

    for feature in 0..FEATURE_COUNT {
        order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        let mut left_squares = 0.0;
        for position in 1..order.len() {
            let previous = order[position - 1];
            let target = targets[previous];
            left_sum += target;
            left_squares += target * target;

            let lower = features[previous][feature];
            let upper = features[order[position]][feature];
            if lower == upper {
                continue;
            }

            let left_count = position as f64;
            let right_count = count - left_count;
            let right_sum = total_sum - left_sum;
            let right_squares = total_squares - left_squares;
            let impurity = (left_squares - left_sum * left_sum / left_count)
                + (right_squares - right_sum * right_sum / right_count);

            if best.map_or(true, |current| impurity < current.impurity) {
                best = Some(Split { feature, threshold: (lower + upper) / 2.0, impurity });
            }
        }
    }

    best
}

/// Bagged ensemble of [`RegressionTree`]s; predicts the mean of its trees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit<R: Rng>(
        features: &[FeatureRow],
        targets: &[f64],
        tree_count: usize,
        rng: &mut R,
    ) -> Self {
        let rows = features.len().min(targets.len());
        let trees = (0..tree_count)
            .map(|_| {
                let bootstrap = if rows == 0 {
                    Vec::new()
                } else {
                    (0..rows).map(|_| rng.gen_range(0..rows)).collect()
                };
                RegressionTree::fit(features, targets, bootstrap)
            })
            .collect();
        Self { trees }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, row: &FeatureRow) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{FeatureRow, RandomForest, RegressionTree};

    fn step_data() -> (Vec<FeatureRow>, Vec<f64>) {
        let features: Vec<FeatureRow> =
            (0..10).map(|i| [0.0, f64::from(i), 0.0, 0.0, 0.0]).collect();
        let targets = (0..10).map(|i| if i < 5 { 10.0 } else { 50.0 }).collect();
        (features, targets)
    }

    #[test]
    fn tree_separates_a_step_function_on_the_informative_feature() {
        let (features, targets) = step_data();
        let tree = RegressionTree::fit(&features, &targets, (0..10).collect());

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.predict(&[0.0, 2.0, 0.0, 0.0, 0.0]), 10.0);
        assert_eq!(tree.predict(&[0.0, 4.5, 0.0, 0.0, 0.0]), 10.0);
        assert_eq!(tree.predict(&[0.0, 5.0, 0.0, 0.0, 0.0]), 50.0);
        assert_eq!(tree.predict(&[0.0, 100.0, 0.0, 0.0, 0.0]), 50.0);
    }

    #[test]
    fn constant_targets_produce_a_single_leaf() {
        let features: Vec<FeatureRow> = (0..4).map(|i| [f64::from(i); 5]).collect();
        let tree = RegressionTree::fit(&features, &[7.0; 4], (0..4).collect());

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[9.0; 5]), 7.0);
    }

    #[test]
    fn forest_is_reproducible_for_a_fixed_seed() {
        let (features, targets) = step_data();
        let first = RandomForest::fit(&features, &targets, 10, &mut StdRng::seed_from_u64(7));
        let second = RandomForest::fit(&features, &targets, 10, &mut StdRng::seed_from_u64(7));

        assert_eq!(first, second);
        assert_eq!(first.tree_count(), 10);
        let prediction = first.predict(&[0.0, 8.0, 0.0, 0.0, 0.0]);
        assert!((10.0..=50.0).contains(&prediction));
    }

    #[test]
    fn empty_forest_predicts_zero() {
        let forest = RandomForest::fit(&[], &[], 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(forest.predict(&[0.0; 5]), 0.0);
    }
}
