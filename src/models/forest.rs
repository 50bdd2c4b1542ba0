use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ModelError, check_matrix};

/// Feature values closer than this are treated as equal when placing splits.
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Random forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// None grows trees until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Weighted fraction of class 1 among the training rows in the leaf.
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary classification tree grown on gini impurity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Impurity decrease per feature, normalized to sum to 1 (all zero for a stump).
    importances: Vec<f64>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    /// Negated weighted child impurity; larger is better.
    proxy: f64,
}

struct Grower<'a> {
    x: &'a [f64],
    n_features: usize,
    y: &'a [u8],
    weights: &'a [f64],
    params: &'a ForestParams,
    max_features: usize,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

fn gini(weight: f64, positive: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let p = positive / weight;
    2.0 * p * (1.0 - p)
}

impl Grower<'_> {
    fn value(&self, row: usize, feature: usize) -> f64 {
        self.x[row * self.n_features + feature]
    }

    fn totals(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(w, p), &r| {
            let wr = self.weights[r];
            (w + wr, if self.y[r] == 1 { p + wr } else { p })
        })
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let (weight, positive) = self.totals(&rows);
        let impurity = gini(weight, positive);
        self.nodes.push(Node::Leaf {
            value: if weight > 0.0 { positive / weight } else { 0.0 },
        });

        let n = rows.len();
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || impurity <= f64::EPSILON
        {
            return id;
        }

        let mut rows = rows;
        let Some(best) = self.best_split(&mut rows) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.value(r, best.feature) <= best.threshold);

        let (wl, pl) = self.totals(&left_rows);
        let (wr, pr) = self.totals(&right_rows);
        self.importances[best.feature] += weight * impurity - wl * gini(wl, pl) - wr * gini(wr, pr);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    /// Search up to `max_features` non-constant features, drawn in random order.
    fn best_split(&mut self, rows: &mut [usize]) -> Option<Candidate> {
        let (weight, positive) = self.totals(rows);
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = rows.len();

        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(&mut *self.rng);

        let mut visited = 0;
        let mut best: Option<Candidate> = None;

        for feature in features {
            if visited >= self.max_features {
                break;
            }
            rows.sort_by(|&a, &b| self.value(a, feature).total_cmp(&self.value(b, feature)));
            if self.value(rows[n - 1], feature) <= self.value(rows[0], feature) + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let (mut wl, mut pl) = (0.0, 0.0);
            for i in 0..n - 1 {
                let r = rows[i];
                wl += self.weights[r];
                if self.y[r] == 1 {
                    pl += self.weights[r];
                }

                let here = self.value(r, feature);
                let next = self.value(rows[i + 1], feature);
                if next <= here + FEATURE_THRESHOLD {
                    continue;
                }
                if i + 1 < min_leaf || n - i - 1 < min_leaf {
                    continue;
                }

                let (wr, pr) = (weight - wl, positive - pl);
                let proxy = -(wl * gini(wl, pl) + wr * gini(wr, pr));
                if best.as_ref().is_none_or(|b| proxy > b.proxy) {
                    let mut threshold = here / 2.0 + next / 2.0;
                    if threshold >= next || !threshold.is_finite() {
                        threshold = here;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        proxy,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    /// Grow a tree on row-major `x` with per-row `weights`.
    ///
    /// Rows with zero weight take no part in the tree. `max_features` features
    /// are tried at each node.
    pub fn fit(
        x: &[f64],
        n_features: usize,
        y: &[u8],
        weights: &[f64],
        params: &ForestParams,
        max_features: usize,
        rng: &mut StdRng,
    ) -> Result<Self, ModelError> {
        let n_rows = check_matrix(x, n_features)?;
        if y.len() != n_rows || weights.len() != n_rows {
            return Err(ModelError::LabelCount {
                labels: y.len().min(weights.len()),
                rows: n_rows,
            });
        }
        Ok(Self::grow(x, n_features, y, weights, params, max_features, rng))
    }

    fn grow(
        x: &[f64],
        n_features: usize,
        y: &[u8],
        weights: &[f64],
        params: &ForestParams,
        max_features: usize,
        rng: &mut StdRng,
    ) -> Self {
        let rows: Vec<usize> = (0..y.len()).filter(|&r| weights[r] > 0.0).collect();

        let mut grower = Grower {
            x,
            n_features,
            y,
            weights,
            params,
            max_features: max_features.clamp(1, n_features),
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        grower.grow(rows, 0);

        let mut importances = grower.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Self {
            nodes: grower.nodes,
            n_features,
            importances,
        }
    }

    /// Probability of class 1 for one row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.n_features);
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

/// Bagged ensemble of gini trees with `sqrt(n_features)` candidates per split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    pub seed: u64,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on a row-major `x` with `n_features` columns and 0/1 labels `y`.
    ///
    /// Tree `t` draws its bootstrap sample and feature order from `seed + t`, so the
    /// fitted forest does not depend on how trees are scheduled across threads.
    pub fn fit(x: &[f64], n_features: usize, y: &[u8], params: ForestParams, seed: u64) -> Result<Self, ModelError> {
        let n_rows = check_matrix(x, n_features)?;
        if y.len() != n_rows {
            return Err(ModelError::LabelCount {
                labels: y.len(),
                rows: n_rows,
            });
        }
        if params.n_estimators == 0 {
            return Err(ModelError::EmptyGrid);
        }

        let max_features = ((n_features as f64).sqrt() as usize).max(1);

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let mut weights = vec![0.0; n_rows];
                for _ in 0..n_rows {
                    weights[rng.gen_range(0..n_rows)] += 1.0;
                }
                DecisionTree::grow(x, n_features, y, &weights, &params, max_features, &mut rng)
            })
            .collect();

        let importances = average_importances(&trees, n_features);

        Ok(Self {
            params,
            seed,
            n_features,
            trees,
            importances,
        })
    }

    /// Mean class-1 probability over all trees, one value per row of `x`.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_matrix(x, self.n_features).map_err(|e| match e {
            ModelError::Shape { .. } => ModelError::FeatureCount {
                features: x.len(),
                expected: self.n_features,
            },
            other => other,
        })?;

        let n_trees = self.trees.len() as f64;
        Ok(x.chunks(self.n_features)
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    /// Mean normalized impurity decrease per feature, summing to 1 unless no tree split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

/// Average per-tree importances over trees that split at least once, then renormalize.
fn average_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let split_trees: Vec<&DecisionTree> = trees.iter().filter(|t| t.node_count() > 1).collect();
    let mut mean = vec![0.0; n_features];
    if split_trees.is_empty() {
        return mean;
    }

    for tree in &split_trees {
        for (m, v) in mean.iter_mut().zip(tree.feature_importances()) {
            *m += v;
        }
    }
    let total: f64 = mean.iter().sum();
    if total > 0.0 {
        mean.iter_mut().for_each(|m| *m /= total);
    }
    mean
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feature 0 separates the classes, feature 1 is constant.
    fn separable(n: usize) -> (Vec<f64>, Vec<u8>) {
        let mut x = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let label = u8::from(i % 3 == 0);
            x.push(if label == 1 { 5.0 + i as f64 * 0.01 } else { i as f64 * 0.01 });
            x.push(1.0);
            y.push(label);
        }
        (x, y)
    }

    #[test]
    fn test_forest_learns_separable_feature() {
        let (x, y) = separable(60);
        let params = ForestParams {
            n_estimators: 25,
            ..Default::default()
        };
        let forest = RandomForest::fit(&x, 2, &y, params, 42).unwrap();
        let probs = forest.predict_proba(&x).unwrap();

        assert_eq!(probs.len(), 60);
        assert_eq!(stats::roc_auc(&probs, &y), Some(1.0));
        for (&p, &label) in probs.iter().zip(&y) {
            assert!((0.0..=1.0).contains(&p));
            if label == 1 {
                assert!(p > 0.5);
            }
        }

        // The constant column is never a split candidate.
        let imp = forest.feature_importances();
        assert!((imp[0] - 1.0).abs() < 1e-9);
        assert_eq!(imp[1], 0.0);
    }

    #[test]
    fn test_forest_is_deterministic() {
        let (x, y) = separable(40);
        let params = ForestParams {
            n_estimators: 10,
            max_depth: Some(3),
            ..Default::default()
        };
        let a = RandomForest::fit(&x, 2, &y, params, 7).unwrap();
        let b = RandomForest::fit(&x, 2, &y, params, 7).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_depth_zero_gives_stumps_without_importance() {
        let (x, y) = separable(30);
        let params = ForestParams {
            n_estimators: 5,
            max_depth: Some(0),
            ..Default::default()
        };
        let forest = RandomForest::fit(&x, 2, &y, params, 42).unwrap();
        assert!(forest.trees().iter().all(|t| t.node_count() == 1));
        assert!(forest.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_min_samples_leaf_limits_growth() {
        let (x, y) = separable(30);
        let mut rng = StdRng::seed_from_u64(1);
        let weights = vec![1.0; 30];
        let params = ForestParams {
            min_samples_leaf: 15,
            ..Default::default()
        };
        let tree = DecisionTree::fit(&x, 2, &y, &weights, &params, 2, &mut rng).unwrap();
        // Only a 15/15 split is allowed and then both children are too small.
        assert!(tree.node_count() <= 3);
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(
            RandomForest::fit(&[], 2, &[], ForestParams::default(), 42).err(),
            Some(ModelError::Empty)
        );
        assert!(matches!(
            RandomForest::fit(&[1.0, 2.0, 3.0], 2, &[0], ForestParams::default(), 42),
            Err(ModelError::Shape { .. })
        ));
        assert!(matches!(
            RandomForest::fit(&[1.0, 2.0], 2, &[0, 1], ForestParams::default(), 42),
            Err(ModelError::LabelCount { .. })
        ));

        let (x, y) = separable(12);
        let forest = RandomForest::fit(&x, 2, &y, ForestParams { n_estimators: 3, ..Default::default() }, 42).unwrap();
        assert!(matches!(
            forest.predict_proba(&[1.0, 2.0, 3.0]),
            Err(ModelError::FeatureCount { .. })
        ));
    }
}
