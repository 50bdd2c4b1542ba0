use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stats::roc_auc;

use super::forest::{ForestParams, RandomForest};
use super::{ModelError, check_matrix};

/// Candidate values for each forest hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 5],
            min_samples_leaf: vec![1, 2],
        }
    }
}

impl ParamGrid {
    /// Every combination, with parameter names in alphabetical order and the last
    /// one (`n_estimators`) varying fastest.
    pub fn combinations(&self) -> Vec<ForestParams> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &min_samples_leaf in &self.min_samples_leaf {
                for &min_samples_split in &self.min_samples_split {
                    for &n_estimators in &self.n_estimators {
                        out.push(ForestParams {
                            n_estimators,
                            max_depth,
                            min_samples_split,
                            min_samples_leaf,
                        });
                    }
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.min_samples_split.len() * self.min_samples_leaf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Test-fold row indices for stratified k-fold without shuffling.
///
/// Rows are sorted by class; fold `i` is allotted, per class, as many rows as that
/// class has among every `n_splits`-th sorted row starting at `i`. Rows of each
/// class then fill folds in ascending order. Fold sizes differ by at most one.
pub fn stratified_k_fold(labels: &[u8], n_splits: usize) -> Result<Vec<Vec<usize>>, ModelError> {
    let n = labels.len();
    if n_splits < 2 || n_splits > n {
        return Err(ModelError::TooFewSamples(n));
    }

    // Classes are numbered in order of first appearance.
    let mut classes: Vec<u8> = Vec::new();
    let encoded: Vec<usize> = labels
        .iter()
        .map(|l| match classes.iter().position(|c| c == l) {
            Some(k) => k,
            None => {
                classes.push(*l);
                classes.len() - 1
            }
        })
        .collect();

    let mut sorted = encoded.clone();
    sorted.sort_unstable();

    let mut allocation = vec![vec![0usize; classes.len()]; n_splits];
    for (pos, &k) in sorted.iter().enumerate() {
        allocation[pos % n_splits][k] += 1;
    }

    let mut folds = vec![Vec::new(); n_splits];
    for k in 0..classes.len() {
        let mut fold_ids = (0..n_splits).flat_map(|f| std::iter::repeat_n(f, allocation[f][k]));
        for (row, _) in encoded.iter().enumerate().filter(|(_, c)| **c == k) {
            if let Some(f) = fold_ids.next() {
                folds[f].push(row);
            }
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }

    Ok(folds)
}

/// Cross-validated scores of one parameter combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    pub params: ForestParams,
    /// ROC-AUC of each scorable fold.
    pub fold_scores: Vec<f64>,
    /// None when no fold held both classes.
    pub mean_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: ForestParams,
    pub best_score: Option<f64>,
    pub n_folds: usize,
    pub cv_results: Vec<CvResult>,
}

/// Exhaustive search over a [`ParamGrid`] scored by stratified k-fold ROC-AUC.
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub grid: ParamGrid,
    pub n_folds: usize,
    pub seed: u64,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, n_folds: usize, seed: u64) -> Self {
        Self { grid, n_folds, seed }
    }

    /// Score every combination, pick the best mean score (earliest combination on
    /// ties) and refit it on all rows.
    ///
    /// The fold count is capped at the number of rows. Folds whose test rows hold
    /// a single class cannot be scored and are left out of the mean.
    /// A single row gets no folds at all.
    pub fn run(&self, x: &[f64], n_features: usize, y: &[u8]) -> Result<(GridSearchResult, RandomForest), ModelError> {
        let n_rows = check_matrix(x, n_features)?;
        if y.len() != n_rows {
            return Err(ModelError::LabelCount {
                labels: y.len(),
                rows: n_rows,
            });
        }
        let combos = self.grid.combinations();
        if combos.is_empty() {
            return Err(ModelError::EmptyGrid);
        }

        let folds = if n_rows < 2 {
            warn!("Only {} row; skipping cross-validation", n_rows);
            Vec::new()
        } else {
            stratified_k_fold(y, self.n_folds.min(n_rows))?
        };
        let k = folds.len();
        info!(
            "Grid search: {} combinations x {} folds on {} rows",
            combos.len(),
            k,
            n_rows
        );

        let units: Vec<(usize, usize)> = (0..combos.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let scores: Vec<(usize, Option<f64>)> = units
            .into_par_iter()
            .map(|(c, f)| -> Result<(usize, Option<f64>), ModelError> {
                let score = self.score_fold(x, n_features, y, &folds[f], combos[c])?;
                Ok((c, score))
            })
            .collect::<Result<_, _>>()?;

        let mut cv_results: Vec<CvResult> = combos
            .iter()
            .map(|&params| CvResult {
                params,
                fold_scores: Vec::new(),
                mean_score: None,
            })
            .collect();
        for (c, score) in scores {
            if let Some(s) = score {
                cv_results[c].fold_scores.push(s);
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (c, result) in cv_results.iter_mut().enumerate() {
            if !result.fold_scores.is_empty() {
                let mean = result.fold_scores.iter().sum::<f64>() / result.fold_scores.len() as f64;
                result.mean_score = Some(mean);
                if best.is_none_or(|(_, b)| mean > b) {
                    best = Some((c, mean));
                }
            }
            debug!("{:?} -> {:?}", result.params, result.mean_score);
        }

        let (best_index, best_score) = match best {
            Some((c, s)) => (c, Some(s)),
            None => {
                warn!("No fold held both classes; falling back to the first combination");
                (0, None)
            }
        };
        let best_params = combos[best_index];
        info!("Best parameters {:?} with CV ROC-AUC {:?}", best_params, best_score);

        let model = RandomForest::fit(x, n_features, y, best_params, self.seed)?;

        Ok((
            GridSearchResult {
                best_params,
                best_score,
                n_folds: k,
                cv_results,
            },
            model,
        ))
    }

    fn score_fold(
        &self,
        x: &[f64],
        n_features: usize,
        y: &[u8],
        test: &[usize],
        params: ForestParams,
    ) -> Result<Option<f64>, ModelError> {
        let mut is_test = vec![false; y.len()];
        test.iter().for_each(|&r| is_test[r] = true);

        let mut train_x = Vec::with_capacity((y.len() - test.len()) * n_features);
        let mut train_y = Vec::with_capacity(y.len() - test.len());
        let mut test_x = Vec::with_capacity(test.len() * n_features);
        let mut test_y = Vec::with_capacity(test.len());
        for (r, row) in x.chunks(n_features).enumerate() {
            if is_test[r] {
                test_x.extend_from_slice(row);
                test_y.push(y[r]);
            } else {
                train_x.extend_from_slice(row);
                train_y.push(y[r]);
            }
        }

        if train_y.is_empty() || !(test_y.contains(&0) && test_y.contains(&1)) {
            return Ok(None);
        }

        let model = RandomForest::fit(&train_x, n_features, &train_y, params, self.seed)?;
        let probs = model.predict_proba(&test_x)?;
        Ok(roc_auc(&probs, &test_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_order() {
        let grid = ParamGrid {
            n_estimators: vec![10, 20],
            max_depth: vec![None, Some(3)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let combos = grid.combinations();
        assert_eq!(combos.len(), 4);
        assert_eq!((combos[0].max_depth, combos[0].n_estimators), (None, 10));
        assert_eq!((combos[1].max_depth, combos[1].n_estimators), (None, 20));
        assert_eq!((combos[2].max_depth, combos[2].n_estimators), (Some(3), 10));
        assert_eq!(ParamGrid::default().len(), 36);
    }

    #[test]
    fn test_stratified_k_fold_allocation() {
        let folds = stratified_k_fold(&[0, 0, 0, 1, 1, 1], 3).unwrap();
        assert_eq!(folds, vec![vec![0, 3], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn test_stratified_k_fold_covers_every_row() {
        let labels: Vec<u8> = (0..23).map(|i| u8::from(i % 4 == 0)).collect();
        let folds = stratified_k_fold(&labels, 5).unwrap();

        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());

        let sizes: Vec<usize> = folds.iter().map(|f| f.len()).collect();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        assert!(max - min <= 1);
        for fold in &folds {
            let pos = fold.iter().filter(|&&r| labels[r] == 1).count();
            assert!((1..=2).contains(&pos));
        }
    }

    #[test]
    fn test_stratified_k_fold_rejects_bad_k() {
        assert_eq!(stratified_k_fold(&[0, 1], 3), Err(ModelError::TooFewSamples(2)));
        assert_eq!(stratified_k_fold(&[0, 1, 1], 1), Err(ModelError::TooFewSamples(3)));
    }

    fn dataset(n: usize) -> (Vec<f64>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let label = u8::from(i % 3 == 0);
            x.push(if label == 1 { 3.0 } else { 0.0 } + (i % 5) as f64 * 0.1);
            x.push(((i * 31) % 7) as f64);
            y.push(label);
        }
        (x, y)
    }

    #[test]
    fn test_grid_search_finds_signal() {
        let (x, y) = dataset(30);
        let grid = ParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![None, Some(2)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let (result, model) = GridSearch::new(grid, 5, 42).run(&x, 2, &y).unwrap();

        assert_eq!(result.cv_results.len(), 4);
        assert_eq!(result.n_folds, 5);
        let best = result.best_score.unwrap();
        assert!(best > 0.8, "best score {}", best);
        // Ties resolve to the earliest combination.
        let first_best = result
            .cv_results
            .iter()
            .find(|r| r.mean_score == Some(best))
            .unwrap();
        assert_eq!(first_best.params, result.best_params);
        assert_eq!(model.params, result.best_params);
    }

    #[test]
    fn test_grid_search_tiny_universe() {
        // Three rows: folds are capped at 3 and single-class test folds are skipped.
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0, 0, 1];
        let grid = ParamGrid {
            n_estimators: vec![3],
            max_depth: vec![None],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let (result, _) = GridSearch::new(grid, 5, 42).run(&x, 1, &y).unwrap();
        assert_eq!(result.n_folds, 3);
        assert_eq!(result.best_score, None);
    }

    #[test]
    fn test_grid_search_errors() {
        let empty = ParamGrid {
            n_estimators: vec![],
            ..ParamGrid::default()
        };
        assert_eq!(
            GridSearch::new(empty, 5, 42).run(&[1.0, 2.0], 1, &[0, 1]).err(),
            Some(ModelError::EmptyGrid)
        );
        assert_eq!(
            GridSearch::new(ParamGrid::default(), 5, 42).run(&[1.0, 2.0], 1, &[0]).err(),
            Some(ModelError::LabelCount { labels: 1, rows: 2 })
        );
    }

    #[test]
    fn test_grid_search_single_row_refits_first_combination() {
        let grid = ParamGrid {
            n_estimators: vec![4, 8],
            max_depth: vec![Some(2)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let (result, model) = GridSearch::new(grid, 5, 42).run(&[3.0, 1.0], 2, &[1]).unwrap();
        assert_eq!(result.n_folds, 0);
        assert_eq!(result.best_score, None);
        assert_eq!(result.best_params.n_estimators, 4);
        assert!(result.cv_results.iter().all(|r| r.fold_scores.is_empty()));
        assert_eq!(model.predict_proba(&[3.0, 1.0]).unwrap(), vec![1.0]);
    }
}
