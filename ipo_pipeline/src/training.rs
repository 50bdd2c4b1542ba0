use indexmap::IndexMap;
use ipostat::models::{ForestParams, GridSearch, GridSearchResult, RandomForest};
use log::info;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::PipelineError;
use crate::features::FeatureMatrix;

/// Refit forest of the best grid combination and its search record.
#[derive(Debug, Clone, Serialize)]
pub struct TrainedModel {
    #[serde(skip)]
    pub forest: RandomForest,
    pub search: GridSearchResult,
    pub feature_names: Vec<String>,
    /// (feature, importance), most important first.
    #[serde(skip)]
    pub importances: Vec<(String, f64)>,
}

impl TrainedModel {
    pub fn best_params(&self) -> ForestParams {
        self.search.best_params
    }

    pub fn best_score(&self) -> Option<f64> {
        self.search.best_score
    }

    /// Class-1 probability for every row of `features`, in row order.
    pub fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>, PipelineError> {
        if features.names != self.feature_names {
            return Err(PipelineError::Alignment {
                stage: "prediction",
                detail: format!("model trained on {:?}, given {:?}", self.feature_names, features.names),
            });
        }
        Ok(self.forest.predict_proba(&features.values)?)
    }
}

/// Labels for each feature row, in row order. The symbol sets must match exactly.
pub(crate) fn aligned_labels(features: &FeatureMatrix, labels: &IndexMap<String, u8>) -> Result<Vec<u8>, PipelineError> {
    let feature_set: HashSet<&String> = features.symbols.iter().collect();
    let label_set: HashSet<&String> = labels.keys().collect();
    if feature_set.len() != features.symbols.len() || feature_set != label_set {
        let mut missing: Vec<&String> = feature_set.symmetric_difference(&label_set).copied().collect();
        missing.sort();
        return Err(PipelineError::Alignment {
            stage: "training",
            detail: format!(
                "{} feature rows vs {} labels, unmatched symbols {:?}",
                features.symbols.len(),
                labels.len(),
                missing
            ),
        });
    }
    Ok(features.symbols.iter().map(|s| labels[s]).collect())
}

/// Grid-search a random forest on the feature matrix and labels.
pub fn train(features: &FeatureMatrix, labels: &IndexMap<String, u8>, search: &GridSearch) -> Result<TrainedModel, PipelineError> {
    if features.n_rows() == 0 || labels.is_empty() {
        return Err(PipelineError::Alignment {
            stage: "training",
            detail: "empty feature matrix or labels".to_string(),
        });
    }
    let y = aligned_labels(features, labels)?;

    let (result, forest) = search.run(&features.values, features.n_features(), &y)?;

    let mut importances: Vec<(String, f64)> = features
        .names
        .iter()
        .cloned()
        .zip(forest.feature_importances().iter().copied())
        .collect();
    importances.sort_by(|a, b| b.1.total_cmp(&a.1));

    info!(
        "Trained {} trees, best params {:?}",
        forest.trees().len(),
        result.best_params
    );

    Ok(TrainedModel {
        forest,
        search: result,
        feature_names: features.names.clone(),
        importances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipostat::models::{ParamGrid, StandardScaler};

    fn matrix(symbols: &[&str], rows: &[[f64; 2]]) -> FeatureMatrix {
        let raw: Vec<f64> = rows.iter().flatten().copied().collect();
        let (scaler, values) = StandardScaler::fit_transform(&raw, 2).unwrap();
        FeatureMatrix {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            names: vec!["signal".to_string(), "flat".to_string()],
            values,
            scaler,
        }
    }

    fn small_search() -> GridSearch {
        let grid = ParamGrid {
            n_estimators: vec![10],
            max_depth: vec![None],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        GridSearch::new(grid, 3, 42)
    }

    #[test]
    fn test_train_ranks_importances() {
        let symbols = ["A", "B", "C", "D", "E", "F"];
        let fm = matrix(
            &symbols,
            &[[9.0, 1.0], [1.0, 1.0], [8.0, 1.0], [2.0, 1.0], [1.5, 1.0], [0.5, 1.0]],
        );
        let labels: IndexMap<String, u8> = [("A", 1), ("B", 0), ("C", 1), ("D", 0), ("E", 0), ("F", 0)]
            .into_iter()
            .map(|(s, l)| (s.to_string(), l))
            .collect();

        let model = train(&fm, &labels, &small_search()).unwrap();
        assert_eq!(model.importances[0].0, "signal");
        assert_eq!(model.importances[1], ("flat".to_string(), 0.0));
        assert_eq!(model.best_params().n_estimators, 10);

        let probs = model.predict_proba(&fm).unwrap();
        assert!(probs[0] > probs[1]);
        assert!(probs[2] > probs[3]);
    }

    #[test]
    fn test_train_rejects_mismatched_symbols() {
        let fm = matrix(&["A", "B"], &[[1.0, 1.0], [2.0, 1.0]]);
        let labels: IndexMap<String, u8> = [("A".to_string(), 1), ("Z".to_string(), 0)].into_iter().collect();

        let err = train(&fm, &labels, &small_search()).unwrap_err();
        assert!(matches!(err, PipelineError::Alignment { stage: "training", .. }));
    }

    #[test]
    fn test_train_rejects_empty_labels() {
        let fm = matrix(&["A"], &[[1.0, 1.0]]);
        let err = train(&fm, &IndexMap::new(), &small_search()).unwrap_err();
        assert!(matches!(err, PipelineError::Alignment { .. }));
    }
}
