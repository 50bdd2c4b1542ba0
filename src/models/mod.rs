pub mod forest;
pub mod grid_search;
pub mod scaler;

pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use grid_search::{CvResult, GridSearch, GridSearchResult, ParamGrid, stratified_k_fold};
pub use scaler::StandardScaler;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("no samples to fit")]
    Empty,
    #[error("matrix of {values} values does not hold {rows} rows of {cols} features")]
    Shape { values: usize, rows: usize, cols: usize },
    #[error("{features} features given, model expects {expected}")]
    FeatureCount { features: usize, expected: usize },
    #[error("{labels} labels for {rows} rows")]
    LabelCount { labels: usize, rows: usize },
    #[error("cross-validation needs at least 2 samples, got {0}")]
    TooFewSamples(usize),
    #[error("parameter grid is empty")]
    EmptyGrid,
}

/// Check that `x` is a row-major `rows x cols` matrix with at least one row.
pub(crate) fn check_matrix(x: &[f64], cols: usize) -> Result<usize, ModelError> {
    if x.is_empty() || cols == 0 {
        return Err(ModelError::Empty);
    }
    if x.len() % cols != 0 {
        return Err(ModelError::Shape {
            values: x.len(),
            rows: x.len() / cols,
            cols,
        });
    }
    Ok(x.len() / cols)
}
