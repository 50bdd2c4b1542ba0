use serde::{Deserialize, Serialize};

/// One row of the ranked table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub symbol: String,
    /// Realized forward return in percent.
    pub realized_return: f64,
    /// Predicted probability of belonging to the top quantile.
    pub probability: f64,
}

/// Performance of the top-ranked picks against the whole evaluated universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Number of symbols held in the top portfolio.
    pub top_n: usize,
    /// Number of symbols in the evaluated universe.
    pub universe_size: usize,
    /// Mean realized return of the top portfolio.
    pub top_mean_return: f64,
    /// Mean realized return of the universe.
    pub universe_mean_return: f64,
    /// top_mean_return - universe_mean_return.
    pub outperformance: f64,
}

/// Ranking quality of predicted probabilities against true labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// None when the labels hold a single class.
    pub roc_auc: Option<f64>,
    pub precision: f64,
    pub recall: f64,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
    /// Probability at or above which a prediction counts as positive.
    pub threshold: f64,
}

/// Everything the evaluator produces for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: ClassificationMetrics,
    pub portfolio: PortfolioStats,
    /// Sorted by probability descending.
    pub ranked: Vec<RankedEntry>,
}
