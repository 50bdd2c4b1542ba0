pub mod core;
pub mod metrics;
pub mod models;
pub mod report;

pub use core::{BacktestError, evaluate_ranking, rank_by_probability, top_quantile_portfolio};
pub use metrics::classification_metrics;
pub use models::{ClassificationMetrics, EvaluationReport, PortfolioStats, RankedEntry};
