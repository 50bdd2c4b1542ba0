pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod labels;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod scoring;
pub mod training;
pub mod trajectory;

pub use config::{Args, Command, Config};
pub use data::{CoverageSurvey, LoadOutcome, fetch_fundamentals, fetch_series, survey_coverage};
pub use error::PipelineError;
pub use evaluation::evaluate;
pub use features::{FeatureMatrix, TechnicalFrame, aggregate_features, technical_indicators};
pub use labels::{build_labels, compute_returns};
pub use pipeline::{CoverageCounts, PipelineOutcome, run_pipeline};
pub use provider::{CsvCacheProvider, InMemoryProvider, MarketDataProvider, ProviderError};
pub use report::{ReportPaths, write_outcome, write_summary};
pub use scoring::{FundamentalScorer, ScoreCard, Verdict};
pub use training::{TrainedModel, train};
pub use trajectory::{QUARTER_ROWS, QuarterPoint, ipo_changes, quarterly_trajectory};
