use backtesting::BacktestError;
use ipostat::models::ModelError;
use thiserror::Error;

/// Fatal pipeline errors. Per-symbol retrieval failures are not errors; they are
/// logged and counted instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no symbols to process")]
    NoSymbols,
    #[error("no symbol has the {0} rows needed for a forward return")]
    NoReturns(usize),
    #[error("no usable features remain")]
    NoFeatures,
    #[error("{stage}: {detail}")]
    Alignment { stage: &'static str, detail: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Evaluation(#[from] BacktestError),
}
