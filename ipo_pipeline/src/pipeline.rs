use backtesting::EvaluationReport;
use indexmap::{IndexMap, IndexSet};
use ipostat::core::io::{PriceSeries, split_windows};
use ipostat::models::GridSearch;
use log::info;
use serde::Serialize;

use crate::config::Config;
use crate::data::{fetch_fundamentals, fetch_series};
use crate::error::PipelineError;
use crate::evaluation::evaluate;
use crate::features::aggregate_features;
use crate::labels::{build_labels, compute_returns};
use crate::provider::MarketDataProvider;
use crate::training::{TrainedModel, train};

/// What happened to the requested universe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageCounts {
    /// Unique symbols requested.
    pub requested: usize,
    /// No price history could be loaded.
    pub series_failures: usize,
    /// No fundamentals could be loaded; these symbols are still used.
    pub fundamentals_failures: usize,
    /// Loaded, but too short for a target window.
    pub insufficient_history: usize,
    /// Full history, but the target window has no positive starting close.
    pub invalid_return: usize,
    /// Labeled, trained on and evaluated.
    pub used: usize,
    pub excluded: usize,
    pub excluded_symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub training: TrainedModel,
    pub evaluation: EvaluationReport,
    /// (feature, importance), most important first.
    pub importances: Vec<(String, f64)>,
    pub coverage: CoverageCounts,
    /// Forward return at the label quantile, in percent.
    pub label_threshold: f64,
}

/// Run the whole screen: load, label, featurize, train, predict and evaluate.
///
/// Probabilities are predicted on the same matrix the model was fit on.
pub fn run_pipeline(provider: &dyn MarketDataProvider, config: &Config) -> Result<PipelineOutcome, PipelineError> {
    let symbols: Vec<String> = config
        .symbols
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect();
    if symbols.is_empty() {
        return Err(PipelineError::NoSymbols);
    }
    info!("Screening {} symbols", symbols.len());

    // ========================================================================
    // Load
    // ========================================================================
    let series = fetch_series(provider, &symbols, config.window_len);
    let loaded: Vec<String> = series.loaded.keys().cloned().collect();
    let fundamentals = fetch_fundamentals(provider, &loaded, &config.attributes);

    // ========================================================================
    // Labels
    // ========================================================================
    let returns = compute_returns(&series.loaded, config.train_len, config.window_len);
    if returns.is_empty() {
        return Err(PipelineError::NoReturns(config.window_len));
    }
    let (labels, label_threshold) = build_labels(&returns, config.label_quantile);

    // ========================================================================
    // Features
    // ========================================================================
    let training_windows: IndexMap<String, PriceSeries> = series
        .loaded
        .iter()
        .filter(|(symbol, _)| labels.contains_key(*symbol))
        .map(|(symbol, s)| {
            let split = split_windows(s, config.train_len, config.window_len);
            (symbol.clone(), split.training)
        })
        .collect();
    let features = aggregate_features(&training_windows, &fundamentals.loaded, &config.attributes)?;

    // ========================================================================
    // Train, predict, evaluate
    // ========================================================================
    let search = GridSearch::new(config.model.param_grid(), config.model.n_folds, config.model.seed);
    let model = train(&features, &labels, &search)?;

    let probabilities: IndexMap<String, f64> = features
        .symbols
        .iter()
        .cloned()
        .zip(model.predict_proba(&features)?)
        .collect();

    let evaluation = evaluate(
        &labels,
        &probabilities,
        &returns,
        config.label_quantile,
        config.top_fraction,
    )?;

    let short_history = series.loaded.values().filter(|s| s.len() < config.window_len).count();
    let excluded_symbols: Vec<String> = symbols.iter().filter(|s| !labels.contains_key(*s)).cloned().collect();
    let coverage = CoverageCounts {
        requested: symbols.len(),
        series_failures: series.failed.len(),
        fundamentals_failures: fundamentals.failed.len(),
        insufficient_history: short_history,
        invalid_return: series.loaded.len() - short_history - returns.len(),
        used: labels.len(),
        excluded: excluded_symbols.len(),
        excluded_symbols,
    };
    info!(
        "Used {} of {} symbols ({} without prices, {} with short history, {} without a valid return, {} without fundamentals)",
        coverage.used,
        coverage.requested,
        coverage.series_failures,
        coverage.insufficient_history,
        coverage.invalid_return,
        coverage.fundamentals_failures
    );

    Ok(PipelineOutcome {
        importances: model.importances.clone(),
        training: model,
        evaluation,
        coverage,
        label_threshold,
    })
}
