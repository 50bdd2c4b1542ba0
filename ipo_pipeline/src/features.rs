use indexmap::IndexMap;
use indicators::{compute_rsi, daily_returns, moving_average, price_trend, rolling_std, volume_ratio};
use ipostat::core::io::{FundamentalSnapshot, PriceSeries};
use ipostat::models::StandardScaler;
use log::{info, warn};
use serde::Serialize;
use stats::nan_mean;

use crate::error::PipelineError;

pub const RSI_PERIOD: usize = 14;
pub const VOLATILITY_LOOKBACK: usize = 20;
pub const VOLUME_LOOKBACK: usize = 20;

/// Aggregated technical features, in column order.
pub const TECHNICAL_FEATURES: [&str; 5] = ["avg_close", "avg_volume", "avg_volatility", "avg_rsi", "price_trend"];

/// Per-row indicators of one series. Rows without enough history are NaN.
#[derive(Debug, Clone)]
pub struct TechnicalFrame {
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    pub ma20: Vec<f64>,
    pub ma50: Vec<f64>,
    pub ma200: Vec<f64>,
    pub daily_return: Vec<f64>,
    pub volatility: Vec<f64>,
    pub rsi: Vec<f64>,
    pub volume_ma20: Vec<f64>,
    pub volume_ratio: Vec<f64>,
}

pub fn technical_indicators(series: &PriceSeries) -> TechnicalFrame {
    let close = series.closes();
    let volume = series.volumes();

    let daily_return = daily_returns(&close);
    let volatility = rolling_std(&daily_return, VOLATILITY_LOOKBACK);
    let (volume_ma20, volume_ratio) = volume_ratio(&volume, VOLUME_LOOKBACK);

    TechnicalFrame {
        ma20: moving_average(&close, 20),
        ma50: moving_average(&close, 50),
        ma200: moving_average(&close, 200),
        rsi: compute_rsi(&close, RSI_PERIOD),
        daily_return,
        volatility,
        volume_ma20,
        volume_ratio,
        close,
        volume,
    }
}

impl TechnicalFrame {
    /// The five aggregate scalars named by [`TECHNICAL_FEATURES`]. Means skip
    /// undefined rows.
    pub fn aggregate(&self) -> [f64; 5] {
        [
            nan_mean(&self.close),
            nan_mean(&self.volume),
            nan_mean(&self.volatility),
            nan_mean(&self.rsi),
            price_trend(&self.close),
        ]
    }
}

/// Standardized feature matrix, one row per symbol.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureMatrix {
    pub symbols: Vec<String>,
    pub names: Vec<String>,
    /// Row-major, `symbols.len() x names.len()`.
    pub values: Vec<f64>,
    /// Fitted on this run's imputed matrix.
    pub scaler: StandardScaler,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.symbols.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.n_features();
        &self.values[i * n..(i + 1) * n]
    }
}

/// Build the feature matrix from training-window series.
///
/// Each row holds the technical aggregates followed by `attribute_names`;
/// attributes missing from a symbol's snapshot (or the whole snapshot) are NaN
/// until imputed with the column mean. Columns never observed are dropped.
/// The imputed matrix is then standardized.
pub fn aggregate_features(
    series_map: &IndexMap<String, PriceSeries>,
    fundamentals: &IndexMap<String, FundamentalSnapshot>,
    attribute_names: &[String],
) -> Result<FeatureMatrix, PipelineError> {
    let rows: Vec<(&String, &PriceSeries)> = series_map.iter().filter(|(_, s)| !s.is_empty()).collect();
    if rows.is_empty() {
        return Err(PipelineError::NoFeatures);
    }

    let mut names: Vec<String> = TECHNICAL_FEATURES.iter().map(|s| s.to_string()).collect();
    names.extend(attribute_names.iter().cloned());
    let width = names.len();

    let mut raw = Vec::with_capacity(rows.len() * width);
    for (symbol, series) in &rows {
        raw.extend(technical_indicators(series).aggregate());
        let snapshot = fundamentals.get(*symbol);
        raw.extend(
            attribute_names
                .iter()
                .map(|a| snapshot.and_then(|s| s.get(a)).copied().unwrap_or(f64::NAN)),
        );
    }

    // Column means over observed values; NaN marks a column with none.
    let means: Vec<f64> = (0..width)
        .map(|j| {
            let column: Vec<f64> = raw.iter().skip(j).step_by(width).copied().collect();
            nan_mean(&column)
        })
        .collect();

    let keep: Vec<usize> = (0..width).filter(|&j| means[j].is_finite()).collect();
    let dropped: Vec<&str> = (0..width)
        .filter(|j| !means[*j].is_finite())
        .map(|j| names[j].as_str())
        .collect();
    if !dropped.is_empty() {
        warn!("Dropping {} features with no observed value: {:?}", dropped.len(), dropped);
    }
    if keep.is_empty() {
        return Err(PipelineError::NoFeatures);
    }

    let mut imputed = Vec::with_capacity(rows.len() * keep.len());
    for row in raw.chunks(width) {
        imputed.extend(keep.iter().map(|&j| if row[j].is_finite() { row[j] } else { means[j] }));
    }
    let kept_names: Vec<String> = keep.iter().map(|&j| names[j].clone()).collect();

    let (scaler, values) = StandardScaler::fit_transform(&imputed, kept_names.len())?;
    info!("Feature matrix: {} symbols x {} features", rows.len(), kept_names.len());

    Ok(FeatureMatrix {
        symbols: rows.iter().map(|(s, _)| (*s).clone()).collect(),
        names: kept_names,
        values,
        scaler,
    })
}
