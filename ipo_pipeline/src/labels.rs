use indexmap::IndexMap;
use ipostat::core::io::{PriceSeries, forward_return};
use log::info;
use stats::percentile;

/// Percentage close-to-close return over rows `[start_row, end_row)`.
///
/// Symbols with fewer than `end_row` rows, or without a positive starting close,
/// get no return.
pub fn compute_returns(series_map: &IndexMap<String, PriceSeries>, start_row: usize, end_row: usize) -> IndexMap<String, f64> {
    series_map
        .iter()
        .filter_map(|(symbol, series)| forward_return(series, start_row, end_row).map(|r| (symbol.clone(), r)))
        .collect()
}

/// Label 1 for returns at or above the `quantile` percentile of all returns.
///
/// Returns the labels and the threshold used.
pub fn build_labels(returns: &IndexMap<String, f64>, quantile: f64) -> (IndexMap<String, u8>, f64) {
    let values: Vec<f64> = returns.values().copied().collect();
    let threshold = percentile(&values, quantile);

    let labels: IndexMap<String, u8> = returns
        .iter()
        .map(|(symbol, &r)| (symbol.clone(), u8::from(r >= threshold)))
        .collect();

    let positives = labels.values().filter(|&&l| l == 1).count();
    info!(
        "Labels: {} of {} symbols at or above {:.2}%",
        positives,
        labels.len(),
        threshold
    );
    (labels, threshold)
}
