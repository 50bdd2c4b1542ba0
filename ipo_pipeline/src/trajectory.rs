use indexmap::IndexMap;
use ipostat::core::io::PriceSeries;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Trading rows in one quarter.
pub const QUARTER_ROWS: usize = 63;

/// Mean change since the IPO-day open across symbols, at one row offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterPoint {
    pub row: usize,
    /// Percent change of the close at `row` relative to the row-0 open.
    pub mean_change: f64,
    /// Symbols with a bar at `row`.
    pub symbols: usize,
}

/// Percent change from the first open to the close at rows `0, step, 2*step, ...`.
///
/// `None` when the series is empty or its first open is not a positive number.
pub fn ipo_changes(series: &PriceSeries, step: usize) -> Option<Vec<(usize, f64)>> {
    let bars = series.bars();
    let ipo_price = bars.first()?.open;
    if !(ipo_price > 0.0) {
        return None;
    }
    Some(
        bars.iter()
            .enumerate()
            .step_by(step.max(1))
            .map(|(row, bar)| (row, (bar.close - ipo_price) / ipo_price * 100.0))
            .collect(),
    )
}

/// Average each symbol's [`ipo_changes`] per row offset. Shorter histories
/// drop out of the later points.
pub fn quarterly_trajectory(series_map: &IndexMap<String, PriceSeries>, step: usize) -> Vec<QuarterPoint> {
    let mut by_row: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (symbol, series) in series_map {
        match ipo_changes(series, step) {
            Some(changes) => {
                for (row, change) in changes {
                    by_row.entry(row).or_default().push(change);
                }
            }
            None => warn!("No usable IPO open for {}", symbol),
        }
    }

    let points: Vec<QuarterPoint> = by_row
        .into_iter()
        .map(|(row, changes)| QuarterPoint {
            row,
            mean_change: changes.iter().sum::<f64>() / changes.len() as f64,
            symbols: changes.len(),
        })
        .collect();
    info!("Trajectory over {} symbols, {} points", series_map.len(), points.len());
    points
}
