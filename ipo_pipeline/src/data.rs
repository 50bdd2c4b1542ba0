use indexmap::IndexMap;
use ipostat::core::io::{FundamentalSnapshot, PriceSeries, select_attributes};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::provider::{MarketDataProvider, ProviderError};

/// Per-symbol results of a retrieval pass.
#[derive(Debug, Clone)]
pub struct LoadOutcome<T> {
    /// Successful symbols, in universe order.
    pub loaded: IndexMap<String, T>,
    /// (symbol, reason) for every symbol that could not be served.
    pub failed: Vec<(String, String)>,
}

impl<T> Default for LoadOutcome<T> {
    fn default() -> Self {
        Self {
            loaded: IndexMap::new(),
            failed: Vec::new(),
        }
    }
}

/// Fetch every symbol on the rayon pool, then reduce in universe order.
fn fetch_all<T, F>(symbols: &[String], what: &str, fetch: F) -> LoadOutcome<T>
where
    T: Send,
    F: Fn(&str) -> Result<T, ProviderError> + Sync,
{
    let results: Vec<(&String, Result<T, ProviderError>)> = symbols.par_iter().map(|s| (s, fetch(s))).collect();

    let outcome = results
        .into_iter()
        .fold(LoadOutcome::default(), |mut acc, (symbol, result)| {
            match result {
                Ok(value) => {
                    acc.loaded.insert(symbol.clone(), value);
                }
                Err(e) => {
                    warn!("Error fetching {} for {}: {}", what, symbol, e);
                    acc.failed.push((symbol.clone(), e.to_string()));
                }
            }
            acc
        });

    info!(
        "Fetched {} for {} of {} symbols",
        what,
        outcome.loaded.len(),
        symbols.len()
    );
    outcome
}

/// Price series per symbol, sorted, deduplicated and cut to the earliest
/// `window_len` rows.
pub fn fetch_series(provider: &dyn MarketDataProvider, symbols: &[String], window_len: usize) -> LoadOutcome<PriceSeries> {
    fetch_all(symbols, "price history", |s| {
        let series = provider.price_history(s)?;
        if series.is_empty() {
            return Err(ProviderError::Empty(s.to_string()));
        }
        Ok(PriceSeries::from_bars(series.bars().to_vec()).truncated(window_len))
    })
}

/// Fundamentals per symbol, restricted to `attribute_names`.
pub fn fetch_fundamentals(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    attribute_names: &[String],
) -> LoadOutcome<FundamentalSnapshot> {
    fetch_all(symbols, "fundamentals", |s| {
        provider.fundamentals(s).map(|raw| select_attributes(&raw, attribute_names))
    })
}

/// How much price history a universe offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageSurvey {
    pub requested: usize,
    /// Provider could not serve the symbol.
    pub unavailable: usize,
    /// Fewer than `window_len` rows.
    pub short_history: usize,
    /// At least `window_len` rows.
    pub full_history: usize,
    pub full_symbols: Vec<String>,
}

/// Classify each symbol by the length of its untruncated price history.
pub fn survey_coverage(provider: &dyn MarketDataProvider, symbols: &[String], window_len: usize) -> CoverageSurvey {
    let lengths = fetch_all(symbols, "price history", |s| provider.price_history(s).map(|p| p.len()));

    let mut survey = CoverageSurvey {
        requested: symbols.len(),
        unavailable: lengths.failed.len(),
        ..Default::default()
    };
    for (symbol, rows) in lengths.loaded {
        if rows >= window_len {
            survey.full_history += 1;
            survey.full_symbols.push(symbol);
        } else {
            survey.short_history += 1;
        }
    }
    survey
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use chrono::{Duration, NaiveDate};
    use ipostat::core::io::PriceBar;

    fn series(n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        PriceSeries::from_bars(
            (0..n)
                .map(|i| PriceBar {
                    date: start + Duration::days(i as i64),
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0 + i as f64,
                    volume: 100.0,
                })
                .collect(),
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fetch_series_truncates_and_keeps_order() {
        let provider = InMemoryProvider::new()
            .with_series("C", series(30))
            .with_series("A", series(5))
            .with_series("B", series(12));

        let out = fetch_series(&provider, &names(&["C", "MISSING", "A", "B"]), 10);

        let order: Vec<&str> = out.loaded.keys().map(|s| s.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        assert_eq!(out.loaded["C"].len(), 10);
        assert_eq!(out.loaded["C"].closes()[0], 1.0);
        assert_eq!(out.loaded["A"].len(), 5);
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].0, "MISSING");
    }

    #[test]
    fn test_fetch_fundamentals_filters_attributes() {
        let snap: FundamentalSnapshot = [("beta".to_string(), 1.1), ("sharesOutstanding".to_string(), 9e6)]
            .into_iter()
            .collect();
        let provider = InMemoryProvider::new().with_fundamentals("A", snap);

        let out = fetch_fundamentals(&provider, &names(&["A", "B"]), &names(&["beta", "trailingPE"]));
        assert_eq!(out.loaded["A"].len(), 1);
        assert_eq!(out.loaded["A"]["beta"], 1.1);
        assert_eq!(out.failed.len(), 1);
    }

    #[test]
    fn test_survey_coverage() {
        let provider = InMemoryProvider::new()
            .with_series("LONG", series(20))
            .with_series("EXACT", series(15))
            .with_series("SHORT", series(3));

        let survey = survey_coverage(&provider, &names(&["LONG", "EXACT", "SHORT", "GONE"]), 15);
        assert_eq!(survey.requested, 4);
        assert_eq!(survey.unavailable, 1);
        assert_eq!(survey.short_history, 1);
        assert_eq!(survey.full_history, 2);
        assert_eq!(survey.full_symbols, names(&["LONG", "EXACT"]));
    }
}
