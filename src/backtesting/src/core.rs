use log::debug;
use stats::mean_about;
use thiserror::Error;

use crate::metrics::classification_metrics;
use crate::models::{EvaluationReport, PortfolioStats, RankedEntry};

#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error("nothing to evaluate")]
    Empty,
    #[error("length mismatch: {symbols} symbols, {labels} labels, {probabilities} probabilities, {returns} returns")]
    LengthMismatch {
        symbols: usize,
        labels: usize,
        probabilities: usize,
        returns: usize,
    },
    #[error("top fraction must lie in (0, 1], got {0}")]
    InvalidFraction(f64),
}

/// Build the ranked table, probability descending.
///
/// The sort is stable, so equal probabilities keep the order of `symbols`.
/// The three slices are parallel and must have equal length.
pub fn rank_by_probability(
    symbols: &[String],
    probabilities: &[f64],
    returns: &[f64],
) -> Result<Vec<RankedEntry>, BacktestError> {
    if symbols.len() != probabilities.len() || symbols.len() != returns.len() {
        return Err(BacktestError::LengthMismatch {
            symbols: symbols.len(),
            labels: symbols.len(),
            probabilities: probabilities.len(),
            returns: returns.len(),
        });
    }

    let mut ranked: Vec<RankedEntry> = symbols
        .iter()
        .zip(probabilities.iter().zip(returns))
        .map(|(symbol, (&probability, &realized_return))| RankedEntry {
            symbol: symbol.clone(),
            realized_return,
            probability,
        })
        .collect();

    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(ranked)
}

/// Hold the top `ceil(fraction * N)` entries of an already ranked table and
/// compare their mean return with the mean over all entries.
///
/// Both means are accumulated around the first entry's return, so a universe
/// of identical returns shows exactly zero outperformance.
pub fn top_quantile_portfolio(ranked: &[RankedEntry], fraction: f64) -> Result<PortfolioStats, BacktestError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(BacktestError::InvalidFraction(fraction));
    }
    let Some(first) = ranked.first() else {
        return Err(BacktestError::Empty);
    };

    let universe_size = ranked.len();
    // 0.3 * 100.0 is 30.000000000000004 in binary
    let top_n = ((fraction * universe_size as f64 - 1e-9).ceil() as usize).clamp(1, universe_size);
    let pivot = first.realized_return;

    let all: Vec<f64> = ranked.iter().map(|e| e.realized_return).collect();
    let top_mean_return = mean_about(&all[..top_n], pivot);
    let universe_mean_return = mean_about(&all, pivot);

    debug!(
        "Top {} of {}: mean {:.4} vs universe {:.4}",
        top_n, universe_size, top_mean_return, universe_mean_return
    );

    Ok(PortfolioStats {
        top_n,
        universe_size,
        top_mean_return,
        universe_mean_return,
        outperformance: top_mean_return - universe_mean_return,
    })
}

/// Evaluate predictions over parallel, already aligned vectors.
///
/// `quantile` binarizes the probabilities; `top_fraction` sizes the portfolio.
pub fn evaluate_ranking(
    symbols: &[String],
    labels: &[u8],
    probabilities: &[f64],
    returns: &[f64],
    quantile: f64,
    top_fraction: f64,
) -> Result<EvaluationReport, BacktestError> {
    let n = symbols.len();
    if labels.len() != n || probabilities.len() != n || returns.len() != n {
        return Err(BacktestError::LengthMismatch {
            symbols: n,
            labels: labels.len(),
            probabilities: probabilities.len(),
            returns: returns.len(),
        });
    }
    if n == 0 {
        return Err(BacktestError::Empty);
    }

    let metrics = classification_metrics(labels, probabilities, quantile);
    let ranked = rank_by_probability(symbols, probabilities, returns)?;
    let portfolio = top_quantile_portfolio(&ranked, top_fraction)?;

    Ok(EvaluationReport { metrics, portfolio, ranked })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{}", i)).collect()
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let symbols = names(4);
        let probs = vec![0.2, 0.9, 0.2, 0.9];
        let rets = vec![1.0, 2.0, 3.0, 4.0];

        let ranked = rank_by_probability(&symbols, &probs, &rets).unwrap();
        let order: Vec<&str> = ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["S1", "S3", "S0", "S2"]);
    }

    #[test]
    fn test_top_n_rounds_up() {
        let symbols = names(10);
        let probs: Vec<f64> = (0..10).map(|i| 1.0 - i as f64 / 10.0).collect();
        let rets: Vec<f64> = (0..10).map(|i| 10.0 - i as f64).collect();
        let ranked = rank_by_probability(&symbols, &probs, &rets).unwrap();

        let p = top_quantile_portfolio(&ranked, 0.3).unwrap();
        assert_eq!(p.top_n, 3);
        assert!((p.top_mean_return - 9.0).abs() < 1e-12);
        assert!((p.universe_mean_return - 5.5).abs() < 1e-12);
        assert!((p.outperformance - 3.5).abs() < 1e-12);

        let p = top_quantile_portfolio(&ranked[..7], 0.3).unwrap();
        assert_eq!(p.top_n, 3); // ceil(2.1)

        let symbols = names(100);
        let flat = vec![0.5; 100];
        let ranked = rank_by_probability(&symbols, &flat, &flat).unwrap();
        assert_eq!(top_quantile_portfolio(&ranked, 0.3).unwrap().top_n, 30);
    }

    #[test]
    fn test_equal_returns_no_outperformance() {
        let symbols = names(7);
        let probs = vec![0.1, 0.7, 0.3, 0.9, 0.5, 0.2, 0.4];
        let rets = vec![3.7; 7];
        let ranked = rank_by_probability(&symbols, &probs, &rets).unwrap();

        let p = top_quantile_portfolio(&ranked, 0.3).unwrap();
        assert_eq!(p.outperformance, 0.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(top_quantile_portfolio(&[], 0.3), Err(BacktestError::Empty));
        assert!(matches!(
            rank_by_probability(&names(2), &[0.1], &[1.0, 2.0]),
            Err(BacktestError::LengthMismatch { .. })
        ));
        let ranked = rank_by_probability(&names(1), &[0.1], &[1.0]).unwrap();
        assert_eq!(
            top_quantile_portfolio(&ranked, 0.0),
            Err(BacktestError::InvalidFraction(0.0))
        );
    }

    #[test]
    fn test_evaluate_ranking() {
        let symbols = names(5);
        let labels = vec![1, 0, 0, 1, 0];
        let probs = vec![0.8, 0.1, 0.3, 0.6, 0.2];
        let rets = vec![12.0, -3.0, 1.0, 9.0, 0.5];

        let report = evaluate_ranking(&symbols, &labels, &probs, &rets, 0.7, 0.3).unwrap();
        assert_eq!(report.metrics.roc_auc, Some(1.0));
        assert_eq!(report.ranked[0].symbol, "S0");
        assert_eq!(report.portfolio.top_n, 2);
        assert!((report.portfolio.top_mean_return - 10.5).abs() < 1e-12);
    }
}
