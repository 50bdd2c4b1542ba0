use stats::sample_std;

/// Row-over-row relative change of closing prices.
///
/// Row 0 is NaN, as is any row whose previous close is zero or non-finite.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return returns;
    }
    returns.push(f64::NAN);

    for w in closes.windows(2) {
        let r = (w[1] - w[0]) / w[0];
        returns.push(if r.is_finite() { r } else { f64::NAN });
    }

    returns
}

/// Trailing sample standard deviation over `lookback` rows.
///
/// Defined only when all `lookback` values in the window are finite.
pub fn rolling_std(data: &[f64], lookback: usize) -> Vec<f64> {
    let n = data.len();
    if lookback < 2 {
        return vec![f64::NAN; n];
    }

    (0..n)
        .map(|i| {
            if i + 1 < lookback {
                return f64::NAN;
            }
            let window = &data[i + 1 - lookback..=i];
            if window.iter().all(|v| v.is_finite()) {
                sample_std(window)
            } else {
                f64::NAN
            }
        })
        .collect()
}
