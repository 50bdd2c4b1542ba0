use crate::trend::ma::moving_average;

/// Compute RSI (Relative Strength Index) from closing prices.
///
/// Close-to-close deltas are split into gains and losses, each averaged with a
/// simple `period`-row trailing mean:
/// - RS = Average Gain / Average Loss
/// - RSI = 100 - (100 / (1 + RS))
///
/// Row `i` needs `period` deltas, i.e. rows `i - period ..= i`, so rows with
/// index < `period` are NaN. A window with losses of zero and some gain gives 100;
/// a window with no movement at all is NaN.
///
/// # Returns
/// Vector of raw RSI values in [0, 100], same length as `closes`.
pub fn compute_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if period == 0 || n <= period {
        return vec![f64::NAN; n];
    }

    // Delta 0 has no predecessor and stays undefined.
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        if change.is_finite() {
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }
    }

    let avg_gain = moving_average(&gains, period);
    let avg_loss = moving_average(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| {
            if !gain.is_finite() || !loss.is_finite() {
                f64::NAN
            } else if loss == 0.0 {
                if gain > 0.0 { 100.0 } else { f64::NAN }
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn test_rsi_leading_rows_undefined() {
        let prices = zigzag(40);
        let rsi = compute_rsi(&prices, 14);

        assert_eq!(rsi.len(), prices.len());
        for (i, val) in rsi.iter().enumerate().take(14) {
            assert!(val.is_nan(), "row {} should be undefined", i);
        }
        assert!(rsi[14].is_finite());
    }

    #[test]
    fn test_rsi_bounds() {
        let prices = zigzag(200);
        let rsi = compute_rsi(&prices, 14);
        for &val in rsi.iter().filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(&val), "RSI out of range: {}", val);
        }
    }

    #[test]
    fn test_rsi_uptrend_and_downtrend() {
        let up: Vec<f64> = (0..30).map(|i| 1.0 + i as f64 * 0.1).collect();
        let rsi = compute_rsi(&up, 14);
        assert_eq!(rsi[20], 100.0);

        let down: Vec<f64> = (0..30).map(|i| 4.0 - i as f64 * 0.1).collect();
        let rsi = compute_rsi(&down, 14);
        assert!(rsi[20].abs() < 1e-10);
    }

    #[test]
    fn test_rsi_flat_is_undefined() {
        let prices = vec![1.0; 30];
        let rsi = compute_rsi(&prices, 14);
        assert!(rsi.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_short_series() {
        let rsi = compute_rsi(&[1.0, 2.0, 3.0], 14);
        assert_eq!(rsi.len(), 3);
        assert!(rsi.iter().all(|v| v.is_nan()));
    }
}
