/// Calculates the Simple Moving Average (SMA) for a given data slice and number of lags.
///
/// A row is defined only when all `lags` values ending at it are finite; otherwise
/// it is NaN. The first `lags - 1` values are always NaN.
///
/// # Arguments
///
/// * `data` - A slice of f64 values.
/// * `lags` - The window size for the moving average.
pub fn moving_average(data: &[f64], lags: usize) -> Vec<f64> {
    if lags == 0 || lags > data.len() {
        return vec![f64::NAN; data.len()];
    }

    let mut sma = Vec::with_capacity(data.len());
    let mut sum = 0.0;
    let mut missing = 0usize;

    for (i, &x) in data.iter().enumerate() {
        if x.is_finite() {
            sum += x;
        } else {
            missing += 1;
        }

        if i >= lags {
            let old = data[i - lags];
            if old.is_finite() {
                sum -= old;
            } else {
                missing -= 1;
            }
        }

        if i + 1 >= lags && missing == 0 {
            sma.push(sum / lags as f64);
        } else {
            sma.push(f64::NAN);
        }
    }

    sma
}

/// Relative change from the first to the last close: `(last - first) / first`.
///
/// NaN for an empty series or a non-positive first close.
pub fn price_trend(closes: &[f64]) -> f64 {
    match (closes.first(), closes.last()) {
        (Some(&first), Some(&last)) if first > 0.0 && first.is_finite() => (last - first) / first,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let lags = 3;
        let sma = moving_average(&data, lags);

        assert_eq!(sma.len(), 5);
        assert!(sma[0].is_nan());
        assert!(sma[1].is_nan());
        assert!((sma[2] - 2.0).abs() < 1e-10); // (1+2+3)/3 = 2
        assert!((sma[3] - 3.0).abs() < 1e-10); // (2+3+4)/3 = 3
        assert!((sma[4] - 4.0).abs() < 1e-10); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_moving_average_edge_cases() {
        let data = vec![1.0, 2.0];
        let sma = moving_average(&data, 3);
        assert_eq!(sma.len(), 2);
        assert!(sma[0].is_nan());
        assert!(sma[1].is_nan());

        let sma = moving_average(&data, 0);
        assert!(sma[0].is_nan());
    }

    #[test]
    fn test_moving_average_gap_recovers() {
        let data = vec![f64::NAN, 2.0, 4.0, 6.0];
        let sma = moving_average(&data, 2);
        assert!(sma[0].is_nan());
        assert!(sma[1].is_nan()); // window still holds the NaN
        assert!((sma[2] - 3.0).abs() < 1e-10);
        assert!((sma[3] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_price_trend() {
        assert!((price_trend(&[100.0, 90.0, 150.0]) - 0.5).abs() < 1e-12);
        assert!(price_trend(&[]).is_nan());
        assert!(price_trend(&[0.0, 1.0]).is_nan());
    }
}
