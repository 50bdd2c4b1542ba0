use crate::trend::ma::moving_average;

/// Ratio of each row's volume to its trailing `lookback`-row mean volume.
///
/// Returns `(volume_ma, ratio)`. The ratio is NaN wherever the mean is undefined
/// or zero.
pub fn volume_ratio(volumes: &[f64], lookback: usize) -> (Vec<f64>, Vec<f64>) {
    let volume_ma = moving_average(volumes, lookback);

    let ratio = volumes
        .iter()
        .zip(&volume_ma)
        .map(|(&v, &ma)| {
            let r = v / ma;
            if ma != 0.0 && r.is_finite() { r } else { f64::NAN }
        })
        .collect();

    (volume_ma, ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_ratio() {
        let volumes = vec![100.0, 200.0, 300.0, 600.0];
        let (ma, ratio) = volume_ratio(&volumes, 2);

        assert!(ma[0].is_nan());
        assert!(ratio[0].is_nan());
        assert!((ma[1] - 150.0).abs() < 1e-10);
        assert!((ratio[3] - 600.0 / 450.0).abs() < 1e-10);
    }

    #[test]
    fn test_volume_ratio_zero_mean() {
        let (_, ratio) = volume_ratio(&[0.0, 0.0, 0.0], 2);
        assert!(ratio.iter().all(|r| r.is_nan()));
    }
}
