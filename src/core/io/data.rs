use super::PriceSeries;

/// Disjoint training and target windows cut from one price series.
#[derive(Debug, Clone)]
pub struct WindowSplit {
    /// Rows `[0, train_len)`, or fewer when the series is short.
    pub training: PriceSeries,
    /// Rows `[train_len, window_len)`, present only for a full-length series.
    pub target: Option<PriceSeries>,
}

/// Split a series into its training window and, when it has at least
/// `window_len` rows, its target window.
///
/// # Arguments
/// * `series` - Chronological series, already truncated to `window_len`
/// * `train_len` - Rows in the training window
/// * `window_len` - Total rows needed for a target window
pub fn split_windows(series: &PriceSeries, train_len: usize, window_len: usize) -> WindowSplit {
    let training = series.window(0, train_len);
    let target = (series.len() >= window_len).then(|| series.window(train_len, window_len));
    WindowSplit { training, target }
}

/// Percentage change of the close from row `start` to row `end - 1`.
///
/// `None` when the series has fewer than `end` rows, the window is empty, or the
/// starting close is not a positive number.
pub fn forward_return(series: &PriceSeries, start: usize, end: usize) -> Option<f64> {
    if end <= start || series.len() < end {
        return None;
    }
    let bars = series.bars();
    let first = bars[start].close;
    let last = bars[end - 1].close;
    if !(first > 0.0) || !last.is_finite() {
        return None;
    }
    Some((last - first) / first * 100.0)
}
