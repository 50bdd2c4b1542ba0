
// ============================================================================
// Means and dispersion
// ============================================================================

/// Mean of the finite values in `data`.
///
/// NaN and infinite entries are skipped. Returns NaN when no finite value exists.
pub fn nan_mean(data: &[f64]) -> f64 {
    let (sum, count) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Mean of `data` accumulated as offsets from `pivot`.
///
/// When every value equals `pivot` the result is exactly `pivot`, which plain
/// summation does not guarantee.
pub fn mean_about(data: &[f64], pivot: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let offset: f64 = data.iter().map(|&v| v - pivot).sum();
    pivot + offset / data.len() as f64
}

/// Sample standard deviation (n - 1 denominator) of the finite values in `data`.
///
/// Returns NaN with fewer than two finite values.
pub fn sample_std(data: &[f64]) -> f64 {
    let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = finite.iter().sum::<f64>() / n as f64;
    let ss: f64 = finite.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Population standard deviation (n denominator) around a known mean.
pub fn population_std(data: &[f64], mean: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let ss: f64 = data.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / data.len() as f64).sqrt()
}

// ============================================================================
// Quantiles
// ============================================================================

/// Quantile of already sorted data.
///
/// Uses the `fractile * (n + 1)` rank convention with linear interpolation
/// between the neighbouring order statistics. Ranks outside `[1, n]` clamp to
/// the extremes.
pub fn find_quantile(sorted_data: &[f64], fractile: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return f64::NAN;
    }

    let rank = fractile * (n as f64 + 1.0);
    if rank <= 1.0 {
        return sorted_data[0];
    }
    if rank >= n as f64 {
        return sorted_data[n - 1];
    }

    let lower = rank.floor() as usize;
    let weight = rank - lower as f64;
    let lo = sorted_data[lower - 1];
    let hi = sorted_data[lower];
    lo + weight * (hi - lo)
}

/// Quantile of unsorted data. The input is left untouched.
pub fn percentile(data: &[f64], fractile: f64) -> f64 {
    let mut work = data.to_vec();
    work.sort_by(f64::total_cmp);
    find_quantile(&work, fractile)
}

// ============================================================================
// Binary classification metrics
// ============================================================================

/// Area under the ROC curve of `scores` against 0/1 `labels`.
///
/// Computed from the Mann-Whitney rank sum with tied scores sharing their
/// average rank. `None` when either class is absent.
pub fn roc_auc(scores: &[f64], labels: &[u8]) -> Option<f64> {
    let n = scores.len();
    if n == 0 || n != labels.len() {
        return None;
    }

    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| scores[i].total_cmp(&scores[j]));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // Ranks i+1 ..= j share their average.
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &k in &order[i..j] {
            if labels[k] == 1 {
                pos_rank_sum += avg_rank;
            }
        }
        i = j;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Two-class confusion matrix laid out as `[[tn, fp], [fn, tp]]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against truth. Extra elements of the longer slice are ignored.
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        truth
            .iter()
            .zip(predicted)
            .fold(Self::default(), |mut cm, (&t, &p)| {
                match (t, p) {
                    (1, 1) => cm.tp += 1,
                    (1, _) => cm.fn_ += 1,
                    (_, 1) => cm.fp += 1,
                    _ => cm.tn += 1,
                }
                cm
            })
    }

    /// tp / (tp + fp), 0 when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio_or_zero(self.tp, self.tp + self.fp)
    }

    /// tp / (tp + fn), 0 when there are no positives.
    pub fn recall(&self) -> f64 {
        ratio_or_zero(self.tp, self.tp + self.fn_)
    }

    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }
}

fn ratio_or_zero(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
