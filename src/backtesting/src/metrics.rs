use stats::{ConfusionMatrix, percentile, roc_auc};

use crate::models::ClassificationMetrics;

/// Calculate classification metrics for probabilities against 0/1 labels.
///
/// Predictions are binarized at the `quantile` percentile of the probability
/// vector itself (`>=`), independent of how the labels were thresholded.
pub fn classification_metrics(labels: &[u8], probabilities: &[f64], quantile: f64) -> ClassificationMetrics {
    let threshold = percentile(probabilities, quantile);

    let predicted: Vec<u8> = probabilities
        .iter()
        .map(|&p| u8::from(p >= threshold))
        .collect();

    let cm = ConfusionMatrix::from_labels(labels, &predicted);

    ClassificationMetrics {
        roc_auc: roc_auc(probabilities, labels),
        precision: cm.precision(),
        recall: cm.recall(),
        confusion_matrix: cm.as_rows(),
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let labels = vec![0, 0, 0, 0, 0, 0, 0, 1, 1, 1];
        let probs: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();

        let m = classification_metrics(&labels, &probs, 0.7);
        assert_eq!(m.roc_auc, Some(1.0));
        // rank 7.7 -> threshold 0.67, so 0.7, 0.8, 0.9 are positive
        assert!((m.threshold - 0.67).abs() < 1e-12);
        assert_eq!(m.confusion_matrix, [[7, 0], [0, 3]]);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let m = classification_metrics(&[0, 0, 0], &[0.1, 0.2, 0.3], 0.7);
        assert_eq!(m.roc_auc, None);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.precision, 0.0);
    }

    #[test]
    fn test_tied_probabilities_all_positive() {
        let m = classification_metrics(&[0, 1, 0, 1], &[0.5; 4], 0.7);
        assert_eq!(m.confusion_matrix, [[0, 2], [0, 2]]);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.roc_auc, Some(0.5));
    }
}
