use backtesting::{EvaluationReport, evaluate_ranking};
use indexmap::IndexMap;
use log::info;

use crate::error::PipelineError;

/// Join labels, probabilities and realized returns by symbol and evaluate the
/// ranking. The universe follows the order of `labels`.
///
/// All three maps must hold exactly the same symbols.
pub fn evaluate(
    labels: &IndexMap<String, u8>,
    probabilities: &IndexMap<String, f64>,
    returns: &IndexMap<String, f64>,
    quantile: f64,
    top_fraction: f64,
) -> Result<EvaluationReport, PipelineError> {
    if labels.is_empty() {
        return Err(PipelineError::Alignment {
            stage: "evaluation",
            detail: "no labeled symbols".to_string(),
        });
    }

    let mut symbols = Vec::with_capacity(labels.len());
    let mut y = Vec::with_capacity(labels.len());
    let mut probs = Vec::with_capacity(labels.len());
    let mut realized = Vec::with_capacity(labels.len());

    for (symbol, &label) in labels {
        let (Some(&p), Some(&r)) = (probabilities.get(symbol), returns.get(symbol)) else {
            return Err(PipelineError::Alignment {
                stage: "evaluation",
                detail: format!("{} lacks a probability or a realized return", symbol),
            });
        };
        symbols.push(symbol.clone());
        y.push(label);
        probs.push(p);
        realized.push(r);
    }
    if probabilities.len() != labels.len() || returns.len() != labels.len() {
        return Err(PipelineError::Alignment {
            stage: "evaluation",
            detail: format!(
                "{} labels, {} probabilities, {} returns",
                labels.len(),
                probabilities.len(),
                returns.len()
            ),
        });
    }

    let report = evaluate_ranking(&symbols, &y, &probs, &realized, quantile, top_fraction)?;

    match report.metrics.roc_auc {
        Some(auc) => info!("ROC-AUC {:.4}", auc),
        None => info!("ROC-AUC undefined, labels hold a single class"),
    }
    info!(
        "Top {} outperformance {:.2}%",
        report.portfolio.top_n, report.portfolio.outperformance
    );
    Ok(report)
}
