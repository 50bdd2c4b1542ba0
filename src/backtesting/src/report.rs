use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::EvaluationReport;

/// Write the evaluation section of a text report: metrics, portfolio and the
/// first `top_k` ranked symbols.
pub fn write_evaluation_section<W: Write>(out: &mut W, report: &EvaluationReport, top_k: usize) -> Result<()> {
    let m = &report.metrics;

    writeln!(out, "Classification Metrics:")?;
    writeln!(out, "-----------------------")?;
    match m.roc_auc {
        Some(auc) => writeln!(out, "ROC-AUC: {:.4}", auc)?,
        None => writeln!(out, "ROC-AUC: undefined (single class)")?,
    }
    writeln!(out, "Precision: {:.4}", m.precision)?;
    writeln!(out, "Recall: {:.4}", m.recall)?;
    writeln!(out, "Prediction threshold: {:.4}", m.threshold)?;
    writeln!(out, "Confusion matrix [[tn, fp], [fn, tp]]:")?;
    writeln!(out, "  [{}, {}]", m.confusion_matrix[0][0], m.confusion_matrix[0][1])?;
    writeln!(out, "  [{}, {}]", m.confusion_matrix[1][0], m.confusion_matrix[1][1])?;
    writeln!(out)?;

    let p = &report.portfolio;
    writeln!(out, "Portfolio:")?;
    writeln!(out, "----------")?;
    writeln!(out, "Top {} of {} symbols", p.top_n, p.universe_size)?;
    writeln!(out, "Top mean return: {:.2}%", p.top_mean_return)?;
    writeln!(out, "Universe mean return: {:.2}%", p.universe_mean_return)?;
    writeln!(out, "Outperformance: {:.2}%", p.outperformance)?;
    writeln!(out)?;

    writeln!(out, "Top {} ranked symbols:", top_k.min(report.ranked.len()))?;
    writeln!(out, "{:<4} {:<12} {:>12} {:>12}", "#", "Symbol", "Probability", "Return %")?;
    for (i, entry) in report.ranked.iter().take(top_k).enumerate() {
        writeln!(
            out,
            "{:<4} {:<12} {:>12.4} {:>12.2}",
            i + 1,
            entry.symbol,
            entry.probability,
            entry.realized_return
        )?;
    }

    Ok(())
}

/// Generate a text report for a single evaluation
pub fn generate_text_report<P: AsRef<Path>>(report: &EvaluationReport, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "Evaluation Report")?;
    writeln!(file, "=================")?;
    writeln!(file)?;
    write_evaluation_section(&mut file, report, report.ranked.len())?;
    file.flush()?;

    Ok(())
}
