use anyhow::{Context, Result};
use backtesting::report::{generate_text_report, write_evaluation_section};
use ipostat::core::io::{write_file, write_json};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineOutcome;

const TOP_RANKED: usize = 5;
const TOP_IMPORTANCES: usize = 10;

/// Render the text summary of a pipeline run.
pub fn render_summary(outcome: &PipelineOutcome) -> Result<String> {
    let mut out = Vec::new();

    writeln!(out, "IPO Screen Summary")?;
    writeln!(out, "==================")?;
    writeln!(out)?;

    let t = &outcome.training;
    let p = t.best_params();
    writeln!(out, "Model:")?;
    writeln!(out, "------")?;
    writeln!(out, "n_estimators: {}", p.n_estimators)?;
    match p.max_depth {
        Some(d) => writeln!(out, "max_depth: {}", d)?,
        None => writeln!(out, "max_depth: unbounded")?,
    }
    writeln!(out, "min_samples_split: {}", p.min_samples_split)?;
    writeln!(out, "min_samples_leaf: {}", p.min_samples_leaf)?;
    match t.best_score() {
        Some(s) => writeln!(out, "Cross-validated ROC-AUC ({} folds): {:.4}", t.search.n_folds, s)?,
        None => writeln!(out, "Cross-validated ROC-AUC: undefined")?,
    }
    writeln!(out, "Label threshold: {:.2}%", outcome.label_threshold)?;
    writeln!(out)?;

    write_evaluation_section(&mut out, &outcome.evaluation, TOP_RANKED)?;
    writeln!(out)?;

    writeln!(out, "Top {} features:", TOP_IMPORTANCES.min(outcome.importances.len()))?;
    for (name, importance) in outcome.importances.iter().take(TOP_IMPORTANCES) {
        writeln!(out, "  {:<32} {:.4}", name, importance)?;
    }
    writeln!(out)?;

    let c = &outcome.coverage;
    writeln!(out, "Coverage:")?;
    writeln!(out, "---------")?;
    writeln!(out, "Requested: {}", c.requested)?;
    writeln!(out, "Used: {}", c.used)?;
    writeln!(out, "Excluded: {}", c.excluded)?;
    writeln!(out, "  without price history: {}", c.series_failures)?;
    writeln!(out, "  with short history: {}", c.insufficient_history)?;
    writeln!(out, "  without a valid forward return: {}", c.invalid_return)?;
    writeln!(out, "Without fundamentals (imputed): {}", c.fundamentals_failures)?;

    Ok(String::from_utf8(out)?)
}

/// Write the text summary to `path`.
pub fn write_summary<P: AsRef<Path>>(outcome: &PipelineOutcome, path: P) -> Result<()> {
    let path = path.as_ref();
    let text = render_summary(outcome)?;
    write_file(path, text).with_context(|| format!("failed to write summary {}", path.display()))
}

/// Files written by [`write_outcome`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub summary: PathBuf,
    /// Full ranked table.
    pub evaluation: PathBuf,
    pub outcome: PathBuf,
}

/// Write `summary.txt`, `evaluation.txt` and `outcome.json` under `dir`.
pub fn write_outcome<P: AsRef<Path>>(outcome: &PipelineOutcome, dir: P) -> Result<ReportPaths> {
    let dir = dir.as_ref();
    let paths = ReportPaths {
        summary: dir.join("summary.txt"),
        evaluation: dir.join("evaluation.txt"),
        outcome: dir.join("outcome.json"),
    };

    write_summary(outcome, &paths.summary)?;
    generate_text_report(&outcome.evaluation, &paths.evaluation)
        .with_context(|| format!("failed to write {}", paths.evaluation.display()))?;
    write_json(&paths.outcome, outcome).with_context(|| format!("failed to write {}", paths.outcome.display()))?;

    Ok(paths)
}
