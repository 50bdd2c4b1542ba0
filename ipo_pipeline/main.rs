use anyhow::{Context, Result};
use env_logger::Env;
use ipo_pipeline::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Load configuration
    let (config, command) = Config::load()?;
    let provider = CsvCacheProvider::new(&config.data_dir);

    match command {
        Command::Run => {
            println!("IPO Screen - Top-quantile outperformance\n");
            let outcome = run_pipeline(&provider, &config).context("pipeline run failed")?;

            let paths = write_outcome(&outcome, &config.output_dir)?;
            print!("{}", report::render_summary(&outcome)?);
            println!("\nReports written to {}", config.output_dir.display());
            println!("  {}\n  {}\n  {}", paths.summary.display(), paths.evaluation.display(), paths.outcome.display());
        }
        Command::Score { symbol } => {
            let snapshot = provider
                .fundamentals(&symbol)
                .with_context(|| format!("no fundamentals for {}", symbol))?;
            let card = FundamentalScorer::new(config.scoring.clone()).score(&snapshot);

            for c in &card.contributions {
                println!("{:<32} {:>14.4} {:>8.2}", c.attribute, c.value, c.points);
            }
            println!("\n{} score: {:.2} ({})", symbol, card.score, card.verdict);
        }
        Command::Coverage => {
            if config.symbols.is_empty() {
                anyhow::bail!("no symbols configured; pass --symbols or a config file");
            }
            let survey = survey_coverage(&provider, &config.symbols, config.window_len);
            println!("Requested: {}", survey.requested);
            println!("Unavailable: {}", survey.unavailable);
            println!("Fewer than {} rows: {}", config.window_len, survey.short_history);
            println!("At least {} rows: {}", config.window_len, survey.full_history);
        }
        Command::Quarterly { step } => {
            if config.symbols.is_empty() {
                anyhow::bail!("no symbols configured; pass --symbols or a config file");
            }
            let series = fetch_series(&provider, &config.symbols, config.window_len);
            let points = quarterly_trajectory(&series.loaded, step);

            println!("{:>6} {:>10} {:>14}", "Row", "Symbols", "Mean change %");
            for p in &points {
                println!("{:>6} {:>10} {:>14.4}", p.row, p.symbols, p.mean_change);
            }
        }
    }

    Ok(())
}
