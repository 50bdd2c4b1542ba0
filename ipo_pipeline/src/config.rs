use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use ipostat::models::ParamGrid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the IPO screening pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ticker universe, in evaluation order
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Directory holding `<SYMBOL>.csv` and `<SYMBOL>-info.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for the text and JSON reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Fundamental attributes merged into the feature matrix
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Rows kept per series (training + target window)
    #[serde(default = "default_window_len")]
    pub window_len: usize,

    /// Rows in the training window
    #[serde(default = "default_train_len")]
    pub train_len: usize,

    /// Return percentile at or above which a symbol is labeled 1
    #[serde(default = "default_label_quantile")]
    pub label_quantile: f64,

    /// Share of the ranked universe held in the top portfolio
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,

    #[serde(default)]
    pub model: ModelConfig,

    /// Fundamental scoring table, attribute -> rule
    #[serde(default = "default_scoring")]
    pub scoring: IndexMap<String, ScoringRule>,
}

/// Random forest search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub seed: u64,
    pub n_folds: usize,
    pub n_estimators: Vec<usize>,
    /// 0 means unbounded depth
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let grid = ParamGrid::default();
        Self {
            seed: 42,
            n_folds: 5,
            n_estimators: grid.n_estimators,
            max_depth: grid.max_depth.iter().map(|d| d.unwrap_or(0)).collect(),
            min_samples_split: grid.min_samples_split,
            min_samples_leaf: grid.min_samples_leaf,
        }
    }
}

impl ModelConfig {
    pub fn param_grid(&self) -> ParamGrid {
        ParamGrid {
            n_estimators: self.n_estimators.clone(),
            max_depth: self.max_depth.iter().map(|&d| (d > 0).then_some(d)).collect(),
            min_samples_split: self.min_samples_split.clone(),
            min_samples_leaf: self.min_samples_leaf.clone(),
        }
    }
}

/// Weight of an attribute and the range mapped linearly onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub weight: f64,
    /// [min, max]
    pub ideal: [f64; 2],
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_window_len() -> usize {
    1500
}

fn default_train_len() -> usize {
    1250
}

fn default_label_quantile() -> f64 {
    0.7
}

fn default_top_fraction() -> f64 {
    0.3
}

pub fn default_attributes() -> Vec<String> {
    [
        "trailingPE", "forwardPE", "priceToSalesTrailing12Months", "priceToBook",
        "returnOnAssets", "returnOnEquity", "profitMargins", "operatingMargins",
        "grossMargins", "earningsQuarterlyGrowth", "revenueGrowth",
        "marketCap", "enterpriseValue", "enterpriseToRevenue", "enterpriseToEbitda",
        "previousClose", "open", "dayLow", "dayHigh", "fiftyTwoWeekLow",
        "fiftyTwoWeekHigh", "fiftyDayAverage", "twoHundredDayAverage", "beta", "52WeekChange",
        "volume", "averageVolume", "averageVolume10days",
        "targetHighPrice", "targetLowPrice", "targetMeanPrice",
        "targetMedianPrice", "recommendationMean", "numberOfAnalystOpinions",
        "totalCash", "totalDebt", "quickRatio", "currentRatio",
        "debtToEquity", "freeCashflow", "operatingCashflow",
        "totalRevenue", "ebitda", "netIncomeToCommon",
        "auditRisk", "boardRisk", "compensationRisk", "shareHolderRightsRisk", "overallRisk",
        "heldPercentInsiders", "heldPercentInstitutions", "sharesPercentSharesOut",
        "shortRatio", "shortPercentOfFloat",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_scoring() -> IndexMap<String, ScoringRule> {
    let rule = |weight, min, max| ScoringRule { weight, ideal: [min, max] };
    [
        ("trailingPE", rule(0.1, 5.0, 15.0)),
        ("forwardPE", rule(0.1, 5.0, 15.0)),
        ("priceToSalesTrailing12Months", rule(0.08, 1.0, 4.0)),
        ("priceToBook", rule(0.08, 0.5, 1.5)),
        ("returnOnAssets", rule(0.07, 0.05, 0.2)),
        ("returnOnEquity", rule(0.07, 0.1, 0.3)),
        ("profitMargins", rule(0.07, 0.3, 0.6)),
        ("operatingMargins", rule(0.07, 0.3, 0.6)),
        ("earningsQuarterlyGrowth", rule(0.06, 0.01, 0.2)),
        ("revenueGrowth", rule(0.06, 0.01, 0.1)),
        ("beta", rule(0.05, 0.5, 1.5)),
        ("quickRatio", rule(0.05, 1.0, 2.0)),
        ("currentRatio", rule(0.05, 1.0, 2.0)),
        ("debtToEquity", rule(0.05, 0.0, 1.0)),
    ]
    .into_iter()
    .map(|(name, r)| (name.to_string(), r))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            attributes: default_attributes(),
            window_len: default_window_len(),
            train_len: default_train_len(),
            label_quantile: default_label_quantile(),
            top_fraction: default_top_fraction(),
            model: ModelConfig::default(),
            scoring: default_scoring(),
        }
    }
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ipo_pipeline")]
#[command(about = "Screen an equity universe for likely top-quantile performers")]
pub struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory of cached price CSV and info JSON files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Symbols (comma-separated), replacing the configured universe
    #[arg(long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Directory for reports
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train, evaluate and write reports (default)
    Run,
    /// Heuristic fundamental score of one symbol
    Score { symbol: String },
    /// Count symbols by price history coverage
    Coverage,
    /// Mean change since the IPO-day open, sampled every `step` rows
    Quarterly {
        #[arg(long, default_value_t = crate::trajectory::QUARTER_ROWS)]
        step: usize,
    },
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Start from the config file when given, otherwise defaults, then apply
    /// command-line overrides
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = &args.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(symbols) = &args.symbols {
            config.symbols = symbols.clone();
        }
        if let Some(dir) = &args.output_dir {
            config.output_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse the command line and build the configuration
    pub fn load() -> Result<(Self, Command)> {
        let args = Args::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command.unwrap_or(Command::Run)))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.train_len == 0 || self.train_len >= self.window_len {
            anyhow::bail!(
                "train_len must be in 1..window_len, got {} with window_len {}",
                self.train_len,
                self.window_len
            );
        }

        if !(self.label_quantile > 0.0 && self.label_quantile < 1.0) {
            anyhow::bail!("label_quantile must be in (0, 1), got {}", self.label_quantile);
        }

        if !(self.top_fraction > 0.0 && self.top_fraction <= 1.0) {
            anyhow::bail!("top_fraction must be in (0, 1], got {}", self.top_fraction);
        }

        let m = &self.model;
        if m.n_folds < 2 {
            anyhow::bail!("n_folds must be at least 2");
        }
        if m.n_estimators.is_empty()
            || m.max_depth.is_empty()
            || m.min_samples_split.is_empty()
            || m.min_samples_leaf.is_empty()
        {
            anyhow::bail!("every model grid list needs at least one value");
        }
        if m.n_estimators.contains(&0) {
            anyhow::bail!("n_estimators must be greater than 0");
        }
        if m.min_samples_split.iter().any(|&v| v < 2) {
            anyhow::bail!("min_samples_split must be at least 2");
        }
        if m.min_samples_leaf.contains(&0) {
            anyhow::bail!("min_samples_leaf must be at least 1");
        }

        for (name, rule) in &self.scoring {
            if !(rule.ideal[0] < rule.ideal[1]) {
                anyhow::bail!("scoring range for {} must satisfy min < max, got {:?}", name, rule.ideal);
            }
            if !(rule.weight >= 0.0) {
                anyhow::bail!("scoring weight for {} must be non-negative, got {}", name, rule.weight);
            }
        }

        Ok(())
    }
}
