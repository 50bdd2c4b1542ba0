//! Rule-based scoring of a single fundamentals snapshot.

use indexmap::IndexMap;
use ipostat::core::io::FundamentalSnapshot;
use serde::Serialize;
use std::fmt;

use crate::config::ScoringRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Average,
    Poor,
}

impl Verdict {
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            Verdict::Good
        } else if score >= 50.0 {
            Verdict::Average
        } else {
            Verdict::Poor
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Good => "good investment",
            Verdict::Average => "average investment",
            Verdict::Poor => "poor investment",
        };
        f.write_str(text)
    }
}

/// Points earned by one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub attribute: String,
    pub value: f64,
    /// Position of `value` in the ideal range, clamped to [0, 1].
    pub normalized: f64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    /// 0..=100, two decimals.
    pub score: f64,
    pub verdict: Verdict,
    /// Scored attributes in rule order; attributes absent from the snapshot are skipped.
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone)]
pub struct FundamentalScorer {
    rules: IndexMap<String, ScoringRule>,
}

impl FundamentalScorer {
    pub fn new(rules: IndexMap<String, ScoringRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &IndexMap<String, ScoringRule> {
        &self.rules
    }

    pub fn score(&self, snapshot: &FundamentalSnapshot) -> ScoreCard {
        let contributions: Vec<Contribution> = self
            .rules
            .iter()
            .filter_map(|(attribute, rule)| {
                let value = *snapshot.get(attribute)?;
                let [min, max] = rule.ideal;
                let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
                Some(Contribution {
                    attribute: attribute.clone(),
                    value,
                    normalized,
                    points: normalized * rule.weight * 100.0,
                })
            })
            .collect();

        let total: f64 = contributions.iter().map(|c| c.points).sum();
        let score = (total.min(100.0) * 100.0).round() / 100.0;

        ScoreCard {
            score,
            verdict: Verdict::from_score(score),
            contributions,
        }
    }
}
