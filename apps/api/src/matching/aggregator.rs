//! Weighted Aggregator: per-category and overall scores.
//!
//! score = round(100 × Σ(score_i × weight_i) / Σ(MAX_SCORE × weight_i))
//!
//! The overall score applies the same ratio to the summed tallies of all
//! categories rather than averaging category percentages. A tally with no
//! weight (every criterion excluded) scores 0.

use crate::matching::models::{CategoryResult, CriterionEvaluation, MAX_SCORE};
use crate::models::scorecard::Weight;

/// Raw weighted sums behind a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightedTally {
    pub earned: u32,
    pub possible: u32,
}

impl WeightedTally {
    pub fn add(&mut self, score: u8, weight: Weight) {
        self.earned += u32::from(score.min(MAX_SCORE)) * weight.value();
        self.possible += u32::from(MAX_SCORE) * weight.value();
    }

    pub fn merge(self, other: WeightedTally) -> WeightedTally {
        WeightedTally {
            earned: self.earned + other.earned,
            possible: self.possible + other.possible,
        }
    }

    /// 0..=100
    pub fn percentage(&self) -> u32 {
        if self.possible == 0 {
            return 0;
        }
        (100.0 * self.earned as f64 / self.possible as f64).round() as u32
    }
}

/// Scores one category from the evaluations that produced a result.
pub fn aggregate_category(
    name: &str,
    evaluations: Vec<CriterionEvaluation>,
) -> (CategoryResult, WeightedTally) {
    let mut tally = WeightedTally::default();
    for evaluation in &evaluations {
        tally.add(evaluation.score, evaluation.weight);
    }

    let result = CategoryResult {
        category: name.to_string(),
        score: tally.percentage(),
        criteria: evaluations,
    };
    (result, tally)
}

pub fn overall_score(tallies: &[WeightedTally]) -> u32 {
    tallies
        .iter()
        .fold(WeightedTally::default(), |acc, t| acc.merge(*t))
        .percentage()
}
