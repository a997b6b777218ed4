use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::scorecard::Weight;

/// Top of the judge's scale.
pub const MAX_SCORE: u8 = 5;
/// Bottom of the judge's scale: "no evidence".
pub const MIN_SCORE: u8 = 1;

/// A profile fragment and its vector. Lives only for one `analyze` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// How a criterion's score came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// The judge returned a valid verdict.
    Judged,
    /// The judge failed or timed out; the score is the default.
    Fallback,
    /// Retrieval found nothing and the floor policy scored it.
    NoEvidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
    pub criterion_id: Uuid,
    pub criterion: String,
    pub weight: Weight,
    /// 1..=5
    pub score: u8,
    pub justification: String,
    pub evidence: Vec<String>,
    pub outcome: EvaluationOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: String,
    /// 0..=100
    pub score: u32,
    /// Evaluated criteria in scorecard order. Excluded criteria are absent.
    pub criteria: Vec<CriterionEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub scorecard_id: Uuid,
    pub scorecard_name: String,
    pub candidate_name: Option<String>,
    pub headline: Option<String>,
    /// 0..=100
    pub overall_score: u32,
    pub categories: Vec<CategoryResult>,
}
