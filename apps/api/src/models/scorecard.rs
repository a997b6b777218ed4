use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Importance of a criterion within its scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weight {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Weight {
    pub fn value(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u8> for Weight {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Weight::Low),
            2 => Ok(Weight::Medium),
            3 => Ok(Weight::High),
            other => Err(format!("criterion weight must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Weight> for u8 {
    fn from(weight: Weight) -> Self {
        weight as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub id: Uuid,
    pub name: String,
    /// Display order only; scoring does not depend on it.
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: Uuid,
    pub name: String,
    /// Free-text judging instruction.
    pub description: String,
    pub weight: Weight,
    /// Precomputed retrieval vector. Empty when it has not been computed yet.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Criterion {
    /// Text embedded for criteria that carry no stored vector.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.name.trim(), self.description.trim())
    }
}

impl Scorecard {
    pub fn criteria_count(&self) -> usize {
        self.categories.iter().map(|c| c.criteria.len()).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Database rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct ScorecardRow {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CriterionRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub weight: i16,
    pub embedding: Option<Vec<f32>>,
}
