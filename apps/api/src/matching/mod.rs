// Profile-to-scorecard matching engine.
// Flow: chunk profile → embed once → per criterion (retrieve → judge) → aggregate.
// All LLM calls go through llm_client; all embedding calls go through embeddings.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::embeddings::EmbeddingError;
use crate::scorecards::RepositoryError;

pub mod aggregator;
pub mod chunker;
pub mod engine;
pub mod handlers;
pub mod judge;
pub mod models;
pub mod prompts;
pub mod retriever;

pub use engine::MatchEngine;

/// Terminal failures. Anything per-criterion degrades locally and never
/// surfaces here.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Scorecard {0} not found")]
    ScorecardNotFound(Uuid),

    #[error("Profile contains no analyzable text")]
    NoEvidence,

    #[error("Embedding provider failed: {0}")]
    EmbeddingProvider(#[from] EmbeddingError),

    #[error("Scorecard repository failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Match did not complete within {0:?}")]
    Timeout(Duration),
}

/// What to do with a criterion for which retrieval found no evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoEvidencePolicy {
    /// Leave it out of both numerator and denominator.
    #[default]
    Exclude,
    /// Score it at the bottom of the scale.
    Floor,
}

impl FromStr for NoEvidencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(NoEvidencePolicy::Exclude),
            "floor" => Ok(NoEvidencePolicy::Floor),
            other => Err(format!("expected 'exclude' or 'floor', got '{other}'")),
        }
    }
}
