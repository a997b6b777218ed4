//! Match Orchestrator: runs one profile against one scorecard.
//!
//! Steps:
//! 1. load scorecard → `ScorecardNotFound` if absent
//! 2. chunk profile → `NoEvidence` if nothing analyzable
//! 3. embed chunks (plus any criterion missing a stored vector) in one batch
//! 4. per criterion, concurrently: retrieve evidence → judge
//! 5. wait for every criterion to settle
//! 6. aggregate per category, then overall
//!
//! Steps 1–3 fail the match. Step 4 never does: each criterion degrades on
//! its own. The whole run is bounded by a timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::embeddings::{Embedder, EmbeddingError};
use crate::matching::aggregator::{aggregate_category, overall_score};
use crate::matching::chunker::chunk_profile;
use crate::matching::judge::{CriterionJudge, JudgeBackend};
use crate::matching::models::{
    CriterionEvaluation, EvaluationOutcome, MatchResult, ProfileChunk, MIN_SCORE,
};
use crate::matching::retriever::Retriever;
use crate::matching::{MatchError, NoEvidencePolicy};
use crate::models::profile::{present, CandidateProfile};
use crate::models::scorecard::{Criterion, Scorecard};
use crate::scorecards::ScorecardRepository;

pub const NO_EVIDENCE_JUSTIFICATION: &str = "No supporting evidence found in the profile.";

/// Shared across requests; holds no per-request state.
pub struct MatchEngine {
    scorecards: Arc<dyn ScorecardRepository>,
    embedder: Arc<dyn Embedder>,
    judge: CriterionJudge,
    retriever: Retriever,
    policy: NoEvidencePolicy,
    max_concurrency: usize,
    default_timeout: Duration,
}

/// Per-request vectors: the profile chunks plus vectors computed on the fly
/// for criteria that had none stored.
struct EmbeddedRequest {
    chunks: Vec<ProfileChunk>,
    criterion_vectors: HashMap<Uuid, Vec<f32>>,
}

impl MatchEngine {
    pub fn new(
        scorecards: Arc<dyn ScorecardRepository>,
        embedder: Arc<dyn Embedder>,
        judge_backend: Arc<dyn JudgeBackend>,
        config: &MatchingConfig,
    ) -> Self {
        Self {
            scorecards,
            embedder,
            judge: CriterionJudge::new(
                judge_backend,
                config.judge_timeout,
                config.judge_max_retries,
            ),
            retriever: Retriever::new(config.top_k, config.min_similarity),
            policy: config.no_evidence_policy,
            max_concurrency: config.max_concurrency.max(1),
            default_timeout: config.match_timeout,
        }
    }

    pub async fn analyze(
        &self,
        scorecard_id: Uuid,
        profile: &CandidateProfile,
    ) -> Result<MatchResult, MatchError> {
        self.analyze_within(scorecard_id, profile, self.default_timeout)
            .await
    }

    /// Like `analyze`, with a caller-supplied bound. Exceeding it is terminal;
    /// no partial result is returned.
    pub async fn analyze_within(
        &self,
        scorecard_id: Uuid,
        profile: &CandidateProfile,
        timeout: Duration,
    ) -> Result<MatchResult, MatchError> {
        match tokio::time::timeout(timeout, self.run(scorecard_id, profile)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Match against scorecard {scorecard_id} exceeded {timeout:?}");
                Err(MatchError::Timeout(timeout))
            }
        }
    }

    async fn run(
        &self,
        scorecard_id: Uuid,
        profile: &CandidateProfile,
    ) -> Result<MatchResult, MatchError> {
        let scorecard = self
            .scorecards
            .get_scorecard(scorecard_id)
            .await?
            .ok_or(MatchError::ScorecardNotFound(scorecard_id))?;
        info!(
            "Matching against scorecard '{}' ({} categories, {} criteria)",
            scorecard.name,
            scorecard.categories.len(),
            scorecard.criteria_count()
        );

        let texts = chunk_profile(profile)?;
        debug!("Profile split into {} chunks", texts.len());

        let embedded = self.embed_request(&scorecard, texts).await?;

        let evaluations = self.evaluate_all(&scorecard, &embedded).await;

        let mut per_category: Vec<Vec<CriterionEvaluation>> =
            vec![Vec::new(); scorecard.categories.len()];
        for (category_index, evaluation) in evaluations {
            if let Some(evaluation) = evaluation {
                per_category[category_index].push(evaluation);
            }
        }

        let mut categories = Vec::with_capacity(per_category.len());
        let mut tallies = Vec::with_capacity(per_category.len());
        for (category, evaluations) in scorecard.categories.iter().zip(per_category) {
            let (result, tally) = aggregate_category(&category.name, evaluations);
            categories.push(result);
            tallies.push(tally);
        }

        let overall = overall_score(&tallies);
        info!(
            "Scorecard '{}' matched: overall {}/100",
            scorecard.name, overall
        );

        Ok(MatchResult {
            scorecard_id: scorecard.id,
            scorecard_name: scorecard.name,
            candidate_name: present(&profile.full_name).map(str::to_string),
            headline: present(&profile.headline).map(str::to_string),
            overall_score: overall,
            categories,
        })
    }

    /// One embedding call for the whole request.
    async fn embed_request(
        &self,
        scorecard: &Scorecard,
        texts: Vec<String>,
    ) -> Result<EmbeddedRequest, MatchError> {
        let pending: Vec<&Criterion> = scorecard
            .categories
            .iter()
            .flat_map(|c| c.criteria.iter())
            .filter(|c| c.embedding.is_empty())
            .filter(|c| !(c.name.trim().is_empty() && c.description.trim().is_empty()))
            .collect();

        let chunk_count = texts.len();
        let mut batch = texts;
        batch.extend(pending.iter().map(|c| c.embedding_text()));

        debug!(
            "Embedding {} chunks and {} criteria",
            chunk_count,
            pending.len()
        );
        let mut vectors = self.embedder.embed(&batch).await?;
        if vectors.len() != batch.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let criterion_vectors = pending
            .iter()
            .map(|c| c.id)
            .zip(vectors.split_off(chunk_count))
            .collect();

        batch.truncate(chunk_count);
        let chunks = batch
            .into_iter()
            .zip(vectors)
            .map(|(text, embedding)| ProfileChunk { text, embedding })
            .collect();

        Ok(EmbeddedRequest {
            chunks,
            criterion_vectors,
        })
    }

    /// Fans out over every criterion of every category and waits for all of
    /// them. Results come back in scorecard order, tagged with their category.
    async fn evaluate_all(
        &self,
        scorecard: &Scorecard,
        embedded: &EmbeddedRequest,
    ) -> Vec<(usize, Option<CriterionEvaluation>)> {
        let jobs: Vec<_> = scorecard
            .categories
            .iter()
            .enumerate()
            .flat_map(|(index, category)| category.criteria.iter().map(move |c| (index, c)))
            .map(|(index, criterion)| self.evaluate_job(index, criterion, embedded))
            .collect();

        stream::iter(jobs)
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Retrieve then judge, for one criterion.
    async fn evaluate_job(
        &self,
        category_index: usize,
        criterion: &Criterion,
        embedded: &EmbeddedRequest,
    ) -> (usize, Option<CriterionEvaluation>) {
        let embedding = if criterion.embedding.is_empty() {
            embedded
                .criterion_vectors
                .get(&criterion.id)
                .map(Vec::as_slice)
                .unwrap_or_default()
        } else {
            criterion.embedding.as_slice()
        };

        let evidence = self.retriever.retrieve(embedding, &embedded.chunks);
        (category_index, self.evaluate(criterion, &evidence).await)
    }

    async fn evaluate(
        &self,
        criterion: &Criterion,
        evidence: &[String],
    ) -> Option<CriterionEvaluation> {
        if let Some(evaluation) = self.judge.judge(criterion, evidence).await {
            if evaluation.outcome == EvaluationOutcome::Fallback {
                warn!("Criterion '{}' degraded to default score", criterion.name);
            }
            return Some(evaluation);
        }

        match self.policy {
            NoEvidencePolicy::Exclude => {
                debug!("Excluding criterion '{}': no evidence", criterion.name);
                None
            }
            NoEvidencePolicy::Floor => Some(CriterionEvaluation {
                criterion_id: criterion.id,
                criterion: criterion.name.clone(),
                weight: criterion.weight,
                score: MIN_SCORE,
                justification: NO_EVIDENCE_JUSTIFICATION.to_string(),
                evidence: Vec::new(),
                outcome: EvaluationOutcome::NoEvidence,
            }),
        }
    }
}
