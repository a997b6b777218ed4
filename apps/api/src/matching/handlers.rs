//! Axum route handlers for the Match API.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::models::MatchResult;
use crate::models::profile::CandidateProfile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub profile: CandidateProfile,
    /// Overrides the configured whole-match timeout for this request.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// POST /api/v1/scorecards/:id/match
///
/// Scores one candidate profile against the scorecard. Per-criterion model
/// failures are folded into the result; only terminal errors return non-2xx.
pub async fn handle_match(
    State(state): State<AppState>,
    Path(scorecard_id): Path<Uuid>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResult>, AppError> {
    info!("Match requested for scorecard {scorecard_id}");

    let result = match request.timeout_secs {
        Some(0) => {
            return Err(AppError::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ))
        }
        Some(secs) => {
            state
                .engine
                .analyze_within(scorecard_id, &request.profile, Duration::from_secs(secs))
                .await?
        }
        None => state.engine.analyze(scorecard_id, &request.profile).await?,
    };

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::MatchingConfig;
    use crate::embeddings::{Embedder, EmbeddingError};
    use crate::llm_client::LlmError;
    use crate::matching::judge::{JudgeBackend, JudgeVerdict};
    use crate::matching::MatchEngine;
    use crate::models::scorecard::{Category, Criterion, Scorecard, Weight};
    use crate::routes::build_router;
    use crate::scorecards::{RepositoryError, ScorecardRepository};
    use crate::state::AppState;

    use super::*;

    struct OneScorecard(Scorecard);

    #[async_trait]
    impl ScorecardRepository for OneScorecard {
        async fn get_scorecard(&self, id: Uuid) -> Result<Option<Scorecard>, RepositoryError> {
            Ok((self.0.id == id).then(|| self.0.clone()))
        }
    }

    /// Every text gets the same vector, so every chunk is evidence.
    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FixedJudge;

    #[async_trait]
    impl JudgeBackend for FixedJudge {
        async fn verdict(&self, _prompt: &str, _system: &str) -> Result<JudgeVerdict, LlmError> {
            Ok(JudgeVerdict {
                score: 4.0,
                justification: "Clear evidence in the summary.".to_string(),
            })
        }
    }

    fn scorecard() -> Scorecard {
        Scorecard {
            id: Uuid::new_v4(),
            name: "Backend Engineer".to_string(),
            categories: vec![Category {
                id: Uuid::new_v4(),
                name: "Technical Skills".to_string(),
                criteria: vec![Criterion {
                    id: Uuid::new_v4(),
                    name: "Rust".to_string(),
                    description: "Ships Rust services".to_string(),
                    weight: Weight::High,
                    embedding: vec![1.0, 0.0],
                }],
            }],
        }
    }

    fn app(scorecard: Scorecard) -> axum::Router {
        let engine = MatchEngine::new(
            Arc::new(OneScorecard(scorecard)),
            Arc::new(FlatEmbedder),
            Arc::new(FixedJudge),
            &MatchingConfig::default(),
        );
        build_router(AppState {
            engine: Arc::new(engine),
        })
    }

    async fn post(app: axum::Router, id: Uuid, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/scorecards/{id}/match"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_match_returns_scored_result() {
        let card = scorecard();
        let id = card.id;
        let (status, body) = post(
            app(card),
            id,
            json!({ "profile": { "full_name": "Ada", "about": "Writes Rust daily" } }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidate_name"], "Ada");
        assert_eq!(body["overall_score"], 80);
        assert_eq!(body["categories"][0]["criteria"][0]["outcome"], "judged");
        assert_eq!(
            body["categories"][0]["criteria"][0]["evidence"][0],
            "Summary: Writes Rust daily"
        );
    }

    #[tokio::test]
    async fn test_unknown_scorecard_is_404() {
        let (status, body) = post(
            app(scorecard()),
            Uuid::new_v4(),
            json!({ "profile": { "headline": "Engineer" } }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_empty_profile_is_rejected() {
        let card = scorecard();
        let id = card.id;
        let (status, body) = post(app(card), id, json!({ "profile": {} })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let card = scorecard();
        let id = card.id;
        let (status, _) = post(
            app(card),
            id,
            json!({ "profile": { "headline": "Engineer" }, "timeout_secs": 0 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(scorecard())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
