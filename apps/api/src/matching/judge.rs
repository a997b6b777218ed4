//! Criterion Judge: scores one criterion against its retrieved evidence.
//!
//! Every failure (timeout, provider error, unparseable or out-of-range
//! verdict) is absorbed here: after at most one retry the criterion gets the
//! default score. Nothing from this module can fail a match.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::prompts::EVIDENCE_ONLY_INSTRUCTION;
use crate::llm_client::LlmError;
use crate::matching::models::{CriterionEvaluation, EvaluationOutcome, MAX_SCORE, MIN_SCORE};
use crate::matching::prompts::{JUDGE_PROMPT_TEMPLATE, JUDGE_SYSTEM};
use crate::models::scorecard::{Criterion, Weight};

pub const FALLBACK_JUSTIFICATION: &str =
    "This criterion could not be evaluated due to a processing error.";
const MISSING_JUSTIFICATION: &str = "No justification provided.";

/// Raw structured output expected from the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JudgeVerdict {
    pub score: f64,
    #[serde(default)]
    pub justification: String,
}

/// The language model behind the judge. `LlmClient` implements this; tests stub it.
#[async_trait]
pub trait JudgeBackend: Send + Sync {
    async fn verdict(&self, prompt: &str, system: &str) -> Result<JudgeVerdict, LlmError>;
}

#[derive(Debug, Error)]
enum JudgeFailure {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("no verdict within {0:?}")]
    Timeout(Duration),

    #[error("score {0} is not an integer in 1..=5")]
    InvalidScore(f64),
}

#[derive(Clone)]
pub struct CriterionJudge {
    backend: Arc<dyn JudgeBackend>,
    timeout: Duration,
    max_retries: u32,
}

impl CriterionJudge {
    /// `max_retries` is capped at one.
    pub fn new(backend: Arc<dyn JudgeBackend>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            backend,
            timeout,
            max_retries: max_retries.min(1),
        }
    }

    /// Returns `None` without calling the model when there is no evidence.
    pub async fn judge(
        &self,
        criterion: &Criterion,
        evidence: &[String],
    ) -> Option<CriterionEvaluation> {
        if evidence.is_empty() {
            debug!("No evidence for criterion '{}', skipping judge", criterion.name);
            return None;
        }

        let prompt = build_judge_prompt(criterion, evidence);
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            match self.attempt(&prompt).await {
                Ok((score, justification)) => {
                    return Some(evaluation(
                        criterion,
                        evidence,
                        score,
                        justification,
                        EvaluationOutcome::Judged,
                    ));
                }
                Err(e) => warn!(
                    "Judge attempt {}/{} for criterion '{}' failed: {}",
                    attempt, attempts, criterion.name, e
                ),
            }
        }

        Some(evaluation(
            criterion,
            evidence,
            MIN_SCORE,
            FALLBACK_JUSTIFICATION.to_string(),
            EvaluationOutcome::Fallback,
        ))
    }

    async fn attempt(&self, prompt: &str) -> Result<(u8, String), JudgeFailure> {
        let verdict = tokio::time::timeout(self.timeout, self.backend.verdict(prompt, JUDGE_SYSTEM))
            .await
            .map_err(|_| JudgeFailure::Timeout(self.timeout))??;

        let score = validate_score(verdict.score)?;
        let justification = match verdict.justification.trim() {
            "" => MISSING_JUSTIFICATION.to_string(),
            text => text.to_string(),
        };
        Ok((score, justification))
    }
}

/// Accepts integers on the scale, tolerating float noise like `4.0000001`.
fn validate_score(raw: f64) -> Result<u8, JudgeFailure> {
    let rounded = raw.round();
    if !raw.is_finite()
        || (raw - rounded).abs() > 0.01
        || rounded < MIN_SCORE as f64
        || rounded > MAX_SCORE as f64
    {
        return Err(JudgeFailure::InvalidScore(raw));
    }
    Ok(rounded as u8)
}

fn evaluation(
    criterion: &Criterion,
    evidence: &[String],
    score: u8,
    justification: String,
    outcome: EvaluationOutcome,
) -> CriterionEvaluation {
    CriterionEvaluation {
        criterion_id: criterion.id,
        criterion: criterion.name.clone(),
        weight: criterion.weight,
        score,
        justification,
        evidence: evidence.to_vec(),
        outcome,
    }
}

fn importance_label(weight: Weight) -> &'static str {
    match weight {
        Weight::Low => "low",
        Weight::Medium => "medium",
        Weight::High => "high",
    }
}

fn build_judge_prompt(criterion: &Criterion, evidence: &[String]) -> String {
    let evidence_list = evidence
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n");

    JUDGE_PROMPT_TEMPLATE
        .replace("{criterion_name}", criterion.name.trim())
        .replace("{criterion_description}", criterion.description.trim())
        .replace("{importance}", importance_label(criterion.weight))
        .replace("{evidence_instruction}", EVIDENCE_ONLY_INSTRUCTION)
        .replace("{evidence}", &evidence_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Replays scripted responses; repeats the last one when exhausted.
    struct ScriptedBackend {
        script: Mutex<Vec<Result<JudgeVerdict, u16>>>,
        delay: Option<Duration>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<JudgeVerdict, u16>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                delay: None,
                calls: AtomicU32::new(0),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(vec![Ok(verdict(5.0, "too late"))]),
                delay: Some(delay),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JudgeBackend for ScriptedBackend {
        async fn verdict(&self, _prompt: &str, _system: &str) -> Result<JudgeVerdict, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0].clone()
                }
            };
            next.map_err(|status| LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            })
        }
    }

    fn verdict(score: f64, justification: &str) -> JudgeVerdict {
        JudgeVerdict {
            score,
            justification: justification.to_string(),
        }
    }

    fn criterion() -> Criterion {
        Criterion {
            id: Uuid::new_v4(),
            name: "Python experience".to_string(),
            description: "Has built production systems in Python".to_string(),
            weight: Weight::High,
            embedding: vec![],
        }
    }

    fn evidence() -> Vec<String> {
        vec!["Senior Python Engineer at Acme: built data pipelines".to_string()]
    }

    fn judge_with(backend: Arc<ScriptedBackend>) -> CriterionJudge {
        CriterionJudge::new(backend, Duration::from_secs(8), 1)
    }

    #[tokio::test]
    async fn test_valid_verdict_is_judged() {
        let backend = ScriptedBackend::new(vec![Ok(verdict(5.0, "Built pipelines at Acme."))]);
        let result = judge_with(backend.clone())
            .judge(&criterion(), &evidence())
            .await
            .unwrap();

        assert_eq!(result.score, 5);
        assert_eq!(result.outcome, EvaluationOutcome::Judged);
        assert_eq!(result.justification, "Built pipelines at Acme.");
        assert_eq!(result.weight, Weight::High);
        assert_eq!(result.evidence, evidence());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_evidence_skips_backend() {
        let backend = ScriptedBackend::new(vec![Ok(verdict(5.0, "unused"))]);
        let result = judge_with(backend.clone()).judge(&criterion(), &[]).await;

        assert!(result.is_none());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_persistent_failure_falls_back_after_one_retry() {
        let backend = ScriptedBackend::new(vec![Err(500)]);
        let result = judge_with(backend.clone())
            .judge(&criterion(), &evidence())
            .await
            .unwrap();

        assert_eq!(result.score, MIN_SCORE);
        assert_eq!(result.outcome, EvaluationOutcome::Fallback);
        assert_eq!(result.justification, FALLBACK_JUSTIFICATION);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_single_failure() {
        let backend = ScriptedBackend::new(vec![Err(529), Ok(verdict(3.0, "Some Python."))]);
        let result = judge_with(backend.clone())
            .judge(&criterion(), &evidence())
            .await
            .unwrap();

        assert_eq!(result.score, 3);
        assert_eq!(result.outcome, EvaluationOutcome::Judged);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_capped_at_one() {
        let backend = ScriptedBackend::new(vec![Err(500)]);
        let judge = CriterionJudge::new(backend.clone(), Duration::from_secs(8), 5);
        judge.judge(&criterion(), &evidence()).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_a_failure() {
        let backend = ScriptedBackend::new(vec![Ok(verdict(7.0, "Off the scale."))]);
        let result = judge_with(backend).judge(&criterion(), &evidence()).await.unwrap();
        assert_eq!(result.outcome, EvaluationOutcome::Fallback);
        assert_eq!(result.score, MIN_SCORE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_to_fallback() {
        let backend = ScriptedBackend::slow(Duration::from_secs(30));
        let result = judge_with(backend.clone())
            .judge(&criterion(), &evidence())
            .await
            .unwrap();

        assert_eq!(result.outcome, EvaluationOutcome::Fallback);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_justification_is_replaced() {
        let backend = ScriptedBackend::new(vec![Ok(verdict(4.0, "  "))]);
        let result = judge_with(backend).judge(&criterion(), &evidence()).await.unwrap();
        assert_eq!(result.justification, MISSING_JUSTIFICATION);
    }

    #[test]
    fn test_validate_score() {
        assert_eq!(validate_score(4.0).unwrap(), 4);
        assert_eq!(validate_score(4.004).unwrap(), 4);
        assert!(validate_score(3.5).is_err());
        assert!(validate_score(0.0).is_err());
        assert!(validate_score(6.0).is_err());
        assert!(validate_score(f64::NAN).is_err());
    }

    #[test]
    fn test_verdict_parses_integer_score() {
        let v: JudgeVerdict =
            serde_json::from_str(r#"{"score": 4, "justification": "Clear evidence."}"#).unwrap();
        assert_eq!(v.score, 4.0);
    }

    #[test]
    fn test_prompt_contains_criterion_and_evidence() {
        let prompt = build_judge_prompt(&criterion(), &evidence());
        assert!(prompt.contains("Criterion: Python experience"));
        assert!(prompt.contains("Has built production systems in Python"));
        assert!(prompt.contains("Importance to the role: high"));
        assert!(prompt.contains("- Senior Python Engineer at Acme: built data pipelines"));
        assert!(prompt.contains("ONLY on the evidence"));
        assert!(!prompt.contains("{evidence}"));
    }
}
