//! Embedding gateway: maps text to fixed-dimension vectors.
//!
//! `EmbeddingClient` talks to any OpenAI-compatible `/embeddings` endpoint.
//! The engine only sees the `Embedder` trait, so tests swap in a stub.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EmbeddingConfig;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("expected {expected} embeddings, provider returned {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("expected {expected}-dimensional embeddings, provider returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("provider returned no embeddings")]
    EmptyResponse,
}

/// Contract: one vector per non-blank input, in input order, all of the same
/// dimensionality. Blank inputs are dropped before the provider is called.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let input = non_blank(texts);
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dimensions,
        };
        let expected = request.input.len();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        let vectors = order_by_index(body.data, expected, self.dimensions)?;

        debug!(
            "Embedded {} texts ({} dims) with {}",
            vectors.len(),
            self.dimensions,
            self.model
        );
        Ok(vectors)
    }
}

fn non_blank(texts: &[String]) -> Vec<&str> {
    texts
        .iter()
        .map(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Providers may return items out of order; restore input order and check shape.
fn order_by_index(
    mut data: Vec<EmbeddingData>,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.is_empty() {
        return Err(EmbeddingError::EmptyResponse);
    }
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: data.len(),
        });
    }

    data.sort_by_key(|d| d.index);

    data.into_iter()
        .map(|d| {
            if d.embedding.len() == dimensions {
                Ok(d.embedding)
            } else {
                Err(EmbeddingError::DimensionMismatch {
                    expected: dimensions,
                    actual: d.embedding.len(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, embedding: Vec<f32>) -> EmbeddingData {
        EmbeddingData { index, embedding }
    }

    #[test]
    fn test_non_blank_filters_whitespace() {
        let texts = vec!["a".to_string(), "   ".to_string(), String::new(), "b".to_string()];
        assert_eq!(non_blank(&texts), vec!["a", "b"]);
    }

    #[test]
    fn test_order_by_index_restores_input_order() {
        let data = vec![item(1, vec![0.0, 1.0]), item(0, vec![1.0, 0.0])];
        let vectors = order_by_index(data, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_by_index_rejects_wrong_dimensions() {
        let data = vec![item(0, vec![1.0, 0.0, 0.0])];
        let err = order_by_index(data, 1, 2).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { expected: 2, actual: 3 }
        ));
    }

    #[test]
    fn test_order_by_index_rejects_short_batch() {
        let data = vec![item(0, vec![1.0])];
        let err = order_by_index(data, 2, 1).unwrap_err();
        assert!(matches!(err, EmbeddingError::CountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_response_deserializes_openai_shape() {
        let json = r#"{
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2]}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 3, "total_tokens": 3}
        }"#;
        let body: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0].embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_all_blank_batch_skips_the_provider() {
        let client = EmbeddingClient::new(&EmbeddingConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: "unused".to_string(),
            model: "test".to_string(),
            dimensions: 8,
        })
        .unwrap();
        let vectors = client.embed(&["  ".to_string()]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
