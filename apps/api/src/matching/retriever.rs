//! Criterion Retriever: picks the profile chunks closest to a criterion.
//!
//! Pure in-process cosine ranking over the request's own chunks, so there is
//! no shared corpus to scope or clean up between requests.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::matching::models::ProfileChunk;

#[derive(Debug, Error, PartialEq)]
pub enum RetrievalError {
    #[error("embedding dimensions don't match: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    #[error("criterion has no embedding")]
    MissingEmbedding,
}

#[derive(Debug, Clone)]
pub struct Retriever {
    top_k: usize,
    /// Chunks scoring below this are not considered evidence.
    min_similarity: f32,
}

impl Retriever {
    pub fn new(top_k: usize, min_similarity: f32) -> Self {
        Self {
            top_k: top_k.max(1),
            min_similarity,
        }
    }

    /// Returns up to `top_k` distinct chunk texts, most similar first.
    ///
    /// If ranking fails (missing or mismatched vectors) the criterion still
    /// gets the first chunk so the judge has something to look at.
    pub fn retrieve(&self, criterion_embedding: &[f32], chunks: &[ProfileChunk]) -> Vec<String> {
        match self.rank(criterion_embedding, chunks) {
            Ok(texts) => texts,
            Err(e) => {
                warn!("Similarity ranking failed, falling back to first chunk: {e}");
                chunks.first().map(|c| vec![c.text.clone()]).unwrap_or_default()
            }
        }
    }

    fn rank(
        &self,
        criterion_embedding: &[f32],
        chunks: &[ProfileChunk],
    ) -> Result<Vec<String>, RetrievalError> {
        if criterion_embedding.is_empty() {
            return Err(RetrievalError::MissingEmbedding);
        }

        let mut scored: Vec<(usize, f32)> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                cosine_similarity(criterion_embedding, &chunk.embedding).map(|sim| (i, sim))
            })
            .collect::<Result<_, _>>()?;

        // Stable: equal similarities keep chunk order. NaN never clears the floor below.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut seen = HashSet::new();
        Ok(scored
            .into_iter()
            .filter(|(_, sim)| *sim >= self.min_similarity)
            .map(|(i, _)| chunks[i].text.as_str())
            .filter(|text| seen.insert(*text))
            .take(self.top_k)
            .map(str::to_string)
            .collect())
    }
}

/// Cosine similarity; zero-norm vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RetrievalError> {
    if a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch(a.len(), b.len()));
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot / (norm_a * norm_b))
    }
}
