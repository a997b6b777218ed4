//! Scorecard repository: read access to scorecard definitions.
//!
//! The engine holds an `Arc<dyn ScorecardRepository>`. Production wires
//! `CachedScorecardRepository<PgScorecardRepository>`; tests use in-memory stubs.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod cache;
pub mod postgres;

pub use cache::CachedScorecardRepository;
pub use postgres::PgScorecardRepository;

use crate::models::scorecard::Scorecard;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored scorecard is invalid: {0}")]
    InvalidData(String),
}

#[async_trait]
pub trait ScorecardRepository: Send + Sync {
    /// Returns `Ok(None)` when no scorecard has this id.
    async fn get_scorecard(&self, id: Uuid) -> Result<Option<Scorecard>, RepositoryError>;
}
