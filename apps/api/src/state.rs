use std::sync::Arc;

use crate::matching::MatchEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
}
