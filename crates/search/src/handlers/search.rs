//! Search handlers
//!
//! - `POST /v1/search`: raw store search with explicit filters
//! - `POST /v1/query`: entity extraction and shape routing

use crate::retrieval::RoutedQuery;
use crate::AppState;
use axum::{extract::State, Json};
use filingforge_common::{
    errors::{AppError, Result},
    store::Filters,
    SearchRequest, SearchResult,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

/// Raw search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchBody {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Maximum results to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: usize,

    /// Equality (`"AAPL"`) or set-membership (`["10-K", "10-Q"]`) per field
    #[serde(default)]
    pub filters: Filters,

    #[validate(range(min = 0.0, max = 1.0))]
    pub keyword_boost: Option<f32>,
}

fn default_limit() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
    pub degraded: bool,
    pub processing_time_ms: u64,
}

/// Routed query request
#[derive(Debug, Deserialize, Validate)]
pub struct QueryBody {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub routed: RoutedQuery,
    pub total_results: usize,
    pub processing_time_ms: u64,
}

pub(crate) fn validate<T: Validate>(body: &T) -> Result<()> {
    body.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}

/// Perform a filtered hybrid search
pub async fn search(State(state): State<AppState>, Json(body): Json<SearchBody>) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    validate(&body)?;

    let store = state.engine.store();
    let request = SearchRequest {
        query: body.query.clone(),
        limit: body.limit,
        filters: body.filters,
        keyword_boost: body.keyword_boost,
    };
    let results = store.search(&request).await?;

    Ok(Json(SearchResponse {
        query: body.query,
        total_results: results.len(),
        results,
        degraded: store.is_degraded(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Route a natural-language query by its shape
pub async fn query(State(state): State<AppState>, Json(body): Json<QueryBody>) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    validate(&body)?;

    let routed = state.engine.route_query(&body.query).await?;
    tracing::info!(
        shape = routed.shape.as_str(),
        results = routed.results.len(),
        "Query served"
    );

    Ok(Json(QueryResponse {
        total_results: routed.results.len(),
        routed,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
