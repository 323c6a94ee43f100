//! Chunk lookup handlers

use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use filingforge_common::{
    errors::{AppError, Result},
    Chunk, SearchResult,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

fn default_similar_limit() -> usize { 5 }

/// Fetch one chunk by id
pub async fn get_chunk(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Chunk>> {
    state
        .engine
        .store()
        .get(&id)
        .await
        .map(Json)
        .ok_or(AppError::ChunkNotFound { id })
}

/// Chunks nearest to a stored chunk, excluding itself
pub async fn similar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Vec<SearchResult>>> {
    let store = state.engine.store();
    if store.get(&id).await.is_none() {
        return Err(AppError::ChunkNotFound { id });
    }

    let limit = params.limit.clamp(1, 100);
    Ok(Json(store.similar_to(&id, limit).await))
}
