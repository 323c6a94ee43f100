//! Collection statistics handler

use crate::AppState;
use axum::{extract::State, Json};
use filingforge_common::store::CollectionStats;

pub async fn stats(State(state): State<AppState>) -> Json<CollectionStats> {
    Json(state.engine.store().stats().await)
}
