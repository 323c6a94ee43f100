//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use filingforge_common::FitState;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub store: StoreCheck,
    pub embedding: EmbeddingCheck,
}

#[derive(Serialize)]
pub struct StoreCheck {
    pub status: String,
    pub collection: String,
    pub records: usize,
}

#[derive(Serialize)]
pub struct EmbeddingCheck {
    /// `up` on the pretrained model, `degraded` on the fallback
    pub status: String,
    pub model: String,
    pub dimension: usize,
    pub degraded: bool,
    pub fit_state: FitState,
}

/// Liveness check - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check - reports the store and the active embedding path
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let store = state.engine.store();
    let embedder = store.embedder();
    let degraded = embedder.is_degraded();

    Json(ReadyResponse {
        status: "ready".to_string(),
        checks: HealthChecks {
            store: StoreCheck {
                status: "up".to_string(),
                collection: store.collection().to_string(),
                records: store.len().await,
            },
            embedding: EmbeddingCheck {
                status: if degraded { "degraded" } else { "up" }.to_string(),
                model: embedder.model_name().to_string(),
                dimension: embedder.dimension(),
                degraded,
                fit_state: embedder.fit_state(),
            },
        },
    })
}
