//! Revenue and R&D analysis handler
//!
//! `POST /v1/analysis`: routes the query like `/v1/query`, then runs the
//! filing analyzer over the retrieved passages.

use super::search::validate;
use crate::analysis::{AnalysisReport, Passage};
use crate::retrieval::QueryShape;
use crate::AppState;
use axum::{extract::State, Json};
use filingforge_common::errors::Result;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AnalysisBody {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub query: String,
    pub shape: QueryShape,
    /// Passages the report was built from
    pub total_passages: usize,
    pub report: AnalysisReport,
    pub processing_time_ms: u64,
}

pub async fn analyze(State(state): State<AppState>, Json(body): Json<AnalysisBody>) -> Result<Json<AnalysisResponse>> {
    let start = Instant::now();
    validate(&body)?;

    let routed = state.engine.route_query(&body.query).await?;
    let passages: Vec<Passage<'_>> = routed.results.iter().map(Passage::from).collect();
    let report = state.analyzer.analyze(&passages);
    tracing::info!(
        shape = routed.shape.as_str(),
        passages = passages.len(),
        companies = report.companies.len(),
        insights = report.key_insights.len(),
        "Analysis served"
    );

    Ok(Json(AnalysisResponse {
        query: body.query,
        shape: routed.shape,
        total_passages: passages.len(),
        report,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
