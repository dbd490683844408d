//! Summary, statistics and catalog endpoints

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use super::auth::Authenticated;
use super::{predicate_from_params, ApiError, ApiResponse};
use crate::aggregate::summarize;
use crate::api::state::AppState;
use crate::query::filter;
use crate::record_store::{StatsCollector, StoreStats};
use crate::types::{Status, StockSummary};

/// GET /api/summary - Aggregations over the (optionally filtered) records
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<StockSummary>>, ApiError> {
    let predicate = predicate_from_params(params)?;
    let store = state.store.clone();

    let summary =
        tokio::task::spawn_blocking(move || summarize(&filter(&store.load_all(), &predicate)))
            .await?;

    Ok(Json(ApiResponse::new(summary, state.last_id())))
}

/// GET /api/stats - Storage statistics
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> Result<Json<ApiResponse<StoreStats>>, ApiError> {
    let store = state.store.clone();
    let stats = tokio::task::spawn_blocking(move || StatsCollector::new(&store).collect()).await??;
    Ok(Json(ApiResponse::new(stats, state.last_id())))
}

/// Choices offered by the entry form
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub items: Vec<String>,
    pub statuses: Vec<&'static str>,
}

/// GET /api/catalog - Items and statuses for the entry form
pub async fn get_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        items: state.catalog.items().to_vec(),
        statuses: Status::ALL.iter().map(|s| s.label()).collect(),
    })
}
