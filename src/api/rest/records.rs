//! Record endpoints

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use super::auth::Authenticated;
use super::{predicate_from_params, ApiError, ApiResponse, PaginationParams};
use crate::api::state::AppState;
use crate::query::filter;
use crate::record_store::export_csv;
use crate::types::{Record, RecordDraft};
use crate::validation::ValidationError;

/// POST /api/records - Submit a stock movement
///
/// The item must be in the catalog; it is stored in its catalog spelling.
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Authenticated(capability): Authenticated,
    Json(mut draft): Json<RecordDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let item = draft.item.trim();
    if !item.is_empty() {
        match state.catalog.canonical(item) {
            Some(canonical) => draft.item = canonical.to_string(),
            None => return Err(ValidationError::UnknownItem(item.to_string()).into()),
        }
    }

    let store = state.store.clone();
    let record =
        tokio::task::spawn_blocking(move || store.append_record(&capability, draft, None))
            .await??;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(record, state.last_id())),
    ))
}

/// Snapshot of the store filtered by the request's query string
async fn filtered_records(
    state: &Arc<AppState>,
    params: HashMap<String, String>,
) -> Result<Vec<Record>, ApiError> {
    let predicate = predicate_from_params(params)?;
    let store = state.store.clone();
    let records =
        tokio::task::spawn_blocking(move || filter(&store.load_all(), &predicate)).await?;
    Ok(records)
}

/// GET /api/records - List records, oldest first
///
/// `q` searches every field; `item`, `status`, `actor`, `notes`,
/// `quantity=min..max` and `timestamp=from..to` constrain single fields.
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PaginationParams::from_params(&params)?;
    let records = filtered_records(&state, params).await?;
    let total = records.len();

    let records: Vec<Record> = records
        .into_iter()
        .skip(page.offset)
        .take(page.normalized_limit())
        .collect();

    Ok(Json(ApiResponse::with_total(records, state.last_id(), total)))
}

/// GET /api/records/export - Filtered records as CSV
pub async fn export_records(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let records = filtered_records(&state, params).await?;

    let mut body = Vec::new();
    export_csv(&records, &mut body)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"stock_records.csv\"",
            ),
        ],
        body,
    ))
}
