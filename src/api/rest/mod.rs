//! REST API module for HTTP endpoints
//!
//! - `POST /auth/token` - Exchange credentials for a bearer token
//! - `POST /api/records` - Submit a stock movement
//! - `GET /api/records` - List records with filters and pagination
//! - `GET /api/records/export` - Filtered records as CSV
//! - `GET /api/summary` - Aggregations for charts
//! - `GET /api/stats` - Storage statistics
//! - `GET /api/catalog` - Items and statuses for the entry form

pub mod auth;
pub mod records;
pub mod summary;

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::query::{Predicate, QueryError};
use crate::record_store::StoreError;
use crate::validation::ValidationError;

/// Common pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000)
    pub limit: usize,
    /// Number of items to skip
    pub offset: usize,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

impl PaginationParams {
    /// Read `limit` and `offset` from the query string
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut page = Self::default();
        if let Some(raw) = params.get("limit") {
            page.limit = parse_count("limit", raw)?;
        }
        if let Some(raw) = params.get("offset") {
            page.offset = parse_count("offset", raw)?;
        }
        Ok(page)
    }

    /// Normalize limit to max 1000
    pub fn normalized_limit(&self) -> usize {
        self.limit.min(1000)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize, ApiError> {
    raw.trim().parse().map_err(|_| {
        ApiError::bad_request(format!("{} must be a non-negative integer, got '{}'", name, raw))
    })
}

/// Build a predicate from the query string, ignoring pagination keys
pub fn predicate_from_params(params: HashMap<String, String>) -> Result<Predicate, QueryError> {
    Predicate::from_params(
        params
            .into_iter()
            .filter(|(key, _)| key != "limit" && key != "offset"),
    )
}

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Id of the newest record, for cache invalidation
    pub last_id: Option<u64>,
    /// Total count (for paginated responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, last_id: Option<u64>) -> Self {
        Self {
            data,
            last_id,
            total: None,
        }
    }

    pub fn with_total(data: T, last_id: Option<u64>, total: usize) -> Self {
        Self {
            data,
            last_id,
            total: Some(total),
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: message.into(),
            code: code.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_QUERY", e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(e) => e.into(),
            StoreError::Persistence(e) => {
                error!(error = %e, "record store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR", e.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::HashError(_) | AuthError::InvalidSecret(_) => {
                error!(error = %e, "authentication backend failure");
                Self::internal(e.to_string())
            }
            _ => Self::unauthorized(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!(error = %e, "blocking task failed");
        Self::internal("internal task failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_pagination_defaults() {
        let page = PaginationParams::from_params(&params(&[("item", "iPhone 15")])).unwrap();
        assert_eq!(page, PaginationParams::default());
        assert_eq!(page.normalized_limit(), 100);
    }

    #[test]
    fn test_pagination_parses_and_caps() {
        let page = PaginationParams::from_params(&params(&[("limit", "5000"), ("offset", "20")]))
            .unwrap();
        assert_eq!(page.offset, 20);
        assert_eq!(page.normalized_limit(), 1000);
    }

    #[test]
    fn test_pagination_rejects_non_numbers() {
        let err = PaginationParams::from_params(&params(&[("limit", "abc")])).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "BAD_REQUEST");
        assert!(err.error.contains("limit"));

        assert!(PaginationParams::from_params(&params(&[("offset", "-1")])).is_err());
    }
}
