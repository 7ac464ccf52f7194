//! Common API DTOs and helpers shared by every HTTP module

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainError;
use crate::shared::validations::validate_pagination;
use crate::shared::{PaginatedResult, PaginationParams};

pub mod validated_json;

pub use validated_json::ValidatedJson;

/// Standard response envelope.
///
/// Every REST endpoint wraps its payload in this envelope.
/// On success: `{"success": true, "data": {...}}`,
/// on failure: `{"success": false, "error": "description"}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// `true` if the request was processed successfully
    pub success: bool,
    /// Payload. `null` on failure
    pub data: Option<T>,
    /// Error description. `null` on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Empty response for operations without return data
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmptyData {}

/// Pagination query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct PageQuery {
    /// Page number (1-based). Default: 1
    #[serde(default = "default_page")]
    pub page: u64,
    /// Items per page (1-100). Default: 20
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

impl PageQuery {
    /// Clamp into the domain pagination window.
    pub fn into_params(self) -> PaginationParams {
        let (page, limit) = validate_pagination(Some(self.page), Some(self.limit));
        PaginationParams { page, limit }
    }
}

/// Paginated list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// Items on the current page
    pub items: Vec<T>,
    /// Total item count across all pages
    pub total: u64,
    /// Current page (1-based)
    pub page: u64,
    /// Page size
    pub limit: u64,
    /// Total page count
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = ((total as f64) / (limit as f64)).ceil() as u64;
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Map a domain page into its API shape.
    pub fn from_result<U, F>(result: PaginatedResult<U>, f: F) -> Self
    where
        F: FnMut(U) -> T,
    {
        let items = result.items.into_iter().map(f).collect();
        Self::new(items, result.total, result.page, result.limit)
    }
}

/// HTTP status a domain error surfaces as.
pub fn error_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Expired(_) => StatusCode::GONE,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::External { .. } => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turn a domain error into the standard handler rejection tuple.
pub fn failure<T>(error: DomainError) -> (StatusCode, Json<ApiResponse<T>>) {
    (error_status(&error), Json(ApiResponse::error(error.to_string())))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shapes() {
        let ok = ApiResponse::success(7);
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let err = ApiResponse::<i32>::error("nope");
        assert!(!err.success);
        assert!(err.data.is_none());
        assert_eq!(err.error.as_deref(), Some("nope"));
    }

    #[test]
    fn page_query_clamps_into_domain_window() {
        let params = PageQuery { page: 0, limit: 500 }.into_params();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
    }

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        assert_eq!(
            error_status(&DomainError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&DomainError::Conflict("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&DomainError::Expired("x".into())),
            StatusCode::GONE
        );
        assert_eq!(
            error_status(&DomainError::NotFound {
                entity: "Booking",
                field: "id",
                value: "b-1".into(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&DomainError::External {
                service: "PayGate",
                reason: "timeout".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn paginated_response_counts_pages() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 7, 1, 3);
        assert_eq!(page.total_pages, 3);
    }
}
