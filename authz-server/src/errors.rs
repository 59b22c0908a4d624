use authz_engine::Denial;
use axum::Json;
use axum::response::IntoResponse;
use http::StatusCode;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    #[allow(dead_code)]
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Not Found (404) with a detail message
    pub fn not_found<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::NOT_FOUND)
    }

    /// Create new Unprocessable Entity (422) with a detail message
    pub fn unprocessable<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::UNPROCESSABLE_ENTITY)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}

/// Denials carry their own status contract: 401 when no valid credential was
/// presented, 403 when a valid credential lacks the required permission.
impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        Self::new(denial.to_string(), denial.status())
    }
}
