use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use labstock_core::DomainError;
use labstock_infra::EngineError;

/// Handler error, already rendered as a JSON response.
pub struct ApiError(Response);

impl core::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ApiError").field(&self.0.status()).finish()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        ApiError(engine_error_to_response(value))
    }
}

impl From<Response> for ApiError {
    fn from(value: Response) -> Self {
        ApiError(value)
    }
}

/// Body shape: `{"error": <code>, "message": <text>}`, plus `details` for
/// stock shortfalls.
pub fn engine_error_to_response(err: EngineError) -> Response {
    let code = err.code();
    let message = err.to_string();

    let status = match &err {
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        EngineError::InsufficientStock(_) | EngineError::InvariantViolation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        EngineError::Unauthenticated => StatusCode::UNAUTHORIZED,
        EngineError::ConcurrentUpdate(_) | EngineError::DuplicateIdentifier { .. } => {
            StatusCode::CONFLICT
        }
        EngineError::Store(_) => {
            tracing::error!(error = %message, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    match err {
        EngineError::InsufficientStock(shortfalls) => {
            json_error_with(status, code, message, json!(shortfalls))
        }
        _ => json_error(status, code, message),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

/// Parse a path segment into a typed id, answering 400 on garbage.
pub fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| ApiError::from(json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string())))
}
