use axum::{Router, http::StatusCode, routing::get};

use labstock_infra::EngineError;

use crate::app::errors::{ApiError, ApiResult, json_error};

pub mod admin;
pub mod auth;
pub mod inventory;
pub mod kits;
pub mod profile;
pub mod purchases;
pub mod reports;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/auth", auth::router())
        .nest("/profile", profile::router())
        .nest("/inventory", inventory::router())
        .nest("/kits", kits::router())
        .nest("/purchases", purchases::router())
        .nest("/admin", admin::router())
        .nest("/reports", reports::router())
}

/// Run an engine call off the async workers: anything that hashes a
/// secret or may sleep between retry attempts goes through here.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            ApiError::from(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                e.to_string(),
            ))
        })?
        .map_err(ApiError::from)
}
