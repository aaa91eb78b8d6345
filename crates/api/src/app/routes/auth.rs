use axum::{Extension, Json, Router, http::StatusCode, routing::post};

use crate::app::SharedEngine;
use crate::app::dto::{ChangeSecretRequest, LoginRequest, LoginResponse};
use crate::app::errors::ApiResult;
use crate::app::routes::blocking;
use crate::context::SessionContext;

/// Routes under `/auth` that need a session. Login is mounted publicly.
pub fn router() -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route("/secret", post(change_secret))
}

pub async fn login(
    Extension(engine): Extension<SharedEngine>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let session = blocking(move || engine.login(&body.employee_id, &body.secret)).await?;
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<StatusCode> {
    engine.logout(session.token())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_secret(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<ChangeSecretRequest>,
) -> ApiResult<StatusCode> {
    let actor = session.identity().clone();
    blocking(move || engine.change_secret(&actor, &body.current, &body.new_secret)).await?;
    Ok(StatusCode::NO_CONTENT)
}
