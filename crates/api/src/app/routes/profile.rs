use axum::{Json, Router, extract::Extension, routing::get};

use labstock_auth::{ProfileUpdate, User};

use crate::app::SharedEngine;
use crate::app::errors::ApiResult;
use crate::app::routes::blocking;
use crate::context::SessionContext;

/// The caller's own record. No permission beyond a session.
pub fn router() -> Router {
    Router::new().route("/", get(get_profile).put(update_profile))
}

pub async fn get_profile(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<User>> {
    Ok(Json(engine.profile(session.identity())?))
}

/// Omitted fields are left alone; an empty `picture` removes it.
pub async fn update_profile(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let actor = session.identity().clone();
    let user = blocking(move || engine.update_profile(&actor, &body)).await?;
    Ok(Json(user))
}
