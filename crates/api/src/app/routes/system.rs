use axum::{Extension, Json};
use serde_json::json;

use crate::app::dto::WhoAmI;
use crate::context::SessionContext;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> Json<WhoAmI> {
    Json(WhoAmI::from(session.identity()))
}
