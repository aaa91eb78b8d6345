use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use labstock_inventory::StockTransaction;
use labstock_infra::NewKit;
use labstock_kits::{Kit, KitEventRecord, KitId};

use crate::app::SharedEngine;
use crate::app::dto::KitCountRequest;
use crate::app::errors::{ApiResult, parse_id};
use crate::app::routes::blocking;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_kits).post(define_kit))
        .route("/:id", get(get_kit))
        .route("/:id/issue", post(issue_kit))
        .route("/:id/return", post(return_kit))
        .route("/:id/events", get(kit_events))
}

pub async fn list_kits(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<Kit>>> {
    Ok(Json(engine.kits(session.identity())?))
}

pub async fn define_kit(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<NewKit>,
) -> ApiResult<(StatusCode, Json<Kit>)> {
    let actor = session.identity().clone();
    let kit = blocking(move || engine.define_kit(&actor, body)).await?;
    Ok((StatusCode::CREATED, Json(kit)))
}

pub async fn get_kit(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Kit>> {
    let kit_id: KitId = parse_id(&id)?;
    Ok(Json(engine.kit(session.identity(), kit_id)?))
}

/// Responds with the per-component ledger rows the issue produced.
pub async fn issue_kit(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<KitCountRequest>,
) -> ApiResult<Json<Vec<StockTransaction>>> {
    let kit_id: KitId = parse_id(&id)?;
    let actor = session.identity().clone();
    let transactions =
        blocking(move || engine.issue_kit(&actor, kit_id, body.count, &body.note)).await?;
    Ok(Json(transactions))
}

pub async fn return_kit(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<KitCountRequest>,
) -> ApiResult<Json<Vec<StockTransaction>>> {
    let kit_id: KitId = parse_id(&id)?;
    let actor = session.identity().clone();
    let transactions =
        blocking(move || engine.return_kit(&actor, kit_id, body.count, &body.note)).await?;
    Ok(Json(transactions))
}

pub async fn kit_events(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<KitEventRecord>>> {
    let kit_id: KitId = parse_id(&id)?;
    Ok(Json(engine.kit_events(session.identity(), kit_id)?))
}
