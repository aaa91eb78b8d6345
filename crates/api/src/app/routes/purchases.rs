use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use labstock_infra::RequestParams;
use labstock_purchasing::{PurchaseOrder, PurchaseOrderId, PurchaseRequestDraft};

use crate::app::SharedEngine;
use crate::app::errors::{ApiResult, parse_id};
use crate::app::routes::blocking;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/draft", post(draft_request))
        .route("/", get(list_orders).post(commit_request))
        .route("/:id", get(get_order).delete(delete_order))
}

/// Price a request without persisting it. The client posts the returned
/// draft back to `/purchases` to commit it.
pub async fn draft_request(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<RequestParams>,
) -> ApiResult<Json<PurchaseRequestDraft>> {
    Ok(Json(engine.build_request(session.identity(), &body)?))
}

pub async fn commit_request(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(draft): Json<PurchaseRequestDraft>,
) -> ApiResult<(StatusCode, Json<PurchaseOrder>)> {
    let actor = session.identity().clone();
    let order = blocking(move || engine.commit_request(&actor, &draft)).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<PurchaseOrder>>> {
    Ok(Json(engine.purchase_orders(session.identity())?))
}

pub async fn get_order(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseOrder>> {
    let order_id: PurchaseOrderId = parse_id(&id)?;
    Ok(Json(engine.purchase_order(session.identity(), order_id)?))
}

pub async fn delete_order(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let order_id: PurchaseOrderId = parse_id(&id)?;
    engine.delete_purchase_order(session.identity(), order_id)?;
    Ok(StatusCode::NO_CONTENT)
}
