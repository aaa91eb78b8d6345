use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use labstock_inventory::{
    ActorActivity, Category, InventoryItem, InventoryItemId, InventorySummary, StockTransaction,
};
use labstock_infra::{ImportReport, NewItem};

use crate::app::SharedEngine;
use crate::app::dto::{CategoryRequest, StockInRequest, StockOutRequest};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::routes::blocking;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(define_item))
        .route("/items/import", post(import_items))
        .route("/items/:id", get(get_item).delete(delete_item))
        .route("/items/:id/stock-in", post(stock_in))
        .route("/items/:id/stock-out", post(stock_out))
        .route("/categories", get(list_categories).post(add_category))
        .route("/transactions", get(list_transactions))
        .route("/summary", get(summary))
        .route("/shortages", get(shortages))
        .route("/activity", get(my_activity))
}

pub async fn list_items(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(engine.items(session.identity())?))
}

pub async fn define_item(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<NewItem>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    let item = engine.define_item(session.identity(), body)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Bulk define; rows fail independently and are reported, not rolled back.
pub async fn import_items(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(rows): Json<Vec<NewItem>>,
) -> ApiResult<Json<ImportReport>> {
    Ok(Json(engine.import_items(session.identity(), rows)?))
}

pub async fn get_item(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<InventoryItem>> {
    let item_id: InventoryItemId = parse_id(&id)?;
    Ok(Json(engine.item(session.identity(), item_id)?))
}

pub async fn delete_item(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let item_id: InventoryItemId = parse_id(&id)?;
    let actor = session.identity().clone();
    blocking(move || engine.delete_item(&actor, item_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stock_in(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<StockInRequest>,
) -> ApiResult<(StatusCode, Json<StockTransaction>)> {
    let item_id: InventoryItemId = parse_id(&id)?;
    let actor = session.identity().clone();
    let tx = blocking(move || {
        engine.stock_in(&actor, item_id, body.quantity, body.unit_cost, &body.note)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn stock_out(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<StockOutRequest>,
) -> ApiResult<(StatusCode, Json<StockTransaction>)> {
    let item_id: InventoryItemId = parse_id(&id)?;
    let actor = session.identity().clone();
    let tx = blocking(move || engine.stock_out(&actor, item_id, body.quantity, &body.note)).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn list_categories(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(engine.categories(session.identity())?))
}

pub async fn add_category(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = engine.add_category(session.identity(), &body.name)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_transactions(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<StockTransaction>>> {
    Ok(Json(engine.transactions(session.identity())?))
}

pub async fn summary(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<InventorySummary>> {
    Ok(Json(engine.summary(session.identity())?))
}

pub async fn shortages(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(engine.list_shortages(session.identity())?))
}

pub async fn my_activity(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<ActorActivity>> {
    Ok(Json(engine.my_activity(session.identity())?))
}
