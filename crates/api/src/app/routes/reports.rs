use axum::{Json, Router, extract::Extension, routing::get};

use labstock_inventory::MonthlyActivity;

use crate::app::SharedEngine;
use crate::app::errors::ApiResult;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new().route("/monthly", get(monthly))
}

pub async fn monthly(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<MonthlyActivity>>> {
    Ok(Json(engine.monthly_report(session.identity())?))
}
