use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, put},
};

use labstock_auth::{Role, User};
use labstock_core::UserId;
use labstock_infra::AuditEntry;

use crate::app::SharedEngine;
use crate::app::dto::{CreateUserRequest, UpdateRoleRequest, UserStatusRequest};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::routes::blocking;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/:name", put(update_role))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id/status", put(set_user_status))
        .route("/audit", get(audit_log))
}

pub async fn list_roles(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(engine.list_roles(session.identity())?))
}

/// Replace a role's permission set. Takes effect on the holders' next call.
pub async fn update_role(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> ApiResult<Json<Role>> {
    let actor = session.identity().clone();
    let permissions = body.permission_set();
    let role = blocking(move || engine.update_role(&actor, &name, permissions)).await?;
    Ok(Json(role))
}

pub async fn list_users(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(engine.list_users(session.identity())?))
}

pub async fn create_user(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let actor = session.identity().clone();
    let user = blocking(move || {
        engine.create_user(
            &actor,
            &body.employee_id,
            &body.name,
            &body.role,
            &body.secret,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn set_user_status(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<UserStatusRequest>,
) -> ApiResult<Json<User>> {
    let user_id: UserId = parse_id(&id)?;
    let actor = session.identity().clone();
    let user = blocking(move || engine.set_user_status(&actor, user_id, body.status)).await?;
    Ok(Json(user))
}

pub async fn audit_log(
    Extension(engine): Extension<SharedEngine>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    Ok(Json(engine.audit_log(session.identity())?))
}
