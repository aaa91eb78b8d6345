use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use labstock_auth::SessionToken;

use crate::app::SharedEngine;
use crate::app::errors::{engine_error_to_response, json_error};
use crate::context::SessionContext;

/// Resolve the bearer token to an identity, sliding the session forward.
pub async fn auth_middleware(
    State(engine): State<SharedEngine>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .map(SessionToken::from_string)
        .ok_or_else(|| {
            json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "missing bearer token",
            )
        })?;

    let identity = engine.validate(&token).map_err(engine_error_to_response)?;

    req.extensions_mut()
        .insert(SessionContext::new(identity, token));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
