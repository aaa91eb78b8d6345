//! Router and engine wiring.
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request bodies and small response shapes
//! - `errors.rs`: engine errors as JSON responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tracing::info;

use labstock_infra::{
    Argon2CredentialStore, EngineConfig, EngineError, InMemoryLedgerStore, InventoryEngine,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

pub type Engine = InventoryEngine<InMemoryLedgerStore, Argon2CredentialStore>;
pub type SharedEngine = Arc<Engine>;

/// Build an engine from `config` and seed the reference data.
pub fn build_engine(config: &EngineConfig) -> Result<SharedEngine, EngineError> {
    let engine = InventoryEngine::new(
        InMemoryLedgerStore::new(),
        Argon2CredentialStore::new(),
        config,
    );
    let report = engine.bootstrap(&config.bootstrap_admin_secret)?;
    info!(
        categories = report.categories,
        roles = report.roles,
        admin_created = report.admin_created,
        "engine ready"
    );
    Ok(Arc::new(engine))
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(engine: SharedEngine) -> Router {
    // Protected routes: require a live session.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        engine.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(engine)))
}
