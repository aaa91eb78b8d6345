use anyhow::Context;

use labstock_infra::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    labstock_observability::init();

    let config = EngineConfig::from_env().context("invalid configuration")?;
    let engine = labstock_api::app::build_engine(&config).context("bootstrap failed")?;
    let app = labstock_api::app::build_app(engine);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
